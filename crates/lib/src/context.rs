use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use corpusql_lib_core::{ExecutionError, Granularity, Span};

use crate::index::PositionalIndex;

/// Document-level metadata surfaced for `TITLE` / `TIMESTAMP` projection.
#[derive(Debug, Clone)]
pub struct DocMetadata {
    pub title: String,
    pub timestamp: String,
}

/// Read-only access to the relational collaborator. `corpusql-storage`
/// provides the real rusqlite-backed implementation; tests use an
/// in-memory stub.
pub trait TextResolver: Send + Sync {
    fn fetch_text(&self, doc_id: u32) -> Result<Arc<str>, ExecutionError>;
    fn fetch_sentence_bounds(
        &self,
        doc_id: u32,
        sentence_id: i32,
    ) -> Result<(u32, u32), ExecutionError>;
    fn fetch_metadata(&self, doc_id: u32) -> Result<DocMetadata, ExecutionError>;
    /// Highest known sentence id for a document, so the snippet
    /// expander knows where truncation begins. `None` if the document
    /// has no annotated sentences.
    fn max_sentence_id(&self, doc_id: u32) -> Result<Option<i32>, ExecutionError>;
}

/// Carries everything a condition executor needs, threaded through the
/// whole evaluation of a single query: the index, the relational
/// collaborator, the requested granularity and the cooperative
/// cancellation flag.
pub struct ExecContext<'a> {
    pub index: &'a dyn PositionalIndex,
    pub text: &'a dyn TextResolver,
    pub granularity: Granularity,
    cancel: Arc<AtomicBool>,
}

impl<'a> ExecContext<'a> {
    pub fn new(
        index: &'a dyn PositionalIndex,
        text: &'a dyn TextResolver,
        granularity: Granularity,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            index,
            text,
            granularity,
            cancel,
        }
    }

    /// Called before a scan starts and between iterator steps so a
    /// cancelled query stops promptly instead of running to completion.
    pub fn check_cancelled(&self) -> Result<(), ExecutionError> {
        if self.cancel.load(Ordering::Relaxed) {
            Err(ExecutionError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }
}

/// A condition's stable numeric identity, used for `MatchDetail::condition_id`
/// and the `(docId, sentenceId, beginChar, conditionId)` tie-break.
/// Derived from the condition's source span, which is unique per
/// occurrence in a parsed query.
pub fn condition_id(span: Span) -> u32 {
    (span.line as u32).wrapping_mul(8_192) ^ span.col as u32
}

/// The granularity grouping key a `Position` collapses to.
pub fn group_key(position: &corpusql_lib_core::Position, granularity: Granularity) -> (u32, i32) {
    match granularity {
        Granularity::Document => (position.doc_id, -1),
        Granularity::Sentence => position.sentence_key(),
    }
}
