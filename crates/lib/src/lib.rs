//! Condition executors, logical combinator, join executor, result
//! projector and snippet subsystem for corpusql.

pub mod cache;
pub mod context;
pub mod executor;
pub mod index;
pub mod join;
pub mod projector;
pub mod result;
pub mod snippet;

pub use context::{condition_id, group_key, DocMetadata, ExecContext, TextResolver};
pub use executor::execute_condition;
pub use index::{InMemoryIndex, PositionalIndex};
pub use join::{JoinExecutor, JoinSpec, JoinState};
pub use result::{Cell, QueryResult, Row, Table};
pub use snippet::{ContextAnchor, HighlightStyle, Highlighter, SnippetExpander, SnippetSentence};

use corpusql_lib_core::{ExecutionError, Granularity, Query};

/// Runs a single already-validated query's condition tree against the
/// index and returns its raw `QueryResult`, without projection. The
/// top-level runner (in `corpusql-cli-lib`) is responsible for joining
/// this with any subqueries before calling [`projector::project`].
pub fn execute_query(ctx: &ExecContext, query: &Query) -> Result<QueryResult, ExecutionError> {
    ctx.check_cancelled()?;
    let mut matches = Vec::new();
    for condition in &query.conditions {
        matches.extend(execute_condition(ctx, condition)?);
    }
    Ok(QueryResult::new(matches, granularity_of(query)))
}

fn granularity_of(query: &Query) -> Granularity {
    query.granularity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DocMetadata;
    use crate::index::{keys, InMemoryIndex};
    use corpusql_lib_core::{parse, validate, Position, PositionList};
    use chrono::NaiveDate;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    struct NoopText;
    impl TextResolver for NoopText {
        fn fetch_text(&self, _: u32) -> Result<Arc<str>, ExecutionError> {
            Ok(Arc::from(""))
        }
        fn fetch_sentence_bounds(&self, _: u32, _: i32) -> Result<(u32, u32), ExecutionError> {
            Ok((0, 0))
        }
        fn fetch_metadata(&self, _: u32) -> Result<DocMetadata, ExecutionError> {
            Ok(DocMetadata {
                title: String::new(),
                timestamp: String::new(),
            })
        }
        fn max_sentence_id(&self, _: u32) -> Result<Option<i32>, ExecutionError> {
            Ok(None)
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
    }

    /// `CONTAINS("ai") AND NOT CONTAINS("fiction")` over three
    /// documents returns exactly one.
    #[test]
    fn and_not_filters_to_one_document() {
        let mut idx = InMemoryIndex::new();
        idx.insert(
            keys::term("ai"),
            PositionList::new(vec![
                Position::new(1, 0, 0, 2, date()),
                Position::new(2, 0, 0, 2, date()),
            ]),
        );
        idx.insert(
            keys::term("fiction"),
            PositionList::new(vec![Position::new(2, 0, 10, 17, date())]),
        );
        idx.insert(
            keys::term("ml"),
            PositionList::new(vec![Position::new(3, 0, 0, 2, date())]),
        );

        let query = parse(
            r#"SELECT COUNT(DOCUMENTS) FROM w WHERE CONTAINS("ai") AND NOT CONTAINS("fiction")"#,
        )
        .unwrap();
        validate(&query).unwrap();

        let text = NoopText;
        let ctx = ExecContext::new(
            &idx,
            &text,
            query.granularity,
            Arc::new(AtomicBool::new(false)),
        );
        let result = execute_query(&ctx, &query).unwrap();
        let docs: std::collections::HashSet<u32> =
            result.matches.iter().map(|m| m.position.doc_id).collect();
        assert_eq!(docs, std::collections::HashSet::from([1]));
    }
}
