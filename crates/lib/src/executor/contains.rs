use corpusql_lib_core::{ExecutionError, MatchDetail, PositionList, Span, ValueType};
use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use crate::context::{condition_id, group_key, ExecContext};
use crate::index::keys;

/// `CONTAINS(t1, t2..)` — a conjunction of terms. A term not present
/// in the index contributes an empty list, which collapses the whole
/// intersection to empty rather than erroring.
pub fn execute(
    ctx: &ExecContext,
    terms: &[SmolStr],
    span: Span,
) -> Result<Vec<MatchDetail>, ExecutionError> {
    ctx.check_cancelled()?;
    let cid = condition_id(span);

    let mut lists = Vec::with_capacity(terms.len());
    for term in terms {
        ctx.check_cancelled()?;
        let normalized = normalize(term);
        let key = keys::term(&normalized);
        lists.push(ctx.index.get(&key)?.unwrap_or_else(PositionList::empty));
    }

    let Some((first, rest)) = lists.split_first() else {
        return Ok(Vec::new());
    };

    let mut shared: FxHashSet<(u32, i32)> = first
        .as_slice()
        .iter()
        .map(|p| group_key(p, ctx.granularity))
        .collect();
    for list in rest {
        ctx.check_cancelled()?;
        let keys_here: FxHashSet<(u32, i32)> = list
            .as_slice()
            .iter()
            .map(|p| group_key(p, ctx.granularity))
            .collect();
        shared.retain(|k| keys_here.contains(k));
    }

    let matches = first
        .as_slice()
        .iter()
        .filter(|p| shared.contains(&group_key(p, ctx.granularity)))
        .map(|p| MatchDetail::single(terms[0].clone(), ValueType::Term, *p, cid, None))
        .collect();
    Ok(matches)
}

fn normalize(term: &str) -> String {
    term.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::InMemoryIndex;
    use corpusql_lib_core::{Granularity, Position, Span};
    use chrono::NaiveDate;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    struct NoopText;
    impl crate::context::TextResolver for NoopText {
        fn fetch_text(&self, _: u32) -> Result<Arc<str>, ExecutionError> {
            Ok(Arc::from(""))
        }
        fn fetch_sentence_bounds(&self, _: u32, _: i32) -> Result<(u32, u32), ExecutionError> {
            Ok((0, 0))
        }
        fn fetch_metadata(&self, _: u32) -> Result<crate::context::DocMetadata, ExecutionError> {
            Ok(crate::context::DocMetadata {
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

    #[test]
    fn conjunction_keeps_only_docs_with_every_term() {
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
        let text = NoopText;
        let ctx = ExecContext::new(&idx, &text, Granularity::Document, Arc::new(AtomicBool::new(false)));
        let matches = execute(&ctx, &[SmolStr::new("ai"), SmolStr::new("fiction")], Span { line: 1, col: 1 })
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].position.doc_id, 2);
    }

    #[test]
    fn missing_term_yields_empty_set() {
        let idx = InMemoryIndex::new();
        let text = NoopText;
        let ctx = ExecContext::new(&idx, &text, Granularity::Document, Arc::new(AtomicBool::new(false)));
        let matches = execute(&ctx, &[SmolStr::new("ghost")], Span { line: 1, col: 1 }).unwrap();
        assert!(matches.is_empty());
    }
}
