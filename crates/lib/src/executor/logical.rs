use corpusql_lib_core::{Condition, ExecutionError, LogicalOp, MatchDetail};
use rayon::prelude::*;
use rustc_hash::FxHashSet;

use crate::context::{group_key, ExecContext};

/// `AND(xs)` / `OR(xs)` — children run independently (in parallel via
/// rayon for genuinely independent work) and are
/// combined by key///
/// `NOT` only has a defined meaning bounded by a sibling positive
/// condition, so it is handled here rather than through generic
/// dispatch: an `AND` first intersects its positive children, then
/// subtracts each `NOT` child's keys from that universe in turn. A
/// `NOT` child under `OR` has no such universe available and
/// contributes nothing — the same restriction `check_top_level_not`
/// enforces at the top level, just not (yet) inside nested `OR`
/// branches.
pub fn execute_logical(
    ctx: &ExecContext,
    op: LogicalOp,
    children: &[Condition],
) -> Result<Vec<MatchDetail>, ExecutionError> {
    ctx.check_cancelled()?;
    match op {
        LogicalOp::And => execute_and(ctx, children),
        LogicalOp::Or => execute_or(ctx, children),
    }
}

fn execute_and(ctx: &ExecContext, children: &[Condition]) -> Result<Vec<MatchDetail>, ExecutionError> {
    let positives: Vec<&Condition> = children.iter().filter(|c| c.is_positive()).collect();
    let nots: Vec<&Condition> = children.iter().filter(|c| !c.is_positive()).collect();

    let per_child: Vec<Vec<MatchDetail>> = positives
        .par_iter()
        .map(|child| super::execute_condition(ctx, child))
        .collect::<Result<_, _>>()?;

    let mut universe = intersect(ctx, per_child);
    for not_child in nots {
        if let Condition::Not { child, .. } = not_child {
            universe = execute_not(ctx, child, &universe)?;
        }
    }
    Ok(universe)
}

fn execute_or(ctx: &ExecContext, children: &[Condition]) -> Result<Vec<MatchDetail>, ExecutionError> {
    let per_child: Vec<Vec<MatchDetail>> = children
        .par_iter()
        .map(|child| match child {
            Condition::Not { span, .. } => {
                log::warn!("NOT at {}:{} under OR has no bounding universe, contributes nothing", span.line, span.col);
                Ok(Vec::new())
            }
            other => super::execute_condition(ctx, other),
        })
        .collect::<Result<_, _>>()?;
    Ok(union(per_child))
}

fn intersect(ctx: &ExecContext, per_child: Vec<Vec<MatchDetail>>) -> Vec<MatchDetail> {
    if per_child.is_empty() {
        return Vec::new();
    }
    let key_sets: Vec<FxHashSet<(u32, i32)>> = per_child
        .iter()
        .map(|matches| {
            matches
                .iter()
                .map(|m| group_key(&m.position, ctx.granularity))
                .collect()
        })
        .collect();

    let shared: FxHashSet<(u32, i32)> = key_sets[0]
        .iter()
        .copied()
        .filter(|k| key_sets[1..].iter().all(|s| s.contains(k)))
        .collect();

    per_child
        .into_iter()
        .flatten()
        .filter(|m| shared.contains(&group_key(&m.position, ctx.granularity)))
        .collect()
}

fn union(per_child: Vec<Vec<MatchDetail>>) -> Vec<MatchDetail> {
    per_child.into_iter().flatten().collect()
}

/// `NOT(x)` — subtracts `x`'s keys from `universe`.
pub fn execute_not(
    ctx: &ExecContext,
    child: &Condition,
    universe: &[MatchDetail],
) -> Result<Vec<MatchDetail>, ExecutionError> {
    ctx.check_cancelled()?;
    let excluded: FxHashSet<(u32, i32)> = super::execute_condition(ctx, child)?
        .iter()
        .map(|m| group_key(&m.position, ctx.granularity))
        .collect();

    Ok(universe
        .iter()
        .filter(|m| !excluded.contains(&group_key(&m.position, ctx.granularity)))
        .cloned()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{DocMetadata, TextResolver};
    use crate::index::{keys, InMemoryIndex};
    use corpusql_lib_core::{Granularity, Position, PositionList, Span};
    use chrono::NaiveDate;
    use smol_str::SmolStr;
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

    #[test]
    fn and_with_not_excludes_matching_docs() {
        let mut idx = InMemoryIndex::new();
        idx.insert(
            keys::term("ai"),
            PositionList::new(vec![
                Position::new(1, 0, 0, 2, date()),
                Position::new(2, 0, 0, 2, date()),
                Position::new(3, 0, 0, 2, date()),
            ]),
        );
        idx.insert(
            keys::term("fiction"),
            PositionList::new(vec![Position::new(2, 0, 10, 17, date())]),
        );
        let text = NoopText;
        let ctx = ExecContext::new(&idx, &text, Granularity::Document, Arc::new(AtomicBool::new(false)));

        let children = vec![
            Condition::Contains {
                terms: vec![SmolStr::new("ai")],
                span: Span { line: 1, col: 1 },
            },
            Condition::Not {
                child: Box::new(Condition::Contains {
                    terms: vec![SmolStr::new("fiction")],
                    span: Span { line: 1, col: 1 },
                }),
                span: Span { line: 1, col: 1 },
            },
        ];
        let matches = execute_logical(&ctx, LogicalOp::And, &children).unwrap();
        let docs: FxHashSet<u32> = matches.iter().map(|m| m.position.doc_id).collect();
        assert_eq!(docs, FxHashSet::from_iter([1, 3]));
    }
}
