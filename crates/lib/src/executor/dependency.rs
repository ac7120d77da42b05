use corpusql_lib_core::{DependencyArg, ExecutionError, MatchDetail, Position, Span, ValueType};
use smol_str::SmolStr;

use crate::context::{condition_id, ExecContext};
use crate::index::keys;

/// `DEPENDS(gov, rel, dep) AS var?` — any argument may be a bound
/// variable reference instead of a literal, turning the exact-key
/// lookup into a full scan with a post-filter. Every
/// `DependencyArg::Variable` slot produces its own binding (registered
/// separately in the variable registry at parse time); the
/// whole-triple `var`, if present, binds a `Dependency`-kind value.
pub fn execute(
    ctx: &ExecContext,
    governor: &DependencyArg,
    relation: &DependencyArg,
    dependent: &DependencyArg,
    var: Option<&SmolStr>,
    span: Span,
) -> Result<Vec<MatchDetail>, ExecutionError> {
    ctx.check_cancelled()?;
    let cid = condition_id(span);

    let candidates: Vec<(u32, i32, &[u8], Position)> = if let (
        DependencyArg::Literal(g),
        DependencyArg::Literal(r),
        DependencyArg::Literal(d),
    ) = (governor, relation, dependent)
    {
        let key = keys::dep(g, r, d);
        match ctx.index.get(&key)? {
            Some(list) => list
                .into_vec()
                .into_iter()
                .map(|p| (0, 0, &[][..], p))
                .collect(),
            None => Vec::new(),
        }
    } else {
        Vec::new()
    };

    let mut matches = Vec::new();

    if candidates.is_empty() && !is_all_literal(governor, relation, dependent) {
        for (key, list) in ctx.index.scan_prefix(&keys::dep_prefix())? {
            ctx.check_cancelled()?;
            let Some((g, r, d)) = split_dep_key(&key) else {
                continue;
            };
            if !arg_matches(governor, g) || !arg_matches(relation, r) || !arg_matches(dependent, d)
            {
                continue;
            }
            for p in list.as_slice() {
                push_matches(&mut matches, governor, relation, dependent, var, g, r, d, *p, cid);
            }
        }
        return Ok(matches);
    }

    for (_, _, _, p) in candidates {
        if let (DependencyArg::Literal(g), DependencyArg::Literal(r), DependencyArg::Literal(d)) =
            (governor, relation, dependent)
        {
            push_matches(&mut matches, governor, relation, dependent, var, g, r, d, p, cid);
        }
    }

    Ok(matches)
}

#[allow(clippy::too_many_arguments)]
fn push_matches(
    out: &mut Vec<MatchDetail>,
    governor: &DependencyArg,
    relation: &DependencyArg,
    dependent: &DependencyArg,
    var: Option<&SmolStr>,
    g: &str,
    r: &str,
    d: &str,
    position: Position,
    cid: u32,
) {
    let triple = SmolStr::new(format!("{g}|{r}|{d}"));
    if let Some(var) = var {
        out.push(MatchDetail::single(
            triple.clone(),
            ValueType::Dependency,
            position,
            cid,
            Some(var.clone()),
        ));
    }
    for (arg, text) in [(governor, g), (relation, r), (dependent, d)] {
        if let DependencyArg::Variable(name) = arg {
            out.push(MatchDetail::single(
                text,
                ValueType::Term,
                position,
                cid,
                Some(name.clone()),
            ));
        }
    }
    if var.is_none() && !has_any_variable(governor, relation, dependent) {
        out.push(MatchDetail::single(
            triple,
            ValueType::Dependency,
            position,
            cid,
            None,
        ));
    }
}

fn has_any_variable(governor: &DependencyArg, relation: &DependencyArg, dependent: &DependencyArg) -> bool {
    [governor, relation, dependent]
        .iter()
        .any(|a| matches!(a, DependencyArg::Variable(_)))
}

fn is_all_literal(governor: &DependencyArg, relation: &DependencyArg, dependent: &DependencyArg) -> bool {
    !has_any_variable(governor, relation, dependent)
}

fn arg_matches(arg: &DependencyArg, value: &str) -> bool {
    match arg {
        DependencyArg::Variable(_) => true,
        DependencyArg::Literal(lit) => lit.as_str() == value,
    }
}

fn split_dep_key(key: &[u8]) -> Option<(&str, &str, &str)> {
    let rest = key.strip_prefix(b"dep:")?;
    let s = std::str::from_utf8(rest).ok()?;
    let mut parts = s.splitn(3, '|');
    Some((parts.next()?, parts.next()?, parts.next()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DocMetadata;
    use crate::index::InMemoryIndex;
    use corpusql_lib_core::{Granularity, PositionList};
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
    fn exact_triple_lookup() {
        let mut idx = InMemoryIndex::new();
        idx.insert(
            keys::dep("nsubj", "Obama", "spoke"),
            PositionList::new(vec![Position::new(1, 0, 0, 5, date())]),
        );
        let text = NoopText;
        let ctx = ExecContext::new(&idx, &text, Granularity::Document, Arc::new(AtomicBool::new(false)));
        let matches = execute(
            &ctx,
            &DependencyArg::Literal(SmolStr::new("nsubj")),
            &DependencyArg::Literal(SmolStr::new("Obama")),
            &DependencyArg::Literal(SmolStr::new("spoke")),
            None,
            Span { line: 1, col: 1 },
        )
        .unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn variable_slot_binds_matched_text() {
        let mut idx = InMemoryIndex::new();
        idx.insert(
            keys::dep("nsubj", "Obama", "spoke"),
            PositionList::new(vec![Position::new(1, 0, 0, 5, date())]),
        );
        let text = NoopText;
        let ctx = ExecContext::new(&idx, &text, Granularity::Document, Arc::new(AtomicBool::new(false)));
        let matches = execute(
            &ctx,
            &DependencyArg::Literal(SmolStr::new("nsubj")),
            &DependencyArg::Variable(SmolStr::new("who")),
            &DependencyArg::Literal(SmolStr::new("spoke")),
            None,
            Span { line: 1, col: 1 },
        )
        .unwrap();
        assert!(matches
            .iter()
            .any(|m| m.variable_name.as_deref() == Some("who") && m.value.as_str() == "Obama"));
    }
}
