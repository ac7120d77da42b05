use corpusql_lib_core::{ExecutionError, MatchDetail, Span, ValueType};
use smol_str::SmolStr;

use crate::context::{condition_id, ExecContext};
use crate::index::keys;

/// `POS(tag, term?) AS var?` — exact lookup when `term` is given,
/// prefix scan over the tag's terms otherwise.
pub fn execute(
    ctx: &ExecContext,
    tag: &SmolStr,
    term: Option<&SmolStr>,
    var: Option<&SmolStr>,
    span: Span,
) -> Result<Vec<MatchDetail>, ExecutionError> {
    ctx.check_cancelled()?;
    let cid = condition_id(span);

    let entries: Vec<(SmolStr, corpusql_lib_core::PositionList)> = match term {
        Some(term) => {
            let key = keys::pos(tag, term);
            match ctx.index.get(&key)? {
                Some(list) => vec![(term.clone(), list)],
                None => Vec::new(),
            }
        }
        None => {
            let mut out = Vec::new();
            for (key, list) in ctx.index.scan_prefix(&keys::pos_prefix(tag))? {
                ctx.check_cancelled()?;
                let term = term_from_key(&key, tag);
                out.push((term, list));
            }
            out
        }
    };

    let mut matches = Vec::new();
    for (term, list) in entries {
        let value = SmolStr::new(format!("{term}/{tag}"));
        for p in list.into_vec() {
            matches.push(MatchDetail::single(
                value.clone(),
                ValueType::PosTerm,
                p,
                cid,
                var.cloned(),
            ));
        }
    }
    Ok(matches)
}

fn term_from_key(key: &[u8], tag: &str) -> SmolStr {
    let prefix_len = keys::pos_prefix(tag).len();
    SmolStr::new(String::from_utf8_lossy(&key[prefix_len..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DocMetadata;
    use crate::index::InMemoryIndex;
    use corpusql_lib_core::{Granularity, Position, PositionList};
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
    fn exact_term_lookup() {
        let mut idx = InMemoryIndex::new();
        idx.insert(
            keys::pos("NN", "dog"),
            PositionList::new(vec![Position::new(1, 0, 0, 3, date())]),
        );
        let text = NoopText;
        let ctx = ExecContext::new(&idx, &text, Granularity::Document, Arc::new(AtomicBool::new(false)));
        let matches = execute(
            &ctx,
            &SmolStr::new("NN"),
            Some(&SmolStr::new("dog")),
            None,
            Span { line: 1, col: 1 },
        )
        .unwrap();
        assert_eq!(matches[0].value.as_str(), "dog/NN");
    }

    #[test]
    fn scans_prefix_when_term_absent() {
        let mut idx = InMemoryIndex::new();
        idx.insert(
            keys::pos("NN", "dog"),
            PositionList::new(vec![Position::new(1, 0, 0, 3, date())]),
        );
        idx.insert(
            keys::pos("NN", "cat"),
            PositionList::new(vec![Position::new(2, 0, 0, 3, date())]),
        );
        let text = NoopText;
        let ctx = ExecContext::new(&idx, &text, Granularity::Document, Arc::new(AtomicBool::new(false)));
        let matches = execute(
            &ctx,
            &SmolStr::new("NN"),
            None,
            Some(&SmolStr::new("w")),
            Span { line: 1, col: 1 },
        )
        .unwrap();
        assert_eq!(matches.len(), 2);
    }
}
