use corpusql_lib_core::{ExecutionError, MatchDetail, NerType, Position, Span, ValueType};
use smol_str::SmolStr;

use crate::context::{condition_id, ExecContext};
use crate::index::keys;

/// `NER(type, var?)` — exact type, or `*` for a union over every
/// entity type.
pub fn execute(
    ctx: &ExecContext,
    entity_type: &NerType,
    var: Option<&SmolStr>,
    span: Span,
) -> Result<Vec<MatchDetail>, ExecutionError> {
    ctx.check_cancelled()?;
    let cid = condition_id(span);

    let positions: Vec<Position> = if matches!(entity_type, NerType::Wildcard) {
        let mut all = Vec::new();
        for (_, list) in ctx.index.scan_prefix(&keys::ner_prefix())? {
            ctx.check_cancelled()?;
            all.extend(list.into_vec());
        }
        all
    } else {
        let tag = ner_tag(entity_type);
        ctx.index
            .get(&keys::ner(tag))?
            .map(|l| l.into_vec())
            .unwrap_or_default()
    };

    positions
        .into_iter()
        .map(|p| {
            let value = entity_text(ctx, &p)?;
            Ok(MatchDetail::single(
                value,
                ValueType::Entity,
                p,
                cid,
                var.cloned(),
            ))
        })
        .collect()
}

fn entity_text(ctx: &ExecContext, position: &Position) -> Result<SmolStr, ExecutionError> {
    let text = ctx.text.fetch_text(position.doc_id)?;
    let begin = position.begin_char as usize;
    let end = position.end_char as usize;
    text.get(begin..end)
        .map(SmolStr::new)
        .ok_or_else(|| ExecutionError::ReadError {
            key: format!("doc:{}", position.doc_id),
            reason: format!("span {begin}..{end} out of bounds"),
        })
}

fn ner_tag(entity_type: &NerType) -> &'static str {
    match entity_type {
        NerType::Person => "PERSON",
        NerType::Organization => "ORGANIZATION",
        NerType::Location => "LOCATION",
        NerType::Date => "DATE",
        NerType::Time => "TIME",
        NerType::Duration => "DURATION",
        NerType::Money => "MONEY",
        NerType::Number => "NUMBER",
        NerType::Ordinal => "ORDINAL",
        NerType::Percent => "PERCENT",
        NerType::Set => "SET",
        NerType::Wildcard => "*",
    }
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

    struct FixedText(&'static str);
    impl crate::context::TextResolver for FixedText {
        fn fetch_text(&self, _: u32) -> Result<Arc<str>, ExecutionError> {
            Ok(Arc::from(self.0))
        }
        fn fetch_sentence_bounds(&self, _: u32, _: i32) -> Result<(u32, u32), ExecutionError> {
            Ok((0, self.0.len() as u32))
        }
        fn fetch_metadata(&self, _: u32) -> Result<DocMetadata, ExecutionError> {
            Ok(DocMetadata {
                title: String::new(),
                timestamp: String::new(),
            })
        }
        fn max_sentence_id(&self, _: u32) -> Result<Option<i32>, ExecutionError> {
            Ok(Some(0))
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
    }

    #[test]
    fn exact_type_recovers_entity_text() {
        let mut idx = InMemoryIndex::new();
        idx.insert(
            keys::ner("PERSON"),
            PositionList::new(vec![Position::new(1, 0, 0, 8, date())]),
        );
        let text = FixedText("Einstein was a physicist.");
        let ctx = ExecContext::new(&idx, &text, Granularity::Document, Arc::new(AtomicBool::new(false)));
        let matches = execute(&ctx, &NerType::Person, Some(&SmolStr::new("p")), Span { line: 1, col: 1 })
            .unwrap();
        assert_eq!(matches[0].value.as_str(), "Einstein");
        assert_eq!(matches[0].variable_name.as_deref(), Some("p"));
    }

    #[test]
    fn wildcard_unions_every_type() {
        let mut idx = InMemoryIndex::new();
        idx.insert(
            keys::ner("PERSON"),
            PositionList::new(vec![Position::new(1, 0, 0, 3, date())]),
        );
        idx.insert(
            keys::ner("LOCATION"),
            PositionList::new(vec![Position::new(1, 5, 0, 3, date())]),
        );
        let text = FixedText("abc");
        let ctx = ExecContext::new(&idx, &text, Granularity::Document, Arc::new(AtomicBool::new(false)));
        let matches = execute(&ctx, &NerType::Wildcard, None, Span { line: 1, col: 1 }).unwrap();
        assert_eq!(matches.len(), 2);
    }
}
