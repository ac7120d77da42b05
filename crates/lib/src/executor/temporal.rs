use chrono::NaiveDate;
use corpusql_lib_core::{ExecutionError, MatchDetail, Span, TemporalPredicate, ValueType};
use smol_str::SmolStr;

use crate::context::{condition_id, ExecContext};
use crate::index::keys;

/// `DATE(var?, op value?)` — enumerates the `date:*` sub-index and
/// keeps the days that satisfy the predicate. With no predicate
/// (`start_date` absent) every date is emitted, which is how a bare
/// `DATE(?d)` works as a pure producer.
#[allow(clippy::too_many_arguments)]
pub fn execute(
    ctx: &ExecContext,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    range_days: Option<u32>,
    predicate: TemporalPredicate,
    var: Option<&SmolStr>,
    span: Span,
) -> Result<Vec<MatchDetail>, ExecutionError> {
    ctx.check_cancelled()?;
    let cid = condition_id(span);

    let mut matches = Vec::new();
    for (key, list) in ctx.index.scan_prefix(&keys::date_prefix())? {
        ctx.check_cancelled()?;
        let Some(day) = date_from_key(&key) else {
            continue;
        };
        if let Some(start) = start_date {
            if !satisfies(predicate, day, start, end_date, range_days) {
                continue;
            }
        }
        let value = SmolStr::new(day.format("%Y-%m-%d").to_string());
        for p in list.as_slice() {
            matches.push(MatchDetail::single(
                value.clone(),
                ValueType::Date,
                *p,
                cid,
                var.cloned(),
            ));
        }
    }
    Ok(matches)
}

fn satisfies(
    predicate: TemporalPredicate,
    day: NaiveDate,
    start: NaiveDate,
    end: Option<NaiveDate>,
    range_days: Option<u32>,
) -> bool {
    match predicate {
        TemporalPredicate::Before => day < start,
        TemporalPredicate::After => day > start,
        TemporalPredicate::BeforeEqual => day <= start,
        TemporalPredicate::AfterEqual => day >= start,
        TemporalPredicate::Equal => day == start,
        TemporalPredicate::Contains | TemporalPredicate::ContainedBy | TemporalPredicate::Intersect => {
            day == start
        }
        TemporalPredicate::Proximity => {
            let window = range_days.unwrap_or(0) as i64;
            (day - start).num_days().abs() <= window
        }
        TemporalPredicate::Between => {
            let end = end.unwrap_or(start);
            day >= start && day <= end
        }
    }
}

fn date_from_key(key: &[u8]) -> Option<NaiveDate> {
    let rest = key.strip_prefix(b"date:")?;
    let s = std::str::from_utf8(rest).ok()?;
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DocMetadata;
    use crate::index::InMemoryIndex;
    use corpusql_lib_core::{Granularity, Position, PositionList};
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

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn strict_after_excludes_equal_and_earlier() {
        let mut idx = InMemoryIndex::new();
        idx.insert(
            keys::date("2000-01-01"),
            PositionList::new(vec![Position::new(1, 0, 0, 1, d(2000, 1, 1))]),
        );
        idx.insert(
            keys::date("2001-06-15"),
            PositionList::new(vec![Position::new(2, 0, 0, 1, d(2001, 6, 15))]),
        );
        idx.insert(
            keys::date("1999-12-31"),
            PositionList::new(vec![Position::new(3, 0, 0, 1, d(1999, 12, 31))]),
        );
        let text = NoopText;
        let ctx = ExecContext::new(&idx, &text, Granularity::Document, Arc::new(AtomicBool::new(false)));
        let matches = execute(
            &ctx,
            Some(d(2000, 1, 1)),
            None,
            None,
            TemporalPredicate::After,
            Some(&SmolStr::new("d")),
            Span { line: 1, col: 1 },
        )
        .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].value.as_str(), "2001-06-15");
    }

    #[test]
    fn no_predicate_emits_every_date() {
        let mut idx = InMemoryIndex::new();
        idx.insert(
            keys::date("2000-01-01"),
            PositionList::new(vec![Position::new(1, 0, 0, 1, d(2000, 1, 1))]),
        );
        let text = NoopText;
        let ctx = ExecContext::new(&idx, &text, Granularity::Document, Arc::new(AtomicBool::new(false)));
        let matches = execute(
            &ctx,
            None,
            None,
            None,
            TemporalPredicate::Equal,
            Some(&SmolStr::new("d")),
            Span { line: 1, col: 1 },
        )
        .unwrap();
        assert_eq!(matches.len(), 1);
    }
}
