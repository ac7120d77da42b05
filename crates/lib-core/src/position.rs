use chrono::NaiveDate;
use smol_str::SmolStr;

/// A character-span identifier into the corpus, as described in
/// `(`Position`).
///
/// `sentence_id == -1` means "whole document" (a document-granularity
/// match with no single sentence to anchor to).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub doc_id: u32,
    pub sentence_id: i32,
    pub begin_char: u32,
    pub end_char: u32,
    pub doc_date: NaiveDate,
}

impl Position {
    pub const WHOLE_DOC: i32 = -1;

    pub fn new(
        doc_id: u32,
        sentence_id: i32,
        begin_char: u32,
        end_char: u32,
        doc_date: NaiveDate,
    ) -> Self {
        debug_assert!(begin_char <= end_char, "begin_char must not exceed end_char");
        Self {
            doc_id,
            sentence_id,
            begin_char,
            end_char,
            doc_date,
        }
    }

    /// The granularity key this position collapses to when grouping matches.
    pub fn doc_key(&self) -> u32 {
        self.doc_id
    }

    pub fn sentence_key(&self) -> (u32, i32) {
        (self.doc_id, self.sentence_id)
    }
}

/// An ordered, duplicate-tolerant sequence of `Position`s, sorted by
/// `(doc_id, sentence_id, begin_char)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionList(Vec<Position>);

impl PositionList {
    pub fn new(mut positions: Vec<Position>) -> Self {
        positions.sort_by_key(|p| (p.doc_id, p.sentence_id, p.begin_char));
        Self(positions)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn as_slice(&self) -> &[Position] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Position> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Merge another list in, keeping the overall sort invariant.
    pub fn merge(mut self, other: PositionList) -> PositionList {
        self.0.extend(other.0);
        self.0
            .sort_by_key(|p| (p.doc_id, p.sentence_id, p.begin_char));
        self
    }
}

/// The kind of value a `MatchDetail` carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Term,
    Date,
    Entity,
    Dependency,
    PosTerm,
}

/// A single match produced by a condition executor.
///
/// Invariant: either all right-hand fields are `None` (a single-sided
/// match) or all are `Some` (a join result) — never a mix. This is
/// enforced by construction: use `MatchDetail::single` or
/// `MatchDetail::joined`, never set the fields individually.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchDetail {
    pub value: SmolStr,
    pub value_type: ValueType,
    pub position: Position,
    pub condition_id: u32,
    pub variable_name: Option<SmolStr>,

    right_doc_id: Option<u32>,
    right_sentence_id: Option<i32>,
    right_value: Option<SmolStr>,
    right_value_type: Option<ValueType>,
    right_variable_name: Option<SmolStr>,
}

impl MatchDetail {
    pub fn single(
        value: impl Into<SmolStr>,
        value_type: ValueType,
        position: Position,
        condition_id: u32,
        variable_name: Option<SmolStr>,
    ) -> Self {
        Self {
            value: value.into(),
            value_type,
            position,
            condition_id,
            variable_name,
            right_doc_id: None,
            right_sentence_id: None,
            right_value: None,
            right_value_type: None,
            right_variable_name: None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn joined(
        left: MatchDetail,
        right_doc_id: u32,
        right_sentence_id: i32,
        right_value: impl Into<SmolStr>,
        right_value_type: ValueType,
        right_variable_name: Option<SmolStr>,
    ) -> Self {
        Self {
            right_doc_id: Some(right_doc_id),
            right_sentence_id: Some(right_sentence_id),
            right_value: Some(right_value.into()),
            right_value_type: Some(right_value_type),
            right_variable_name,
            ..left
        }
    }

    pub fn is_join_result(&self) -> bool {
        self.right_doc_id.is_some()
    }

    pub fn right(&self) -> Option<(u32, i32, &str, ValueType)> {
        Some((
            self.right_doc_id?,
            self.right_sentence_id?,
            self.right_value.as_deref()?,
            self.right_value_type?,
        ))
    }

    /// Stable ordering key: `(docId, sentenceId, beginChar, conditionId)`.
    pub fn order_key(&self) -> (u32, i32, u32, u32) {
        (
            self.position.doc_id,
            self.position.sentence_id,
            self.position.begin_char,
            self.condition_id,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn position_list_sorts_on_construction() {
        let d = date(2020, 1, 1);
        let list = PositionList::new(vec![
            Position::new(2, 0, 5, 10, d),
            Position::new(1, 0, 0, 5, d),
            Position::new(1, 0, 0, 2, d),
        ]);
        let keys: Vec<_> = list
            .as_slice()
            .iter()
            .map(|p| (p.doc_id, p.sentence_id, p.begin_char))
            .collect();
        assert_eq!(keys, vec![(1, 0, 0), (1, 0, 0), (2, 0, 5)]);
    }

    #[test]
    fn merge_keeps_sort_invariant() {
        let d = date(2020, 1, 1);
        let a = PositionList::new(vec![Position::new(1, 0, 10, 12, d)]);
        let b = PositionList::new(vec![Position::new(1, 0, 0, 2, d)]);
        let merged = a.merge(b);
        assert_eq!(merged.as_slice()[0].begin_char, 0);
        assert_eq!(merged.as_slice()[1].begin_char, 10);
    }

    #[test]
    fn single_match_has_no_right_fields() {
        let d = date(2020, 1, 1);
        let m = MatchDetail::single(
            "ai",
            ValueType::Term,
            Position::new(1, 0, 0, 2, d),
            1,
            None,
        );
        assert!(!m.is_join_result());
        assert!(m.right().is_none());
    }
}
