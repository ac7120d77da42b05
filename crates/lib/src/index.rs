use corpusql_lib_core::{ExecutionError, PositionList};
use rustc_hash::FxHashMap;

/// Read interface to the positional inverted index. The query core
/// only ever reads; `put` / `delete` exist so a single trait can
/// describe both the indexing and query-time roles, but no executor in
/// this crate calls them.
pub trait PositionalIndex: Send + Sync {
    /// Exact-key lookup. A missing key is `Ok(None)`, never an error —
    /// a missing index key yields an empty set.
    fn get(&self, key: &[u8]) -> Result<Option<PositionList>, ExecutionError>;

    /// Like `get`, but returns the raw serialized bytes without
    /// decoding — used when the caller only needs to check presence.
    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, ExecutionError>;

    /// Iterate all `(key, PositionList)` pairs whose key starts with
    /// `prefix`, in key order. Used for `pos:<TAG>:*` and `dep:*` style
    /// scans and for `date:*` enumeration.
    fn scan_prefix(
        &self,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, PositionList)>, ExecutionError>;

    fn put(&mut self, key: &[u8], value: PositionList) -> Result<(), ExecutionError>;
    fn delete(&mut self, key: &[u8]) -> Result<(), ExecutionError>;
    fn close(&mut self);
    fn is_closed(&self) -> bool;
}

/// Byte key namespaces for the positional index: `term:`, `ner:`,
/// `pos:`, `dep:`, `date:`.
pub mod keys {
    pub fn term(normalized: &str) -> Vec<u8> {
        format!("term:{normalized}").into_bytes()
    }

    pub fn ner(entity_type: &str) -> Vec<u8> {
        format!("ner:{entity_type}").into_bytes()
    }

    pub fn ner_prefix() -> Vec<u8> {
        b"ner:".to_vec()
    }

    pub fn pos(tag: &str, term: &str) -> Vec<u8> {
        format!("pos:{tag}:{term}").into_bytes()
    }

    pub fn pos_prefix(tag: &str) -> Vec<u8> {
        format!("pos:{tag}:").into_bytes()
    }

    pub fn dep(governor: &str, relation: &str, dependent: &str) -> Vec<u8> {
        format!("dep:{governor}|{relation}|{dependent}").into_bytes()
    }

    pub fn dep_prefix() -> Vec<u8> {
        b"dep:".to_vec()
    }

    pub fn date(iso: &str) -> Vec<u8> {
        format!("date:{iso}").into_bytes()
    }

    pub fn date_prefix() -> Vec<u8> {
        b"date:".to_vec()
    }
}

/// An in-memory `PositionalIndex` test double backed by a sorted map,
/// used by unit and integration tests instead of a real RocksDB file —
/// a fake at the storage boundary, not a mock of executor logic.
#[derive(Default)]
pub struct InMemoryIndex {
    entries: FxHashMap<Vec<u8>, PositionList>,
    closed: bool,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<Vec<u8>>, positions: PositionList) {
        self.entries.insert(key.into(), positions);
    }
}

impl PositionalIndex for InMemoryIndex {
    fn get(&self, key: &[u8]) -> Result<Option<PositionList>, ExecutionError> {
        if self.closed {
            return Err(ExecutionError::ResourceError("index handle is closed".into()));
        }
        Ok(self.entries.get(key).cloned())
    }

    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, ExecutionError> {
        if self.closed {
            return Err(ExecutionError::ResourceError("index handle is closed".into()));
        }
        Ok(self.entries.get(key).map(|_| key.to_vec()))
    }

    fn scan_prefix(
        &self,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, PositionList)>, ExecutionError> {
        if self.closed {
            return Err(ExecutionError::ResourceError("index handle is closed".into()));
        }
        let mut out: Vec<_> = self
            .entries
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }

    fn put(&mut self, key: &[u8], value: PositionList) -> Result<(), ExecutionError> {
        if self.closed {
            return Err(ExecutionError::ResourceError("index handle is closed".into()));
        }
        self.entries.insert(key.to_vec(), value);
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), ExecutionError> {
        if self.closed {
            return Err(ExecutionError::ResourceError("index handle is closed".into()));
        }
        self.entries.remove(key);
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corpusql_lib_core::Position;
    use chrono::NaiveDate;

    #[test]
    fn missing_key_yields_empty_not_error() {
        let idx = InMemoryIndex::new();
        assert_eq!(idx.get(&keys::term("missing")).unwrap(), None);
    }

    #[test]
    fn closed_index_fails_with_resource_error() {
        let mut idx = InMemoryIndex::new();
        idx.close();
        assert!(matches!(
            idx.get(&keys::term("x")),
            Err(ExecutionError::ResourceError(_))
        ));
    }

    #[test]
    fn scan_prefix_is_sorted_by_key() {
        let mut idx = InMemoryIndex::new();
        let d = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let pl = PositionList::new(vec![Position::new(1, 0, 0, 1, d)]);
        idx.insert(keys::pos("NN", "zebra"), pl.clone());
        idx.insert(keys::pos("NN", "apple"), pl);
        let results = idx.scan_prefix(&keys::pos_prefix("NN")).unwrap();
        assert_eq!(results[0].0, keys::pos("NN", "apple"));
        assert_eq!(results[1].0, keys::pos("NN", "zebra"));
    }
}
