use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use corpusql_lib::PositionalIndex;
use corpusql_lib_core::{ExecutionError, PositionList};
use rocksdb::{Options, DB};

use crate::encoding;

/// `PositionalIndex` backed by an embedded RocksDB database.
/// `term:`/`ner:`/`pos:`/`dep:`/`date:` keys all live in the same
/// column family — prefix scans read across
/// namespaces only when given a matching prefix, so there is no
/// cross-talk.
pub struct RocksPositionalIndex {
    db: DB,
    closed: AtomicBool,
}

impl RocksPositionalIndex {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ExecutionError> {
        let path = path.as_ref();
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path).map_err(|e| ExecutionError::ResourceError(e.to_string()))?;
        log::info!("opened positional index at {}", path.display());
        Ok(Self {
            db,
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> Result<(), ExecutionError> {
        if self.closed.load(Ordering::Relaxed) {
            log::warn!("operation attempted on a closed index handle");
            Err(ExecutionError::ResourceError("index handle is closed".into()))
        } else {
            Ok(())
        }
    }
}

impl PositionalIndex for RocksPositionalIndex {
    fn get(&self, key: &[u8]) -> Result<Option<PositionList>, ExecutionError> {
        self.ensure_open()?;
        match self
            .db
            .get(key)
            .map_err(|e| ExecutionError::ResourceError(e.to_string()))?
        {
            Some(bytes) => Ok(Some(encoding::decode(key, &bytes)?)),
            None => Ok(None),
        }
    }

    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, ExecutionError> {
        self.ensure_open()?;
        self.db
            .get(key)
            .map_err(|e| ExecutionError::ResourceError(e.to_string()))
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, PositionList)>, ExecutionError> {
        self.ensure_open()?;
        let mut out = Vec::new();
        let iter = self.db.prefix_iterator(prefix);
        for item in iter {
            self.ensure_open()?;
            let (key, value) = item.map_err(|e| ExecutionError::ResourceError(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            let list = encoding::decode(&key, &value)?;
            out.push((key.to_vec(), list));
        }
        Ok(out)
    }

    fn put(&mut self, key: &[u8], value: PositionList) -> Result<(), ExecutionError> {
        self.ensure_open()?;
        self.db
            .put(key, encoding::encode(&value))
            .map_err(|e| ExecutionError::ResourceError(e.to_string()))
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), ExecutionError> {
        self.ensure_open()?;
        self.db
            .delete(key)
            .map_err(|e| ExecutionError::ResourceError(e.to_string()))
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::Relaxed);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use corpusql_lib::index::keys;
    use corpusql_lib_core::Position;

    #[test]
    fn round_trips_a_put_value_through_get() {
        let dir = tempfile::tempdir().unwrap();
        let mut idx = RocksPositionalIndex::open(dir.path()).unwrap();
        let d = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let list = PositionList::new(vec![Position::new(1, 0, 0, 2, d)]);
        idx.put(&keys::term("ai"), list.clone()).unwrap();
        assert_eq!(idx.get(&keys::term("ai")).unwrap(), Some(list));
    }

    #[test]
    fn closed_handle_fails_every_operation() {
        let dir = tempfile::tempdir().unwrap();
        let mut idx = RocksPositionalIndex::open(dir.path()).unwrap();
        idx.close();
        assert!(matches!(
            idx.get(&keys::term("ai")),
            Err(ExecutionError::ResourceError(_))
        ));
    }
}
