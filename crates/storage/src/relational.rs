use std::sync::Arc;

use corpusql_lib::{DocMetadata, TextResolver};
use corpusql_lib_core::ExecutionError;
use rusqlite::Connection;

/// Read-only adapter over the `documents` / `annotations` / `dependencies`
/// schema. One connection per query — never shared across concurrent
/// queries.
pub struct SqliteRelationalStore {
    conn: Connection,
}

impl SqliteRelationalStore {
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, ExecutionError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| ExecutionError::ResourceError(e.to_string()))?;
        log::info!("opened relational store at {}", path.display());
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, ExecutionError> {
        let conn =
            Connection::open_in_memory().map_err(|e| ExecutionError::ResourceError(e.to_string()))?;
        Ok(Self { conn })
    }
}

impl TextResolver for SqliteRelationalStore {
    fn fetch_text(&self, doc_id: u32) -> Result<Arc<str>, ExecutionError> {
        self.conn
            .query_row(
                "SELECT text FROM documents WHERE document_id = ?1",
                [doc_id],
                |row| row.get::<_, String>(0),
            )
            .map(Arc::from)
            .map_err(|e| read_error(doc_id, e))
    }

    fn fetch_sentence_bounds(
        &self,
        doc_id: u32,
        sentence_id: i32,
    ) -> Result<(u32, u32), ExecutionError> {
        self.conn
            .query_row(
                "SELECT MIN(begin_char), MAX(end_char) FROM annotations \
                 WHERE document_id = ?1 AND sentence_id = ?2",
                (doc_id, sentence_id),
                |row| Ok((row.get::<_, u32>(0)?, row.get::<_, u32>(1)?)),
            )
            .map_err(|e| read_error(doc_id, e))
    }

    fn fetch_metadata(&self, doc_id: u32) -> Result<DocMetadata, ExecutionError> {
        self.conn
            .query_row(
                "SELECT title, timestamp FROM documents WHERE document_id = ?1",
                [doc_id],
                |row| {
                    Ok(DocMetadata {
                        title: row.get(0)?,
                        timestamp: row.get(1)?,
                    })
                },
            )
            .map_err(|e| read_error(doc_id, e))
    }

    fn max_sentence_id(&self, doc_id: u32) -> Result<Option<i32>, ExecutionError> {
        self.conn
            .query_row(
                "SELECT MAX(sentence_id) FROM annotations WHERE document_id = ?1",
                [doc_id],
                |row| row.get::<_, Option<i32>>(0),
            )
            .map_err(|e| read_error(doc_id, e))
    }
}

fn read_error(doc_id: u32, e: rusqlite::Error) -> ExecutionError {
    ExecutionError::ReadError {
        key: format!("doc:{doc_id}"),
        reason: e.to_string(),
    }
}

/// Creates the `documents` / `annotations` / `dependencies` schema from
/// `Used by the indexer (out of core) and by test
/// fixtures that build a throwaway in-memory store.
pub fn create_schema(conn: &Connection) -> Result<(), ExecutionError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS documents (
            document_id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            text TEXT NOT NULL,
            timestamp TEXT NOT NULL
         );
         CREATE TABLE IF NOT EXISTS annotations (
            document_id INTEGER NOT NULL,
            sentence_id INTEGER NOT NULL,
            begin_char INTEGER NOT NULL,
            end_char INTEGER NOT NULL,
            token TEXT NOT NULL,
            lemma TEXT NOT NULL,
            pos TEXT NOT NULL,
            ner TEXT NOT NULL,
            normalized_ner TEXT
         );
         CREATE TABLE IF NOT EXISTS dependencies (
            document_id INTEGER NOT NULL,
            sentence_id INTEGER NOT NULL,
            governor TEXT NOT NULL,
            relation TEXT NOT NULL,
            dependent TEXT NOT NULL
         );
         CREATE INDEX IF NOT EXISTS idx_annotations_doc_sentence
            ON annotations (document_id, sentence_id);",
    )
    .map_err(|e| ExecutionError::ResourceError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetches_text_and_metadata_by_doc_id() {
        let store = SqliteRelationalStore::open_in_memory().unwrap();
        create_schema(&store.conn).unwrap();
        store
            .conn
            .execute(
                "INSERT INTO documents (document_id, title, text, timestamp) VALUES (1, 'T', 'hello world', '2020-01-01')",
                [],
            )
            .unwrap();
        assert_eq!(&*store.fetch_text(1).unwrap(), "hello world");
        let meta = store.fetch_metadata(1).unwrap();
        assert_eq!(meta.title, "T");
    }

    #[test]
    fn missing_document_is_a_read_error() {
        let store = SqliteRelationalStore::open_in_memory().unwrap();
        create_schema(&store.conn).unwrap();
        assert!(matches!(
            store.fetch_text(99).unwrap_err(),
            ExecutionError::ReadError { .. }
        ));
    }
}
