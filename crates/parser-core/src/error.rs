use thiserror::Error;

/// A tokenization failure, reported with the 1-based line/column of the
/// offending character.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("lex error at {line}:{col}: {reason}")]
pub struct LexError {
    pub line: usize,
    pub col: usize,
    pub reason: String,
}

impl LexError {
    pub fn new(line: usize, col: usize, reason: impl Into<String>) -> Self {
        Self {
            line,
            col,
            reason: reason.into(),
        }
    }
}
