use corpusql_parser_core::LexError;
use thiserror::Error;

/// A syntax error, surfaced with the line/column of the offending
/// token and the grammar rule that failed to match.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("parse error at {line}:{col} while parsing {rule}: {reason}")]
    Syntax {
        line: usize,
        col: usize,
        rule: &'static str,
        reason: String,
    },
}

impl ParseError {
    pub fn syntax(line: usize, col: usize, rule: &'static str, reason: impl Into<String>) -> Self {
        ParseError::Syntax {
            line,
            col,
            rule,
            reason: reason.into(),
        }
    }
}

/// A semantic-validation failure. Multiple `ValidationError`s can be
/// produced by a single `validate()` call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("variable {name:?} is used in {context} but has no producing condition")]
    UnboundVariable { name: String, context: &'static str },
    #[error("variable {name:?} has producers with incompatible kinds")]
    KindConflict { name: String },
    #[error("NER type {ty:?} is not a recognized entity type")]
    UnknownNerType { ty: String },
    #[error("BETWEEN range has end date before start date")]
    InvalidDateRange,
    #[error("DEPENDS component must not be empty")]
    EmptyDependencyComponent,
    #[error("LIMIT must be >= 1, got {0}")]
    InvalidLimit(u32),
    #[error("SNIPPET window must be in [0, 5], got {0}")]
    InvalidSnippetWindow(u32),
    #[error("projection list must be non-empty")]
    EmptyProjection,
    #[error("bare '*' is not a supported projection")]
    BareStarProjection,
    #[error("NOT at the top level must be combined with at least one positive condition")]
    UnboundedNot,
}

/// Execution-time failures reading the index or the relational store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("read error for key {key:?}: {reason}")]
    ReadError { key: String, reason: String },
    #[error("resource error: {0}")]
    ResourceError(String),
    #[error("internal error: {0}")]
    InternalError(String),
    #[error("query cancelled")]
    Cancelled,
}

/// Subquery join failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JoinError {
    #[error("join column {0:?} does not exist")]
    MissingColumn(String),
    #[error("join column {0:?} is not date-typed")]
    NonDateColumn(String),
    #[error("PROXIMITY join requires a positive window")]
    MissingProximityWindow,
}

/// Unifies every error kind so the top-level runner can convert any
/// failure into a single error return with context: all errors
/// propagate up to the top-level runner through this type.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QueryError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("validation failed: {0:?}")]
    Validation(Vec<ValidationError>),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error(transparent)]
    Join(#[from] JoinError),
}
