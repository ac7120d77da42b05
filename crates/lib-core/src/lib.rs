//! Query AST, variable registry, parser, and semantic validator for
//! corpusql.

pub mod ast;
pub mod error;
pub mod parser;
pub mod position;
pub mod validate;
pub mod variable;

pub use ast::{
    Condition, CountTarget, DateRangeUnit, DependencyArg, Granularity, JoinCondition, JoinType,
    LogicalOp, NerType, OrderDirection, OrderSpec, Query, SelectColumn, Span, SubquerySpec,
    TemporalPredicate,
};
pub use error::{ExecutionError, JoinError, ParseError, QueryError, ValidationError};
pub use parser::parse;
pub use position::{MatchDetail, Position, PositionList, ValueType};
pub use validate::validate;
pub use variable::{ConditionKind, VariableKind, VariableRegistry};
