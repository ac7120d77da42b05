use chrono::NaiveDate;
use smol_str::SmolStr;

use crate::variable::VariableRegistry;

/// A source position attached to an AST node for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub col: usize,
}

/// Temporal predicates usable in a `DATE(...)` condition or a temporal
/// join. The grammar's date operators map onto this set one-to-one
/// (`<` → `Before`, `>` → `After`, `<=` → `BeforeEqual`, `>=` →
/// `AfterEqual`, `==` → `Equal`), plus the named keyword predicates
/// used by `NEAR`/range/join conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalPredicate {
    Before,
    After,
    BeforeEqual,
    AfterEqual,
    Equal,
    Contains,
    ContainedBy,
    Intersect,
    Proximity,
    Between,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRangeUnit {
    Years,
    Months,
    Days,
}

impl DateRangeUnit {
    /// Normalize a `NEAR ... RADIUS N{y|m|d}` unit to days
    /// (`y=365, m=30, d=1`).
    pub fn to_days(self, n: u32) -> u32 {
        match self {
            DateRangeUnit::Years => n * 365,
            DateRangeUnit::Months => n * 30,
            DateRangeUnit::Days => n,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NerType {
    Person,
    Organization,
    Location,
    Date,
    Time,
    Duration,
    Money,
    Number,
    Ordinal,
    Percent,
    Set,
    Wildcard,
}

impl NerType {
    pub fn parse(raw: &str) -> Option<Self> {
        use NerType::*;
        Some(match raw {
            "PERSON" => Person,
            "ORGANIZATION" => Organization,
            "LOCATION" => Location,
            "DATE" => Date,
            "TIME" => Time,
            "DURATION" => Duration,
            "MONEY" => Money,
            "NUMBER" => Number,
            "ORDINAL" => Ordinal,
            "PERCENT" => Percent,
            "SET" => Set,
            "*" => Wildcard,
            _ => return None,
        })
    }
}

/// One of the three `DEPENDS(gov, rel, dep)` arguments: either a fixed
/// string or a bound variable reference (the component becomes a
/// prefix/full scan).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyArg {
    Literal(SmolStr),
    Variable(SmolStr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// A `WHERE`-clause predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Contains {
        terms: Vec<SmolStr>,
        span: Span,
    },
    Ner {
        entity_type: NerType,
        var: Option<SmolStr>,
        span: Span,
    },
    Pos {
        tag: SmolStr,
        term: Option<SmolStr>,
        var: Option<SmolStr>,
        span: Span,
    },
    Dependency {
        governor: DependencyArg,
        relation: DependencyArg,
        dependent: DependencyArg,
        var: Option<SmolStr>,
        span: Span,
    },
    Temporal {
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        range_days: Option<u32>,
        predicate: TemporalPredicate,
        var: Option<SmolStr>,
        span: Span,
    },
    Logical {
        op: LogicalOp,
        children: Vec<Condition>,
    },
    Not {
        child: Box<Condition>,
        span: Span,
    },
}

impl Condition {
    /// `true` for conditions whose matches bound no new docs/sentences
    /// on their own — used to enforce the "NOT may not stand alone" rule.
    pub fn is_positive(&self) -> bool {
        !matches!(self, Condition::Not { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountTarget {
    All,
    Unique,
    Documents,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectColumn {
    Variable(SmolStr),
    Title,
    Timestamp,
    Count {
        target: CountTarget,
        unique_var: Option<SmolStr>,
    },
    Snippet {
        var: SmolStr,
        window: u8,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec {
    pub key: SmolStr,
    pub direction: OrderDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Document,
    Sentence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinCondition {
    pub left_column: SmolStr,
    pub right_column: SmolStr,
    pub join_type: JoinType,
    pub predicate: TemporalPredicate,
    pub proximity_window_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubquerySpec {
    pub inner: Box<Query>,
    pub alias: SmolStr,
    pub projected_columns: Option<Vec<SelectColumn>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub source: SmolStr,
    pub conditions: Vec<Condition>,
    pub select_columns: Vec<SelectColumn>,
    pub order_by: Vec<OrderSpec>,
    pub limit: Option<u32>,
    pub granularity: Granularity,
    pub granularity_size: Option<u32>,
    pub subqueries: Vec<SubquerySpec>,
    pub join_condition: Option<JoinCondition>,
    pub variable_registry: VariableRegistry,
}
