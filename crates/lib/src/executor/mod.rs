mod contains;
mod dependency;
pub mod logical;
mod ner;
mod pos;
mod temporal;

use corpusql_lib_core::{Condition, ExecutionError, MatchDetail};

use crate::context::ExecContext;

/// Single dispatch entry point for every condition kind.
pub fn execute_condition(
    ctx: &ExecContext,
    condition: &Condition,
) -> Result<Vec<MatchDetail>, ExecutionError> {
    ctx.check_cancelled()?;
    match condition {
        Condition::Contains { terms, span } => contains::execute(ctx, terms, *span),
        Condition::Ner {
            entity_type,
            var,
            span,
        } => ner::execute(ctx, entity_type, var.as_ref(), *span),
        Condition::Pos {
            tag,
            term,
            var,
            span,
        } => pos::execute(ctx, tag, term.as_ref(), var.as_ref(), *span),
        Condition::Dependency {
            governor,
            relation,
            dependent,
            var,
            span,
        } => dependency::execute(ctx, governor, relation, dependent, var.as_ref(), *span),
        Condition::Temporal {
            start_date,
            end_date,
            range_days,
            predicate,
            var,
            span,
        } => temporal::execute(
            ctx,
            *start_date,
            *end_date,
            *range_days,
            *predicate,
            var.as_ref(),
            *span,
        ),
        Condition::Logical { op, children } => logical::execute_logical(ctx, *op, children),
        // A bare NOT reaching dispatch (e.g. under OR) has no bounding
        // universe; it is handled specially by `logical::execute_and`
        // when it appears as an AND child, and otherwise contributes
        // nothing, matching the "NOT may not stand alone" rule.
        Condition::Not { .. } => Ok(Vec::new()),
    }
}
