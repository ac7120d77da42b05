use corpusql_lib_core::{
    CountTarget, ExecutionError, Granularity, MatchDetail, OrderDirection, Query, SelectColumn,
};
use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use crate::cache::SnippetCache;
use crate::context::{group_key, ExecContext};
use crate::result::{Cell, QueryResult, Row, Table};
use crate::snippet::{ContextAnchor, SnippetExpander, SnippetSentence};

/// Groups a `QueryResult` by granularity key, applies the SELECT list,
/// ORDER BY and LIMIT. Pure function of its inputs (aside from
/// `snippet_cache`, an optional shared cache consulted and populated
/// for `SNIPPET` columns): running it twice on the same result yields
/// identical tables.
pub fn project(
    ctx: &ExecContext,
    query: &Query,
    result: QueryResult,
    snippet_cache: Option<&SnippetCache>,
) -> Result<Table, ExecutionError> {
    let result = result.sorted();
    let columns: Vec<String> = query
        .select_columns
        .iter()
        .map(column_name)
        .collect();

    // A SELECT list made entirely of COUNT columns is an aggregate over
    // the whole result, collapsing to a single row rather than one row
    // per granularity key: Count(ALL|DOCUMENTS|UNIQUE ?v) is defined
    // over the whole result, not a group.
    let rows = if is_pure_aggregate(&query.select_columns) {
        let all: Vec<&MatchDetail> = result.matches.iter().collect();
        project_group(ctx, &query.select_columns, (0, 0), &all, snippet_cache)?
    } else {
        let groups = group_by_key(&result.matches, result.granularity);
        let mut rows = Vec::new();
        for (key, matches) in &groups {
            rows.extend(project_group(ctx, &query.select_columns, *key, matches, snippet_cache)?);
        }
        rows
    };

    let mut table = Table { columns, rows };
    apply_order_by(query, &mut table);
    apply_limit(query, &mut table);
    Ok(table)
}

fn is_pure_aggregate(columns: &[SelectColumn]) -> bool {
    !columns.is_empty() && columns.iter().all(|c| matches!(c, SelectColumn::Count { .. }))
}

fn group_by_key(
    matches: &[MatchDetail],
    granularity: Granularity,
) -> Vec<((u32, i32), Vec<&MatchDetail>)> {
    let mut grouped: corpusql_helpers::IndexMap<(u32, i32), Vec<&MatchDetail>> = Default::default();
    for m in matches {
        let key = group_key(&m.position, granularity);
        grouped.entry(key).or_default().push(m);
    }
    grouped.into_iter().collect()
}

/// One granularity group can expand to several rows: a variable with
/// several bindings in the same group produces a row per binding,
/// cartesian with the group's other single-valued columns.
fn project_group(
    ctx: &ExecContext,
    columns: &[SelectColumn],
    key: (u32, i32),
    matches: &[&MatchDetail],
    snippet_cache: Option<&SnippetCache>,
) -> Result<Vec<Row>, ExecutionError> {
    let mut per_column_cells: Vec<Vec<Cell>> = Vec::with_capacity(columns.len());
    for column in columns {
        per_column_cells.push(project_column(ctx, column, key, matches, snippet_cache)?);
    }

    let row_count = per_column_cells.iter().map(|c| c.len().max(1)).max().unwrap_or(1);
    let mut rows = Vec::with_capacity(row_count);
    for i in 0..row_count {
        let mut cells = Vec::with_capacity(columns.len());
        for col_cells in &per_column_cells {
            cells.push(
                col_cells
                    .get(i)
                    .or_else(|| col_cells.first())
                    .cloned()
                    .unwrap_or(Cell::Empty),
            );
        }
        rows.push(Row(cells));
    }
    Ok(rows)
}

fn project_column(
    ctx: &ExecContext,
    column: &SelectColumn,
    (doc_id, _sentence_id): (u32, i32),
    matches: &[&MatchDetail],
    snippet_cache: Option<&SnippetCache>,
) -> Result<Vec<Cell>, ExecutionError> {
    match column {
        // Bare identifier columns (no leading `?`) are a handful of
        // built-in pass-through columns rather than logic-variable
        // bindings; `date` surfaces the matched position's document
        // date directly, the way `TITLE`/`TIMESTAMP` surface relational
        // metadata. Anything else bare is not a recognized pass-through
        // and renders empty.
        SelectColumn::Variable(name) if name.starts_with('#') => {
            if &name[1..] == "date" {
                let day = matches
                    .first()
                    .map(|m| m.position.doc_date.format("%Y-%m-%d").to_string());
                Ok(vec![day.map(Cell::Text).unwrap_or(Cell::Empty)])
            } else {
                Ok(vec![Cell::Empty])
            }
        }
        SelectColumn::Variable(name) => {
            let values: Vec<Cell> = matches
                .iter()
                .filter(|m| m.variable_name.as_deref() == Some(name.as_str()))
                .map(|m| Cell::Text(m.value.to_string()))
                .collect();
            Ok(if values.is_empty() {
                vec![Cell::Empty]
            } else {
                values
            })
        }
        SelectColumn::Title => {
            let meta = ctx.text.fetch_metadata(doc_id)?;
            Ok(vec![Cell::Text(meta.title)])
        }
        SelectColumn::Timestamp => {
            let meta = ctx.text.fetch_metadata(doc_id)?;
            Ok(vec![Cell::Text(meta.timestamp)])
        }
        SelectColumn::Count { target, unique_var } => {
            let n = match target {
                CountTarget::All => matches.len() as i64,
                CountTarget::Documents => {
                    let distinct: FxHashSet<u32> = matches.iter().map(|m| m.position.doc_id).collect();
                    distinct.len() as i64
                }
                CountTarget::Unique => {
                    let name = unique_var.as_deref().unwrap_or_default();
                    let distinct: FxHashSet<&str> = matches
                        .iter()
                        .filter(|m| m.variable_name.as_deref() == Some(name))
                        .map(|m| m.value.as_str())
                        .collect();
                    distinct.len() as i64
                }
            };
            Ok(vec![Cell::Integer(n)])
        }
        SelectColumn::Snippet { var, window } => {
            let anchors: Vec<&MatchDetail> = matches
                .iter()
                .filter(|m| m.variable_name.as_deref() == Some(var.as_str()))
                .copied()
                .collect();
            if anchors.is_empty() {
                return Ok(vec![Cell::Empty]);
            }
            let expander = SnippetExpander::new(ctx.text, Default::default());
            let mut cells = Vec::with_capacity(anchors.len());
            for m in anchors {
                let sentence_id = m.position.sentence_id.max(0);
                let cache_key = crate::cache::SnippetKey {
                    doc_id: m.position.doc_id,
                    sentence_id,
                    window: *window,
                };
                if let Some(cached) = snippet_cache.and_then(|c| c.get(cache_key)) {
                    cells.push(Cell::Text(cached.to_string()));
                    continue;
                }
                let anchor = ContextAnchor {
                    doc_id: m.position.doc_id,
                    sentence_id,
                    begin_char: m.position.begin_char,
                    end_char: m.position.end_char,
                    variable_name: Some(var.clone()),
                };
                let sentences: Vec<SnippetSentence> = expander.expand(&anchor, *window)?;
                let text = crate::snippet::assemble(&sentences, " ");
                if let Some(cache) = snippet_cache {
                    cache.put(cache_key, std::sync::Arc::from(text.as_str()));
                }
                cells.push(Cell::Text(text));
            }
            Ok(cells)
        }
    }
}

fn column_name(column: &SelectColumn) -> String {
    match column {
        SelectColumn::Variable(name) => name
            .strip_prefix('#')
            .or_else(|| name.strip_prefix('?'))
            .unwrap_or(name)
            .to_string(),
        SelectColumn::Title => "title".to_string(),
        SelectColumn::Timestamp => "timestamp".to_string(),
        SelectColumn::Count { target, unique_var } => match (target, unique_var) {
            (CountTarget::All, _) => "count".to_string(),
            (CountTarget::Documents, _) => "count_documents".to_string(),
            (CountTarget::Unique, Some(v)) => format!("count_unique_{v}"),
            (CountTarget::Unique, None) => "count_unique".to_string(),
        },
        SelectColumn::Snippet { var, .. } => format!("snippet_{var}"),
    }
}

fn apply_order_by(query: &Query, table: &mut Table) {
    if query.order_by.is_empty() {
        return;
    }
    for spec in query.order_by.iter().rev() {
        let Some(col_idx) = column_index_for_order(table, &spec.key) else {
            continue;
        };
        table.rows.sort_by(|a, b| {
            let ord = a.0[col_idx].render().cmp(&b.0[col_idx].render());
            match spec.direction {
                OrderDirection::Asc => ord,
                OrderDirection::Desc => ord.reverse(),
            }
        });
    }
}

fn column_index_for_order(table: &Table, key: &SmolStr) -> Option<usize> {
    let name: &str = key.strip_prefix('?').unwrap_or(key.as_str());
    table.columns.iter().position(|c| c == name)
}

fn apply_limit(query: &Query, table: &mut Table) {
    if let Some(limit) = query.limit {
        table.rows.truncate(limit as usize);
    }
}
