//! Query runner, config loading, logging and output formatting behind
//! the `corpusql` binary.

pub mod commands;
pub mod config;
pub mod formatters;
mod logger;

use std::num::NonZeroUsize;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;
use corpusql_lib::cache::{RawTextCache, SnippetCache};
use corpusql_lib::{execute_query, projector, ExecContext, JoinExecutor, JoinSpec, Table};
use corpusql_lib_core::{parse, validate, Query, QueryError};
use corpusql_storage::{RocksPositionalIndex, SqliteRelationalStore};

/// Capacity for the raw-text and snippet LRU caches shared across a
/// single query's condition executors and projector.
const CACHE_CAPACITY: usize = 256;

pub use commands::{Cli, Command};
pub use formatters::OutputFormat;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const PARSE_ERROR: i32 = 2;
    pub const VALIDATION_ERROR: i32 = 3;
    pub const EXECUTION_ERROR: i32 = 4;
    pub const IO_ERROR: i32 = 5;
}

pub fn main() -> i32 {
    if let Err(e) = logger::init() {
        eprintln!("failed to initialize logging: {e}");
    }
    let cli = Cli::parse();
    match cli.command {
        Command::Query {
            query_text,
            indexes,
            db,
            limit,
            format,
        } => run_query(query_text, indexes, db, limit, format, cli.config),
    }
}

fn run_query(
    query_text: String,
    indexes: Option<std::path::PathBuf>,
    db: Option<std::path::PathBuf>,
    limit: Option<u32>,
    format: Option<commands::CliOutputFormat>,
    config_path: Option<std::path::PathBuf>,
) -> i32 {
    let args = match commands::resolve_query_args(query_text, indexes, db, limit, format, config_path)
    {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {e}");
            return exit_code::IO_ERROR;
        }
    };

    let mut query = match parse(&args.query_text) {
        Ok(q) => q,
        Err(e) => {
            eprintln!("parse error: {e}");
            return exit_code::PARSE_ERROR;
        }
    };
    if let Some(limit) = args.limit {
        query.limit = Some(limit);
    }

    let index = match RocksPositionalIndex::open(&args.indexes) {
        Ok(idx) => idx,
        Err(e) => {
            eprintln!("error opening index at {:?}: {e}", args.indexes);
            return exit_code::IO_ERROR;
        }
    };
    let store = match SqliteRelationalStore::open(&args.db) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("error opening database at {:?}: {e}", args.db);
            return exit_code::IO_ERROR;
        }
    };

    let table = match run_pipeline(&index, &store, &query) {
        Ok(t) => t,
        Err(QueryError::Validation(errors)) => {
            for e in &errors {
                eprintln!("validation error: {e}");
            }
            return exit_code::VALIDATION_ERROR;
        }
        Err(e @ (QueryError::Execution(_) | QueryError::Join(_))) => {
            eprintln!("execution error: {e}");
            return exit_code::EXECUTION_ERROR;
        }
        Err(QueryError::Parse(e)) => {
            eprintln!("parse error: {e}");
            return exit_code::PARSE_ERROR;
        }
    };

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = formatters::write_table(&mut handle, &table, args.format) {
        eprintln!("I/O error writing output: {e}");
        return exit_code::IO_ERROR;
    }

    exit_code::SUCCESS
}

/// Validates, executes and projects `query`. When the query carries a
/// `joinCondition`, its (single) subquery is run the same way and the
/// two projected tables are combined by [`JoinExecutor`] — the outer
/// query and the subquery share the same index handle and the same
/// raw-text/snippet caches.
fn run_pipeline(
    index: &RocksPositionalIndex,
    store: &SqliteRelationalStore,
    query: &Query,
) -> Result<Table, QueryError> {
    let capacity = NonZeroUsize::new(CACHE_CAPACITY).expect("CACHE_CAPACITY is nonzero");
    let text_cache = RawTextCache::new(store, capacity);
    let snippet_cache = SnippetCache::new(capacity);

    let left = run_single(index, &text_cache, &snippet_cache, query)?;
    let Some(join_condition) = &query.join_condition else {
        return Ok(left);
    };
    let subquery = query
        .subqueries
        .first()
        .expect("parser/validator require a subquery when a join condition is present");
    let right = run_single(index, &text_cache, &snippet_cache, &subquery.inner)?;

    let spec = JoinSpec {
        left_column: join_condition.left_column.clone(),
        right_column: join_condition.right_column.clone(),
        right_alias: subquery.alias.clone(),
        join_type: join_condition.join_type,
        predicate: join_condition.predicate,
        proximity_window_days: join_condition.proximity_window_days,
    };
    let mut executor = JoinExecutor::new(spec)?;
    Ok(executor.run(left, right)?)
}

/// Runs one query (the outer query or a subquery) against the shared
/// raw-text and snippet caches, so repeated lookups for the same
/// document across conditions never hit the relational store twice.
fn run_single(
    index: &RocksPositionalIndex,
    text_cache: &RawTextCache,
    snippet_cache: &SnippetCache,
    query: &Query,
) -> Result<Table, QueryError> {
    validate(query).map_err(QueryError::Validation)?;
    let cancel = Arc::new(AtomicBool::new(false));
    let ctx = ExecContext::new(index, text_cache, query.granularity, cancel);
    let result = execute_query(&ctx, query)?;
    Ok(projector::project(&ctx, query, result, Some(snippet_cache))?)
}
