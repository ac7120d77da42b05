use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::CliConfig;
use crate::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "corpusql", version, about = "Query a corpusql annotated-text corpus")]
pub struct Cli {
    /// Optional TOML config file supplying default paths/format.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a single query and print the resulting table.
    Query {
        query_text: String,

        #[arg(long)]
        indexes: Option<PathBuf>,

        #[arg(long)]
        db: Option<PathBuf>,

        #[arg(long)]
        limit: Option<u32>,

        #[arg(long, value_enum)]
        format: Option<CliOutputFormat>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliOutputFormat {
    Text,
    Csv,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(value: CliOutputFormat) -> Self {
        match value {
            CliOutputFormat::Text => OutputFormat::Text,
            CliOutputFormat::Csv => OutputFormat::Csv,
        }
    }
}

/// Resolved settings for one `query` invocation: CLI flags override
/// whatever a loaded `CliConfig` supplies, which in turn overrides the
/// built-in defaults.
pub struct ResolvedQueryArgs {
    pub query_text: String,
    pub indexes: PathBuf,
    pub db: PathBuf,
    pub limit: Option<u32>,
    pub format: OutputFormat,
}

pub fn resolve_query_args(
    query_text: String,
    indexes: Option<PathBuf>,
    db: Option<PathBuf>,
    limit: Option<u32>,
    format: Option<CliOutputFormat>,
    config_path: Option<PathBuf>,
) -> Result<ResolvedQueryArgs, String> {
    let config = match config_path {
        Some(path) => CliConfig::from_file(&path)?,
        None => CliConfig::default(),
    };

    Ok(ResolvedQueryArgs {
        query_text,
        indexes: indexes
            .or(config.indexes)
            .ok_or_else(|| "no --indexes path given and none set in config".to_string())?,
        db: db
            .or(config.db)
            .ok_or_else(|| "no --db path given and none set in config".to_string())?,
        limit: limit.or(config.limit),
        format: format
            .map(OutputFormat::from)
            .or(config.format)
            .unwrap_or(OutputFormat::Text),
    })
}
