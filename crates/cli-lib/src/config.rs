use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::OutputFormat;

/// Optional `--config PATH` file supplying defaults for the flags that
/// would otherwise have to be repeated on every invocation. CLI flags
/// always take precedence over a loaded config value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CliConfig {
    pub indexes: Option<PathBuf>,
    pub db: Option<PathBuf>,
    pub limit: Option<u32>,
    pub format: Option<OutputFormat>,
}

impl CliConfig {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let raw = std::fs::read_to_string(path).map_err(|e| format!("reading {path:?}: {e}"))?;
        toml::from_str(&raw).map_err(|e| format!("parsing {path:?}: {e}"))
    }
}
