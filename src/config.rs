//! Resolver configuration, loadable from TOML.
//!
//! ```toml
//! mode = "parallel"
//! max_threads = 4
//! separator = "/"
//! log_filter = "agentlog=debug"
//! ```

use crate::error::{Error, Result};
use crate::path::DEFAULT_SEPARATOR;
use serde::{Deserialize, Serialize};

/// How candidate rules are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// One candidate after the other, stopping at the first success.
    Sequential,
    /// All candidates on worker threads, joined before selection.
    Parallel,
}

impl Default for ExecutionMode {
    fn default() -> Self {
        ExecutionMode::Sequential
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Mode for callers without the `@` flag. `@` callers always fan out.
    pub mode: ExecutionMode,
    /// Upper bound on worker threads per parallel resolution.
    pub max_threads: usize,
    /// Separator for textual paths.
    pub separator: char,
    /// Default filter directive for `trace::init_subscriber`.
    pub log_filter: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            max_threads: num_cpus(),
            separator: DEFAULT_SEPARATOR,
            log_filter: "info".to_string(),
        }
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl ResolverConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: ResolverConfig =
            toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_threads == 0 {
            return Err(Error::Config("max_threads must be at least 1".to_string()));
        }
        if self.separator.is_whitespace() || matches!(self.separator, '~' | '@' | '_') {
            return Err(Error::Config(format!(
                "'{}' cannot be used as path separator",
                self.separator
            )));
        }
        Ok(())
    }
}
