use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const CONFIG_ENV: &str = "LOGBOOK_CONFIG";
const LOCAL_NAMES: [&str; 4] = ["logbook.yaml", "logbook.yml", ".logbook.yaml", ".logbook.yml"];

/// Colour palette selection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThemeName {
    #[default]
    Dark,
    HighContrast,
}

/// Reconnect backoff for the watch and tail streams
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct RetryConfig {
    /// First delay after a failure
    #[serde(default = "default_retry_initial")]
    pub initial_ms: u64,
    /// Upper bound for the doubled delay
    #[serde(default = "default_retry_max")]
    pub max_ms: u64,
}

fn default_retry_initial() -> u64 {
    500
}
fn default_retry_max() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_ms: default_retry_initial(),
            max_ms: default_retry_max(),
        }
    }
}

/// Root configuration file structure
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct LogbookConfig {
    /// Namespace to watch (the command line wins)
    #[serde(default)]
    pub namespace: Option<String>,

    /// Kubeconfig file; `~/` is expanded
    #[serde(default)]
    pub kubeconfig: Option<PathBuf>,

    /// Longest time a log line waits before it is shown
    #[serde(default = "default_flush_interval")]
    pub flush_interval_ms: u64,

    /// Most lines handed to the viewport at once
    #[serde(default = "default_max_batch")]
    pub max_batch: usize,

    /// Lines kept in the viewport; older lines are dropped
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,

    #[serde(default)]
    pub theme: ThemeName,

    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_flush_interval() -> u64 {
    100
}
fn default_max_batch() -> usize {
    500
}
fn default_max_lines() -> usize {
    50_000
}

impl Default for LogbookConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            kubeconfig: None,
            flush_interval_ms: default_flush_interval(),
            max_batch: default_max_batch(),
            max_lines: default_max_lines(),
            theme: ThemeName::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Yaml(serde_yaml::Error),
    Invalid { field: &'static str, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot read {}: {}", path.display(), source),
            Self::Yaml(e) => write!(f, "YAML parse error: {}", e),
            Self::Invalid { field, reason } => write!(f, "invalid '{}': {}", field, reason),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Yaml(e) => Some(e),
            Self::Invalid { .. } => None,
        }
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(e: serde_yaml::Error) -> Self {
        ConfigError::Yaml(e)
    }
}

impl LogbookConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Load configuration from a string. An empty document yields the defaults.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: LogbookConfig = if content.trim().is_empty() {
            LogbookConfig::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Find and load the configuration.
    ///
    /// Order: `explicit`, then `$LOGBOOK_CONFIG`, then the local names in
    /// `start_dir`, then `$HOME/.config/logbook/config.yaml`. Returns the
    /// defaults and no path when nothing exists. An explicit path that does
    /// not exist is an error.
    pub fn discover(
        explicit: Option<&Path>,
        start_dir: &Path,
    ) -> Result<(Option<PathBuf>, Self), ConfigError> {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let home = std::env::var_os("HOME").map(PathBuf::from);
        Self::discover_from(explicit, env_path, start_dir, home.as_deref())
    }

    fn discover_from(
        explicit: Option<&Path>,
        env_path: Option<PathBuf>,
        start_dir: &Path,
        home: Option<&Path>,
    ) -> Result<(Option<PathBuf>, Self), ConfigError> {
        if let Some(path) = explicit {
            return Ok((Some(path.to_path_buf()), Self::load(path)?));
        }

        let mut candidates: Vec<PathBuf> = env_path.into_iter().collect();
        candidates.extend(LOCAL_NAMES.iter().map(|name| start_dir.join(name)));
        if let Some(home) = home {
            candidates.push(home.join(".config").join("logbook").join("config.yaml"));
        }

        for path in candidates {
            if path.is_file() {
                let config = Self::load(&path)?;
                return Ok((Some(path), config));
            }
        }
        Ok((None, Self::default()))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.flush_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "flush_interval_ms",
                reason: "must be greater than zero".into(),
            });
        }
        if self.max_batch == 0 {
            return Err(ConfigError::Invalid {
                field: "max_batch",
                reason: "must be greater than zero".into(),
            });
        }
        if self.max_lines == 0 {
            return Err(ConfigError::Invalid {
                field: "max_lines",
                reason: "must be greater than zero".into(),
            });
        }
        if self.retry.initial_ms > self.retry.max_ms {
            return Err(ConfigError::Invalid {
                field: "retry.initial_ms",
                reason: format!(
                    "{} is larger than retry.max_ms ({})",
                    self.retry.initial_ms, self.retry.max_ms
                ),
            });
        }
        Ok(())
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Kubeconfig path with a leading `~/` resolved against `home`.
    pub fn kubeconfig_path(&self, home: Option<&Path>) -> Option<PathBuf> {
        let path = self.kubeconfig.as_ref()?;
        match (path.strip_prefix("~"), home) {
            (Ok(rest), Some(home)) => Some(home.join(rest)),
            _ => Some(path.clone()),
        }
    }
}
