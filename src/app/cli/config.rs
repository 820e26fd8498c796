//! TOML configuration file parsing and loading
//!
//! A route configuration file has top-level logging keys plus `[route]`,
//! `[resequencer]` and `[seda]` tables:
//!
//! ```toml
//! schema-version = 1
//! log-level = "debug"
//!
//! [route]
//! count = 200
//! drop-every = 17
//!
//! [resequencer]
//! capacity = 50
//! timeout-ms = 250
//!
//! [seda]
//! size = 100
//! concurrent-consumers = 4
//! ```
//!
//! Without `--config-file` the default file is read if it exists.

use crate::app::cli::args::Args;
use crate::core::error_handling::ContextualError;
use crate::core::version::config_schema_version;
use crate::resequencer::{ResequencerConfig, StopPolicy};
use crate::seda::SedaConfig;
use crate::trace::DEFAULT_TRACE_QUEUE_SIZE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{message}")]
    Invalid { message: String },

    #[error("Error reading configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ContextualError for ConfigError {
    fn is_user_actionable(&self) -> bool {
        matches!(self, ConfigError::Invalid { .. })
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            ConfigError::Invalid { message } => Some(message),
            ConfigError::Read { .. } => None,
        }
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        message: message.into(),
    }
}

/// What the demo route produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct RouteOptions {
    pub name: String,
    /// Exchanges to produce
    pub count: u64,
    /// Skip every Nth sequence number
    pub drop_every: Option<u64>,
    pub trace: bool,
    pub trace_size: usize,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            name: "demo".to_string(),
            count: 20,
            drop_every: None,
            trace: false,
            trace_size: DEFAULT_TRACE_QUEUE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct RouteSettings {
    pub schema_version: Option<u32>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
    pub log_file: Option<PathBuf>,
    pub color: Option<bool>,
    pub route: RouteOptions,
    pub resequencer: ResequencerConfig,
    pub seda: SedaConfig,
}

/// `<config dir>/Seqroute/seqroute.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("Seqroute").join("seqroute.toml"))
}

impl RouteSettings {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let settings: RouteSettings = toml::from_str(contents)
            .map_err(|e| invalid(format!("Error parsing configuration: {}", e)))?;

        if let Some(version) = settings.schema_version {
            let expected = config_schema_version();
            if version != expected {
                return Err(invalid(format!(
                    "Unsupported configuration schema version {} (expected {})",
                    version, expected
                )));
            }
        }
        Ok(settings)
    }

    /// Load settings from `config_file`, or from the default path if present
    ///
    /// An explicitly named file must exist; a missing default file yields
    /// default settings. Returns the path actually read, if any.
    pub async fn load(config_file: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let config_path = match config_file {
            Some(path) => {
                if !path.exists() {
                    return Err(invalid(format!(
                        "The specified configuration file does not exist: {}",
                        path.display()
                    )));
                }
                Some(path.to_path_buf())
            }
            None => default_config_path().filter(|path| path.exists()),
        };

        let Some(path) = config_path else {
            return Ok((Self::default(), None));
        };

        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
        let settings = Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Invalid { message } => {
                invalid(format!("{} (in {})", message, path.display()))
            }
            other => other,
        })?;
        Ok((settings, Some(path)))
    }

    /// Overlay values given on the command line
    pub fn apply_args(&mut self, args: &Args) -> Result<(), ConfigError> {
        if let Some(name) = &args.name {
            self.route.name = name.clone();
        }
        if let Some(count) = args.count {
            self.route.count = count;
        }
        if args.drop_every.is_some() {
            self.route.drop_every = args.drop_every;
        }
        if args.trace {
            self.route.trace = true;
        }
        if let Some(size) = args.trace_size {
            self.route.trace_size = size;
        }

        if let Some(consumers) = args.consumers {
            self.seda.concurrent_consumers = consumers;
        }
        if args.queue_size.is_some() {
            self.seda.size = args.queue_size;
        }
        if args.block_when_full {
            self.seda.block_when_full = true;
        }

        if let Some(capacity) = args.capacity {
            self.resequencer.capacity = capacity;
        }
        if let Some(timeout) = args.timeout_ms {
            self.resequencer.timeout_ms = timeout;
        }
        if let Some(policy) = &args.stop_policy {
            self.resequencer.stop_policy = StopPolicy::from_str(policy)
                .map_err(|_| invalid(format!("Unknown stop policy '{}'", policy)))?;
        }

        if args.log_level.is_some() {
            self.log_level = args.log_level.clone();
        }
        if args.log_format.is_some() {
            self.log_format = args.log_format.clone();
        }
        if let Some(log_file) = args.log_file_override() {
            self.log_file = log_file;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.route.name.trim().is_empty() {
            return Err(invalid("'route.name' cannot be empty"));
        }
        if self.route.count == 0 {
            return Err(invalid("'route.count' must be greater than 0"));
        }
        if let Some(n) = self.route.drop_every {
            if n < 2 {
                return Err(invalid("'route.drop-every' must be at least 2"));
            }
        }
        if self.route.trace_size == 0 {
            return Err(invalid("'route.trace-size' must be greater than 0"));
        }
        self.resequencer.validate().map_err(invalid)?;
        self.seda.validate().map_err(invalid)?;
        Ok(())
    }

    /// Log file unless it is the `none` or `-` placeholder
    pub fn effective_log_file(&self) -> Option<&Path> {
        self.log_file.as_deref().filter(|path| {
            let text = path.to_string_lossy();
            !(text.eq_ignore_ascii_case("none") || text == "-")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let settings = RouteSettings::from_toml_str("").unwrap();

        assert_eq!(settings, RouteSettings::default());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = RouteSettings::from_toml_str("[seda]\nworkers = 3\n").unwrap_err();
        assert!(err.to_string().contains("workers"), "got: {}", err);
        assert!(err.is_user_actionable());
    }

    #[test]
    fn test_schema_version_mismatch() {
        let err = RouteSettings::from_toml_str("schema-version = 999\n").unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Unsupported configuration schema version 999"));
    }

    #[test]
    fn test_validation_messages() {
        let mut settings = RouteSettings::default();
        settings.route.drop_every = Some(1);
        assert_eq!(
            settings.validate().unwrap_err().to_string(),
            "'route.drop-every' must be at least 2"
        );

        let mut settings = RouteSettings::default();
        settings.seda.concurrent_consumers = 0;
        assert_eq!(
            settings.validate().unwrap_err().user_message(),
            Some("'seda.concurrent-consumers' must be greater than 0")
        );
    }

    #[test]
    fn test_log_file_placeholder() {
        let mut settings = RouteSettings::default();
        settings.log_file = Some(PathBuf::from("none"));
        assert!(settings.effective_log_file().is_none());

        settings.log_file = Some(PathBuf::from("/tmp/route.log"));
        assert_eq!(settings.effective_log_file(), Some(Path::new("/tmp/route.log")));
    }
}
