use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::framing::FramingMode;
use crate::transport::TransportConfig;

/// Directory under `$HOME` holding the default config file.
pub const CONFIG_HOME_DIR: &str = ".binaryedge";
pub const CONFIG_FILE_NAME: &str = "config";

/// Root configuration: parsed from TOML. Every key is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// API token sent as `X-Token`.
    #[serde(default)]
    pub token: String,

    /// File holding the token, read when `token` is empty.
    #[serde(default)]
    pub token_file: Option<PathBuf>,

    /// Job submission endpoint.
    #[serde(default = "default_job_url")]
    pub job_url: String,

    /// Per-account result stream.
    #[serde(default = "default_stream_url")]
    pub stream_url: String,

    /// Global result stream.
    #[serde(default = "default_firehose_url")]
    pub firehose_url: String,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Max silence on an open stream before giving up.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,

    #[serde(default)]
    pub decoder: DecoderConfig,

    /// Output sinks, in dispatch order. Empty = default printer.
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

fn default_job_url() -> String {
    "http://api.binaryedge.io/v1/tasks".into()
}
fn default_stream_url() -> String {
    "http://stream.api.binaryedge.io/v1/stream".into()
}
fn default_firehose_url() -> String {
    "http://stream.api.binaryedge.io/v1/firehose".into()
}
fn default_connect_timeout_secs() -> u64 {
    10
}
fn default_read_timeout_secs() -> u64 {
    300
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            token_file: None,
            job_url: default_job_url(),
            stream_url: default_stream_url(),
            firehose_url: default_firehose_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            decoder: DecoderConfig::default(),
            sinks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DecoderConfig {
    #[serde(default)]
    pub framing: FramingMode,
    /// Largest accepted unit in bytes (0 = unlimited).
    #[serde(default = "default_max_unit_bytes")]
    pub max_unit_bytes: usize,
    /// Malformed units in a row before the session gives up (0 = never).
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,
}

fn default_max_unit_bytes() -> usize {
    16 * 1024 * 1024
}
fn default_max_consecutive_errors() -> u32 {
    100
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            framing: FramingMode::default(),
            max_unit_bytes: default_max_unit_bytes(),
            max_consecutive_errors: default_max_consecutive_errors(),
        }
    }
}

/// One `[[sinks]]` entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SinkConfig {
    /// Factory kind, e.g. "printer", "toml".
    pub kind: String,
    /// Name for diagnostics (default: kind).
    #[serde(default)]
    pub name: Option<String>,
    /// Sink-specific settings.
    #[serde(default)]
    pub config: Option<toml::Value>,
}

impl SinkConfig {
    pub fn of_kind(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: None,
            config: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.kind)
    }
}

/// Sink config as JSON for `SinkFactory::create`; `"{}"` when absent.
pub fn config_json_or_empty(val: &Option<toml::Value>) -> Result<String, ConfigError> {
    match val {
        Some(v) => serde_json::to_string(v).map_err(|e| ConfigError::Invalid {
            context: "sink config",
            detail: e.to_string(),
        }),
        None => Ok("{}".to_string()),
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|source| ConfigError::Parse {
            path: "<inline>".into(),
            source,
        })
    }

    /// `~/.binaryedge/config`, if a home directory is known.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_HOME_DIR).join(CONFIG_FILE_NAME))
    }

    /// Load an explicitly named file, or the default file when it exists,
    /// or fall back to built-in defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => {
                tracing::debug!(path = %path.display(), "loading default config");
                Self::load(&path)
            }
            _ => {
                tracing::debug!("no config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, url) in [
            ("job_url", &self.job_url),
            ("stream_url", &self.stream_url),
            ("firehose_url", &self.firehose_url),
        ] {
            let parsed = reqwest::Url::parse(url).map_err(|e| ConfigError::Invalid {
                context: "url",
                detail: format!("{key} '{url}': {e}"),
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::Invalid {
                    context: "url",
                    detail: format!("{key} '{url}': scheme must be http or https"),
                });
            }
        }
        if self.connect_timeout_secs == 0 || self.read_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                context: "timeout",
                detail: "connect_timeout_secs and read_timeout_secs must be > 0".into(),
            });
        }
        for sink in &self.sinks {
            if sink.kind.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    context: "sinks",
                    detail: "sink entry without kind".into(),
                });
            }
        }
        Ok(())
    }

    /// Token from the command line, else `token`, else `token_file`.
    pub fn resolve_token(&self, explicit: Option<&str>) -> Result<String, ConfigError> {
        if let Some(tok) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
            return Ok(tok.to_string());
        }
        let configured = self.token.trim();
        if !configured.is_empty() {
            return Ok(configured.to_string());
        }
        if let Some(path) = &self.token_file {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
            let tok = content.trim();
            if !tok.is_empty() {
                return Ok(tok.to_string());
            }
        }
        Err(ConfigError::MissingToken)
    }

    pub fn transport(&self, url: &str) -> TransportConfig {
        TransportConfig {
            url: url.to_string(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.read_timeout_secs),
        }
    }
}
