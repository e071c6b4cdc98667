use crate::defaults;
use crate::error::{Result, VoxledgerError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub openai: OpenAiConfig,
    pub parse: ParseConfig,
}

/// HTTP listener and request policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allow_origins: String,
    pub request_timeout_secs: u64,
    pub max_upload_mb: u64,
}

/// Credentials and models for the OpenAI-compatible services
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub llm_model: String,
    pub whisper_model: String,
}

/// Parsing assets and zone defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ParseConfig {
    pub default_timezone: String,
    pub schema_path: Option<PathBuf>,
    pub prompt_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::HOST.to_string(),
            port: defaults::PORT,
            allow_origins: defaults::ALLOW_ORIGINS.to_string(),
            request_timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
            max_upload_mb: defaults::MAX_UPLOAD_MB,
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: defaults::OPENAI_BASE_URL.to_string(),
            llm_model: defaults::LLM_MODEL.to_string(),
            whisper_model: defaults::WHISPER_MODEL.to_string(),
        }
    }
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            default_timezone: defaults::FALLBACK_TIMEZONE.to_string(),
            schema_path: None,
            prompt_path: None,
        }
    }
}

impl ServerConfig {
    /// Deadline applied to one parse run.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Audio upload ceiling in bytes.
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb.saturating_mul(defaults::BYTES_PER_MB)
    }
}

/// Non-empty environment value, if set.
fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Parsed environment value; unparsable values are ignored.
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.trim().parse().ok())
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => VoxledgerError::ConfigFileNotFound {
                path: path.display().to_string(),
            },
            _ => VoxledgerError::Io(e),
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only a missing file falls back to defaults; invalid TOML is an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(VoxledgerError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Uses the variable names of the deployed service (`PORT`, `TZ_DEFAULT`,
    /// `OPENAI_API_KEY`, ...). Empty values and unparsable numbers are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(host) = env_string("HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse("PORT") {
            self.server.port = port;
        }
        if let Some(origins) = env_string("ALLOW_ORIGINS") {
            self.server.allow_origins = origins;
        }
        if let Some(secs) = env_parse("REQUEST_TIMEOUT_SECONDS") {
            self.server.request_timeout_secs = secs;
        }
        if let Some(mb) = env_parse("MAX_UPLOAD_MB") {
            self.server.max_upload_mb = mb;
        }

        if let Some(key) = env_string("OPENAI_API_KEY") {
            self.openai.api_key = key;
        }
        if let Some(url) = env_string("OPENAI_BASE_URL") {
            self.openai.base_url = url;
        }
        if let Some(model) = env_string("OPENAI_LLM_MODEL") {
            self.openai.llm_model = model;
        }
        if let Some(model) = env_string("OPENAI_WHISPER_MODEL") {
            self.openai.whisper_model = model;
        }

        if let Some(tz) = env_string("TZ_DEFAULT") {
            self.parse.default_timezone = tz;
        }
        if let Some(path) = env_string("SCHEMA_PATH") {
            self.parse.schema_path = Some(PathBuf::from(path));
        }
        if let Some(path) = env_string("PROMPT_PATH") {
            self.parse.prompt_path = Some(PathBuf::from(path));
        }

        self
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.server.request_timeout_secs == 0 {
            return Err(VoxledgerError::ConfigInvalidValue {
                key: "server.request_timeout_secs".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.server.max_upload_mb == 0 {
            return Err(VoxledgerError::ConfigInvalidValue {
                key: "server.max_upload_mb".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.openai.base_url.trim().is_empty() {
            return Err(VoxledgerError::ConfigInvalidValue {
                key: "openai.base_url".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Copy with the API key masked, for display.
    pub fn redacted(&self) -> Self {
        let mut shown = self.clone();
        if !shown.openai.api_key.is_empty() {
            shown.openai.api_key = "***".to_string();
        }
        shown
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/voxledger/config.toml on Linux
    #[cfg(feature = "cli")]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("voxledger").join("config.toml"))
    }
}
