//! Client configuration

use crate::auth::signer::DEFAULT_MULTIPLE_SIGN_EXPIRE;
use crate::error::{CosError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Default API host of the file service
pub const DEFAULT_HOST: &str = "web.file.myqcloud.com";

/// Log level for the client and the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
            LogLevel::Off => write!(f, "off"),
        }
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

/// Configuration for a COS client
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CosConfig {
    /// Project id the buckets belong to
    pub app_id: String,

    /// Key id sent as `k` / `q-ak`
    pub secret_id: String,

    /// Signing key; never sent over the wire
    pub secret_key: String,

    /// `http` or `https` (default: https)
    #[serde(default = "default_protocol")]
    pub protocol: String,

    /// API host, optionally with a port (default: web.file.myqcloud.com)
    #[serde(default = "default_host")]
    pub host: String,

    /// Bucket used when a command does not name one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_bucket: Option<String>,

    /// Lifetime of `multiple` signatures in seconds (default: 600)
    #[serde(default = "default_multiple_sign_expire")]
    pub multiple_sign_expire: i64,

    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Log level (default: info)
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_protocol() -> String {
    "https".to_string()
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_multiple_sign_expire() -> i64 {
    DEFAULT_MULTIPLE_SIGN_EXPIRE
}

fn default_timeout_secs() -> u64 {
    30
}

impl fmt::Debug for CosConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CosConfig")
            .field("app_id", &self.app_id)
            .field("secret_id", &self.secret_id)
            .field("secret_key", &"<redacted>")
            .field("protocol", &self.protocol)
            .field("host", &self.host)
            .field("default_bucket", &self.default_bucket)
            .field("multiple_sign_expire", &self.multiple_sign_expire)
            .field("timeout_secs", &self.timeout_secs)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl CosConfig {
    /// Create a configuration with default connection settings
    pub fn new(
        app_id: impl Into<String>,
        secret_id: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            secret_id: secret_id.into(),
            secret_key: secret_key.into(),
            protocol: default_protocol(),
            host: default_host(),
            default_bucket: None,
            multiple_sign_expire: default_multiple_sign_expire(),
            timeout_secs: default_timeout_secs(),
            log_level: LogLevel::default(),
        }
    }

    /// Set the protocol
    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    /// Set the API host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the default bucket
    pub fn default_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.default_bucket = Some(bucket.into());
        self
    }

    /// Set the lifetime of `multiple` signatures
    pub fn multiple_sign_expire(mut self, seconds: i64) -> Self {
        self.multiple_sign_expire = seconds;
        self
    }

    /// Set the request timeout
    pub fn timeout_secs(mut self, seconds: u64) -> Self {
        self.timeout_secs = seconds;
        self
    }

    /// Set the log level
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// `{protocol}://{host}`
    pub fn endpoint(&self) -> String {
        format!("{}://{}", self.protocol, self.host)
    }

    /// Check the configuration before any request is built
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("app_id", &self.app_id),
            ("secret_id", &self.secret_id),
            ("secret_key", &self.secret_key),
            ("host", &self.host),
        ] {
            if value.trim().is_empty() {
                return Err(CosError::config_error(format!("{} must not be empty", name)));
            }
        }

        if self.protocol != "http" && self.protocol != "https" {
            return Err(CosError::config_error(format!(
                "protocol must be http or https, got {}",
                self.protocol
            )));
        }

        if self.multiple_sign_expire <= 0 {
            return Err(CosError::config_error(
                "multiple-sign-expire must be greater than 0",
            ));
        }

        if self.timeout_secs == 0 {
            return Err(CosError::config_error("timeout-secs must be greater than 0"));
        }

        Ok(())
    }

    /// Convert the configuration to a JSON string
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(CosError::from)
    }

    /// Create a configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(CosError::from)
    }

    /// Read a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }
}
