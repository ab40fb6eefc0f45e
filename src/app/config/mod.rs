mod agent_file;
pub mod groups;
pub mod serde_helpers;
mod settings;
mod validation;

use crate::domain::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Environment error: {0}")]
    EnvError(String),
    #[error("Agent configuration error at line {line}: {reason}")]
    AgentFile { line: usize, reason: String },
}

/// How the sender connects to the server or proxy (`TLSConnect`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsConnect {
    #[default]
    Unencrypted,
    Psk,
    Cert,
}

impl FromStr for TlsConnect {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unencrypted" => Ok(TlsConnect::Unencrypted),
            "psk" => Ok(TlsConnect::Psk),
            "cert" => Ok(TlsConnect::Cert),
            other => Err(ValidationError::TlsConnect(other.to_string())),
        }
    }
}

impl fmt::Display for TlsConnect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TlsConnect::Unencrypted => "unencrypted",
            TlsConnect::Psk => "psk",
            TlsConnect::Cert => "cert",
        })
    }
}

/// Where diagnostics go (`LogType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    #[default]
    File,
    System,
    Console,
}

impl FromStr for LogType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(LogType::File),
            "system" => Ok(LogType::System),
            "console" => Ok(LogType::Console),
            other => Err(ValidationError::LogType(other.to_string())),
        }
    }
}

/// Strict boolean parsing for string sources; anything but `true`/`false` is rejected.
pub fn parse_dryrun(value: &str) -> Result<bool, ValidationError> {
    match value.trim() {
        "true" | "True" => Ok(true),
        "false" | "False" => Ok(false),
        other => Err(ValidationError::Dryrun(other.to_string())),
    }
}

pub use agent_file::DEFAULT_AGENT_CONFIG;
pub use groups::TlsConfig;
pub use settings::{
    DEFAULT_DEBUG_LEVEL, DEFAULT_LOG_FILE, DEFAULT_SERVER, DEFAULT_SERVER_PORT, DEFAULT_TIMEOUT,
    SenderConfig,
};
