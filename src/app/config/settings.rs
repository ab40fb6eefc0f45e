use super::serde_helpers::{load_env_path_opt, load_env_string, load_env_var};
use super::{ConfigError, LogType, TlsConfig, TlsConnect, parse_dryrun};
use crate::domain::ValidationError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SERVER: &str = "127.0.0.1";
pub const DEFAULT_SERVER_PORT: u16 = 10051;
pub const DEFAULT_TIMEOUT: u64 = 3;
pub const DEFAULT_DEBUG_LEVEL: u8 = 3;
pub const DEFAULT_LOG_FILE: &str = "/tmp/zabbix_agentd.log";

/// Transport configuration read by the protocol layer.
///
/// Fields are private: every mutation goes through a validated setter, and
/// every deserialized value goes through [`SenderConfig::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    server_active: String,
    server_port: u16,
    #[serde(with = "super::serde_helpers")]
    timeout: Duration,
    debug_level: u8,
    dryrun: bool,
    hostname: String,
    log_type: LogType,
    log_file: Option<PathBuf>,
    tls: TlsConfig,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            server_active: DEFAULT_SERVER.to_string(),
            server_port: DEFAULT_SERVER_PORT,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT),
            debug_level: DEFAULT_DEBUG_LEVEL,
            dryrun: false,
            hostname: local_hostname(),
            log_type: LogType::File,
            log_file: Some(PathBuf::from(DEFAULT_LOG_FILE)),
            tls: TlsConfig::default(),
        }
    }
}

impl SenderConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut table: toml::Table = toml::from_str(content)?;
        // Same strictness as the agent file and ZBX_DRYRUN
        let dryrun = table.remove("dryrun").map(dryrun_from_toml).transpose()?;
        let mut config: SenderConfig = toml::Value::Table(table).try_into()?;
        if let Some(dryrun) = dryrun {
            config.set_dryrun(dryrun);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Defaults overridden by `ZBX_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = SenderConfig::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Overrides fields from `ZBX_*` environment variables, validating each one.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(server) = load_env_string("ZBX_SERVER_ACTIVE") {
            self.set_server_active(server)?;
        }
        if let Some(port) = load_env_var::<u16>("ZBX_SERVER_PORT")? {
            self.set_server_port(port)?;
        }
        if let Some(timeout) = load_env_var::<u64>("ZBX_TIMEOUT")? {
            self.set_timeout(timeout)?;
        }
        if let Some(level) = load_env_var::<u8>("ZBX_DEBUG_LEVEL")? {
            self.set_debug_level(level)?;
        }
        if let Some(dryrun) = load_env_string("ZBX_DRYRUN") {
            self.set_dryrun(parse_dryrun(&dryrun)?);
        }
        if let Some(hostname) = load_env_string("ZBX_HOSTNAME") {
            self.set_hostname(hostname)?;
        }

        // TLS material is checked as a whole once every variable is read
        let mut tls = self.tls.clone();
        if let Some(connect) = load_env_string("ZBX_TLS_CONNECT") {
            tls.connect = connect.parse::<TlsConnect>()?;
        }
        load_env_path_opt("ZBX_TLS_CA_FILE", &mut tls.ca_file);
        load_env_path_opt("ZBX_TLS_CERT_FILE", &mut tls.cert_file);
        load_env_path_opt("ZBX_TLS_KEY_FILE", &mut tls.key_file);
        load_env_path_opt("ZBX_TLS_CRL_FILE", &mut tls.crl_file);
        self.set_tls(tls)?;

        Ok(())
    }

    pub fn server_active(&self) -> &str {
        &self.server_active
    }

    pub fn set_server_active(&mut self, server: impl Into<String>) -> Result<(), ValidationError> {
        let server = server.into();
        if server.trim().is_empty() {
            return Err(ValidationError::EmptyServer);
        }
        self.server_active = server.trim().to_string();
        Ok(())
    }

    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    /// Same range as `ListenPort` on Zabbix server and proxy.
    pub fn set_server_port(&mut self, port: u16) -> Result<(), ValidationError> {
        if !(1024..=32767).contains(&port) {
            return Err(ValidationError::ServerPort(port));
        }
        self.server_port = port;
        Ok(())
    }

    /// `host:port`, with IPv6 literals bracketed.
    pub fn server_address(&self) -> String {
        if self.server_active.contains(':') {
            format!("[{}]:{}", self.server_active, self.server_port)
        } else {
            format!("{}:{}", self.server_active, self.server_port)
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, secs: u64) -> Result<(), ValidationError> {
        if !(1..=30).contains(&secs) {
            return Err(ValidationError::Timeout(secs));
        }
        self.timeout = Duration::from_secs(secs);
        Ok(())
    }

    pub fn debug_level(&self) -> u8 {
        self.debug_level
    }

    pub fn set_debug_level(&mut self, level: u8) -> Result<(), ValidationError> {
        if level > 5 {
            return Err(ValidationError::DebugLevel(level));
        }
        self.debug_level = level;
        Ok(())
    }

    pub(crate) fn cap_debug_level(&mut self, max: u8) {
        self.debug_level = self.debug_level.min(max);
    }

    pub fn dryrun(&self) -> bool {
        self.dryrun
    }

    pub fn set_dryrun(&mut self, dryrun: bool) {
        self.dryrun = dryrun;
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn set_hostname(&mut self, hostname: impl Into<String>) -> Result<(), ValidationError> {
        let hostname = hostname.into();
        if hostname.trim().is_empty() {
            return Err(ValidationError::EmptyHostname);
        }
        self.hostname = hostname;
        Ok(())
    }

    pub fn log_type(&self) -> LogType {
        self.log_type
    }

    pub fn set_log_type(&mut self, log_type: LogType) {
        self.log_type = log_type;
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    pub fn set_log_file(&mut self, path: Option<PathBuf>) {
        self.log_file = path;
    }

    pub fn tls(&self) -> &TlsConfig {
        &self.tls
    }

    /// Replaces the TLS settings; `cert` and `psk` modes require their material.
    pub fn set_tls(&mut self, tls: TlsConfig) -> Result<(), ValidationError> {
        validate_tls(&tls)?;
        self.tls = tls;
        Ok(())
    }
}

pub(super) fn validate_tls(tls: &TlsConfig) -> Result<(), ValidationError> {
    match tls.connect {
        TlsConnect::Cert if !tls.has_cert_material() => Err(ValidationError::MissingCertMaterial),
        TlsConnect::Psk if !tls.has_psk_material() => Err(ValidationError::MissingPskMaterial),
        _ => Ok(()),
    }
}

fn dryrun_from_toml(value: toml::Value) -> Result<bool, ValidationError> {
    match value {
        toml::Value::Boolean(dryrun) => Ok(dryrun),
        toml::Value::String(text) => parse_dryrun(&text),
        other => Err(ValidationError::Dryrun(other.to_string())),
    }
}

fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}
