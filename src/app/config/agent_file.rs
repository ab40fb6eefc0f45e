//! Reader for the protocol-relevant subset of `zabbix_agentd.conf`.

use super::{ConfigError, DEFAULT_SERVER_PORT, LogType, SenderConfig, TlsConnect};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_AGENT_CONFIG: &str = "/etc/zabbix/zabbix_agentd.conf";

impl SenderConfig {
    /// Loads settings from an agent configuration file.
    ///
    /// A missing file is not an error: defaults are returned and a warning is
    /// logged.
    pub fn from_agent_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Reading Zabbix Agent configuration file {}", path.display());
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_agent_str(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("No configuration found at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Parses agent configuration text. Unknown keys are ignored.
    pub fn from_agent_str(content: &str) -> Result<Self, ConfigError> {
        let entries = parse_entries(content)?;
        let mut config = SenderConfig::default();

        if let Some(entry) = entries.get("DebugLevel") {
            config.set_debug_level(parse_number(entry, "DebugLevel")?)?;
        }
        if let Some(entry) = entries.get("Timeout") {
            config.set_timeout(parse_number(entry, "Timeout")?)?;
        }
        if let Some(entry) = entries.get("Hostname") {
            config.set_hostname(entry.value.clone())?;
        }
        if let Some(entry) = entries.get("ServerActive") {
            let (server, port) = split_server_active(&entry.value, entry.line)?;
            config.set_server_active(server)?;
            config.set_server_port(port)?;
        }

        apply_log_entries(&mut config, &entries)?;
        apply_tls_entries(&mut config, &entries)?;

        Ok(config)
    }
}

/// Value of one `Key=Value` line, with its 1-based line number.
#[derive(Debug, Clone)]
struct Entry {
    line: usize,
    value: String,
}

type Entries = HashMap<String, Entry>;

fn parse_entries(content: &str) -> Result<Entries, ConfigError> {
    let mut entries = HashMap::new();
    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(ConfigError::AgentFile {
                line: index + 1,
                reason: format!("expected Key=Value, got '{line}'"),
            });
        };
        // Repeated keys (UserParameter, Include) keep the last occurrence
        entries.insert(
            key.trim().to_string(),
            Entry {
                line: index + 1,
                value: value.trim().to_string(),
            },
        );
    }
    Ok(entries)
}

fn parse_number<T: std::str::FromStr>(entry: &Entry, key: &str) -> Result<T, ConfigError> {
    parse_number_at(&entry.value, key, entry.line)
}

fn parse_number_at<T: std::str::FromStr>(
    value: &str,
    key: &str,
    line: usize,
) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::AgentFile {
        line,
        reason: format!("{key} requires an integer, '{value}' provided"),
    })
}

/// Splits `ServerActive` into host and port.
///
/// Only the first entry of a comma separated list is used. Accepts `host`,
/// `host:port`, `[v6]:port` and bare IPv6 literals.
pub(crate) fn split_server_active(value: &str, line: usize) -> Result<(String, u16), ConfigError> {
    let first = value.split(',').next().unwrap_or_default().trim();

    if let Some(rest) = first.strip_prefix('[') {
        let Some((host, tail)) = rest.split_once(']') else {
            return Err(ConfigError::AgentFile {
                line,
                reason: format!("unterminated IPv6 literal in ServerActive '{first}'"),
            });
        };
        let port = match tail.strip_prefix(':') {
            Some(port) => parse_number_at(port, "ServerActive port", line)?,
            None => DEFAULT_SERVER_PORT,
        };
        return Ok((host.to_string(), port));
    }

    match first.matches(':').count() {
        0 => Ok((first.to_string(), DEFAULT_SERVER_PORT)),
        1 => {
            let (host, port) = first.split_once(':').unwrap_or((first, ""));
            Ok((host.to_string(), parse_number_at(port, "ServerActive port", line)?))
        }
        _ => Ok((first.to_string(), DEFAULT_SERVER_PORT)),
    }
}

fn apply_log_entries(
    config: &mut SenderConfig,
    entries: &Entries,
) -> Result<(), ConfigError> {
    if let Some(entry) = entries.get("LogType") {
        config.set_log_type(entry.value.parse::<LogType>()?);
    }

    match config.log_type() {
        LogType::System | LogType::Console => config.set_log_file(None),
        LogType::File => match entries.get("LogFile").map(|entry| entry.value.as_str()) {
            // Zabbix 2.4: LogFile=- means syslog
            Some("-") => {
                config.set_log_file(None);
                config.set_log_type(LogType::System);
            }
            Some(path) => config.set_log_file(Some(PathBuf::from(path))),
            None => {}
        },
    }
    Ok(())
}

fn apply_tls_entries(
    config: &mut SenderConfig,
    entries: &Entries,
) -> Result<(), ConfigError> {
    let mut tls = config.tls().clone();
    if let Some(entry) = entries.get("TLSConnect") {
        tls.connect = entry.value.parse::<TlsConnect>()?;
    }

    let path = |key: &str| entries.get(key).map(|entry| PathBuf::from(&entry.value));
    let text = |key: &str| entries.get(key).map(|entry| entry.value.clone());

    match tls.connect {
        TlsConnect::Cert => {
            tls.ca_file = path("TLSCAFile");
            tls.cert_file = path("TLSCertFile");
            tls.key_file = path("TLSKeyFile");
            tls.crl_file = path("TLSCRLFile");
            tls.server_cert_issuer = text("TLSServerCertIssuer");
            tls.server_cert_subject = text("TLSServerCertSubject");
        }
        TlsConnect::Psk => {
            tls.psk_identity = text("TLSPSKIdentity");
            tls.psk_file = path("TLSPSKFile");
        }
        TlsConnect::Unencrypted => {}
    }

    config.set_tls(tls)?;
    Ok(())
}
