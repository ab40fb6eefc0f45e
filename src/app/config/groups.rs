use super::TlsConnect;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// TLS material for the connection to the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    pub connect: TlsConnect,
    pub ca_file: Option<PathBuf>,
    pub cert_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    pub crl_file: Option<PathBuf>,
    /// Expected server certificate issuer. Stored, not enforced.
    pub server_cert_issuer: Option<String>,
    /// Expected server certificate subject. Stored, not enforced.
    pub server_cert_subject: Option<String>,
    pub psk_identity: Option<String>,
    pub psk_file: Option<PathBuf>,
}

impl TlsConfig {
    pub fn is_encrypted(&self) -> bool {
        self.connect != TlsConnect::Unencrypted
    }

    pub fn has_cert_material(&self) -> bool {
        self.ca_file.is_some() && self.cert_file.is_some() && self.key_file.is_some()
    }

    pub fn has_psk_material(&self) -> bool {
        self.psk_identity.is_some() && self.psk_file.is_some()
    }
}
