use crate::sender::{ConnectionError, FrameError, ResponseError, TlsError};
use thiserror::Error;

/// Top-level error returned by a send cycle.
///
/// Each variant maps to one failure class so callers can tell a
/// misconfigured sender apart from an unreachable server, a peer that does
/// not speak the protocol, or a server answer that could not be understood.
#[derive(Error, Debug)]
pub enum SenderError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Protocol error: {0}")]
    Frame(#[from] FrameError),

    #[error("Unparseable server response: {0}")]
    Response(#[from] ResponseError),

    #[error("TLS error: {0}")]
    Tls(#[from] TlsError),

    #[error("Nothing to send")]
    NothingToSend,
}

impl SenderError {
    /// True when the failure happened before any byte reached the network.
    pub fn is_local(&self) -> bool {
        matches!(self, SenderError::Validation(_) | SenderError::NothingToSend)
    }
}

/// Invalid configuration value or container state.
///
/// Always raised before any network I/O.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("ServerPort must be between 1024 and 32767, {0} provided")]
    ServerPort(u16),

    #[error("DebugLevel must be between 0 and 5, {0} provided")]
    DebugLevel(u8),

    #[error("Timeout must be between 1 and 30, {0} provided")]
    Timeout(u64),

    #[error("ServerActive must not be empty")]
    EmptyServer,

    #[error("Hostname must not be empty")]
    EmptyHostname,

    #[error("dryrun parameter requires boolean, '{0}' provided")]
    Dryrun(String),

    #[error("data_type requires either \"items\" or \"lld\", '{0}' provided")]
    DataType(String),

    #[error("Setup data_type before adding data")]
    DataTypeNotConfigured,

    #[error("TLSConnect must be one of [unencrypted,psk,cert], '{0}' provided")]
    TlsConnect(String),

    #[error("LogType must be one of [file,system,console], '{0}' provided")]
    LogType(String),

    #[error("TLSConnect is cert. TLSCertFile, TLSKeyFile and TLSCAFile are mandatory")]
    MissingCertMaterial,

    #[error("TLSConnect is psk. TLSPSKIdentity and TLSPSKFile are mandatory")]
    MissingPskMaterial,
}
