//! Certificate-based TLS for the trapper connection.
//!
//! PSK is not offered by rustls' client API, so `TLSConnect=psk` is rejected
//! before any socket is opened.

use crate::app::config::{TlsConfig, TlsConnect};
use rustls::client::{VerifierBuilderError, WebPkiServerVerifier};
use rustls::pki_types::{CertificateDer, CertificateRevocationListDer, PrivateKeyDer, ServerName};
use rustls::{ClientConfig, RootCertStore};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum TlsError {
    #[error("TLS PSK is not supported by this client")]
    PskNotSupported,
    #[error("{0} is required for certificate-based TLS")]
    MissingFile(&'static str),
    #[error("Cannot read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("No certificate found in {0}")]
    NoCertificates(PathBuf),
    #[error("No private key found in {0}")]
    NoPrivateKey(PathBuf),
    #[error("TLS configuration rejected: {0}")]
    Rustls(#[from] rustls::Error),
    #[error("Server certificate verifier: {0}")]
    Verifier(#[from] VerifierBuilderError),
    #[error("Invalid server name '{0}'")]
    InvalidServerName(String),
    #[error("TLS handshake failed: {0}")]
    Handshake(#[source] std::io::Error),
}

/// Builds a client configuration from the configured CA, certificate, key
/// and optional CRL.
pub fn build_client_config(tls: &TlsConfig) -> Result<Arc<ClientConfig>, TlsError> {
    if tls.connect == TlsConnect::Psk {
        return Err(TlsError::PskNotSupported);
    }

    let ca_file = tls.ca_file.as_deref().ok_or(TlsError::MissingFile("TLSCAFile"))?;
    let cert_file = tls
        .cert_file
        .as_deref()
        .ok_or(TlsError::MissingFile("TLSCertFile"))?;
    let key_file = tls.key_file.as_deref().ok_or(TlsError::MissingFile("TLSKeyFile"))?;

    if tls.server_cert_issuer.is_some() || tls.server_cert_subject.is_some() {
        warn!("TLSServerCertIssuer and TLSServerCertSubject are not enforced");
    }

    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());

    let mut roots = RootCertStore::empty();
    for cert in load_certs(ca_file)? {
        roots.add(cert)?;
    }

    let mut verifier = WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider.clone());
    if let Some(crl_file) = tls.crl_file.as_deref() {
        verifier = verifier
            .with_crls(load_crls(crl_file)?)
            .only_check_end_entity_revocation();
    }
    let verifier = verifier.build()?;

    let config = ClientConfig::builder_with_provider(provider)
        .with_protocol_versions(&[&rustls::version::TLS12, &rustls::version::TLS13])?
        .with_webpki_verifier(verifier)
        .with_client_auth_cert(load_certs(cert_file)?, load_private_key(key_file)?)?;

    Ok(Arc::new(config))
}

/// Runs the client handshake over an established TCP stream.
pub async fn handshake(
    config: Arc<ClientConfig>,
    server: &str,
    tcp: TcpStream,
) -> Result<TlsStream<TcpStream>, TlsError> {
    let server_name = ServerName::try_from(server.to_string())
        .map_err(|_| TlsError::InvalidServerName(server.to_string()))?;
    debug!("Starting TLS handshake with {}", server);
    TlsConnector::from(config)
        .connect(server_name, tcp)
        .await
        .map_err(TlsError::Handshake)
}

fn open(path: &Path) -> Result<BufReader<File>, TlsError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| TlsError::ReadFile {
            path: path.to_path_buf(),
            source,
        })
}

fn read_error(path: &Path) -> impl Fn(std::io::Error) -> TlsError + '_ {
    move |source| TlsError::ReadFile {
        path: path.to_path_buf(),
        source,
    }
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let mut reader = open(path)?;
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_error(path))?;
    if certs.is_empty() {
        return Err(TlsError::NoCertificates(path.to_path_buf()));
    }
    Ok(certs)
}

fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsError> {
    let mut reader = open(path)?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(read_error(path))?
        .ok_or_else(|| TlsError::NoPrivateKey(path.to_path_buf()))
}

fn load_crls(path: &Path) -> Result<Vec<CertificateRevocationListDer<'static>>, TlsError> {
    let mut reader = open(path)?;
    rustls_pemfile::crls(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_error(path))
}
