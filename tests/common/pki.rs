//! Throwaway certificate authority for the cert-mode tests.

use rcgen::{
    BasicConstraints, Certificate, CertificateParams, CertificateRevocationListParams, DnType,
    ExtendedKeyUsagePurpose, IsCa, KeyIdMethod, KeyPair, KeyUsagePurpose, RevocationReason,
    RevokedCertParams, SanType, SerialNumber, date_time_ymd,
};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_rustls::TlsAcceptor;
use zabbix_sender::app::config::{TlsConfig, TlsConnect};

pub struct Authority {
    cert: Certificate,
    key: KeyPair,
}

/// Certificate and key issued by an [`Authority`].
pub struct Leaf {
    pub serial: u8,
    cert: Certificate,
    key: KeyPair,
}

impl Authority {
    pub fn new(name: &str) -> Self {
        let key = KeyPair::generate().unwrap();
        let mut params = CertificateParams::default();
        params.distinguished_name.push(DnType::CommonName, name);
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        let cert = params.self_signed(&key).unwrap();
        Self { cert, key }
    }

    /// Server certificate valid for 127.0.0.1.
    pub fn server(&self, serial: u8) -> Leaf {
        self.issue(
            serial,
            "zabbix-server",
            vec![SanType::IpAddress(IpAddr::V4(Ipv4Addr::LOCALHOST))],
            ExtendedKeyUsagePurpose::ServerAuth,
        )
    }

    pub fn client(&self, serial: u8) -> Leaf {
        self.issue(serial, "zabbix-agent", Vec::new(), ExtendedKeyUsagePurpose::ClientAuth)
    }

    fn issue(
        &self,
        serial: u8,
        name: &str,
        subject_alt_names: Vec<SanType>,
        usage: ExtendedKeyUsagePurpose,
    ) -> Leaf {
        let key = KeyPair::generate().unwrap();
        let mut params = CertificateParams::default();
        params.distinguished_name.push(DnType::CommonName, name);
        params.serial_number = Some(SerialNumber::from(vec![serial]));
        params.subject_alt_names = subject_alt_names;
        params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
        params.extended_key_usages = vec![usage];
        let cert = params.signed_by(&key, &self.cert, &self.key).unwrap();
        Leaf { serial, cert, key }
    }

    /// PEM-encoded CRL revoking `serials`.
    pub fn crl(&self, serials: &[u8]) -> String {
        let revoked_certs = serials
            .iter()
            .map(|&serial| RevokedCertParams {
                serial_number: SerialNumber::from(vec![serial]),
                revocation_time: date_time_ymd(2024, 1, 1),
                reason_code: Some(RevocationReason::KeyCompromise),
                invalidity_date: None,
            })
            .collect();
        let params = CertificateRevocationListParams {
            this_update: date_time_ymd(2024, 1, 1),
            next_update: date_time_ymd(2099, 1, 1),
            crl_number: SerialNumber::from(vec![1u8]),
            issuing_distribution_point: None,
            revoked_certs,
            key_identifier_method: KeyIdMethod::Sha256,
        };
        params.signed_by(&self.cert, &self.key).unwrap().pem().unwrap()
    }

    pub fn pem(&self) -> String {
        self.cert.pem()
    }

    /// Trapper-side TLS that serves `server` and requires a client
    /// certificate issued by this authority.
    pub fn acceptor(&self, server: &Leaf) -> TlsAcceptor {
        let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
        let mut roots = RootCertStore::empty();
        roots.add(self.cert.der().clone()).unwrap();
        let client_verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider.clone())
            .build()
            .unwrap();

        let config = ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_client_cert_verifier(client_verifier)
            .with_single_cert(vec![server.der()], server.private_key())
            .unwrap();
        TlsAcceptor::from(Arc::new(config))
    }
}

impl Leaf {
    pub fn der(&self) -> CertificateDer<'static> {
        self.cert.der().clone()
    }

    fn private_key(&self) -> PrivateKeyDer<'static> {
        PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(self.key.serialize_der()))
    }
}

/// PEM files on disk for a cert-mode client. Removed on drop.
pub struct ClientFiles {
    dir: TempDir,
    pub tls: TlsConfig,
}

impl ClientFiles {
    pub fn new(trusted: &Authority, client: &Leaf, crl: Option<String>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let write = |name: &str, content: &str| -> PathBuf {
            let path = dir.path().join(name);
            std::fs::write(&path, content).unwrap();
            path
        };

        let tls = TlsConfig {
            connect: TlsConnect::Cert,
            ca_file: Some(write("ca.pem", &trusted.pem())),
            cert_file: Some(write("agent.crt", &client.cert.pem())),
            key_file: Some(write("agent.key", &client.key.serialize_pem())),
            crl_file: crl.map(|crl| write("ca.crl", &crl)),
            ..TlsConfig::default()
        };
        Self { dir, tls }
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}
