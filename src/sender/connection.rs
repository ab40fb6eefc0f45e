use super::tls::{self, TlsError};
use crate::app::config::{DEFAULT_TIMEOUT, SenderConfig, TlsConnect};
use crate::domain::SenderError;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Cannot connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Source of the byte stream a send cycle talks to.
///
/// `acquire` opens a connection if none is held. `release` closes it; the
/// server closes its side after each response, so callers release between
/// requests and after any failure.
pub trait ConnectionProvider: Send {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    fn acquire(
        &mut self,
        config: &SenderConfig,
    ) -> impl Future<Output = Result<&mut Self::Stream, SenderError>> + Send;

    fn release(&mut self) -> impl Future<Output = ()> + Send;

    fn is_connected(&self) -> bool;
}

/// Plain or TLS-wrapped TCP stream.
pub enum ZabbixStream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl ZabbixStream {
    pub fn is_encrypted(&self) -> bool {
        matches!(self, ZabbixStream::Tls(_))
    }
}

impl AsyncRead for ZabbixStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ZabbixStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            ZabbixStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for ZabbixStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            ZabbixStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            ZabbixStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ZabbixStream::Plain(s) => Pin::new(s).poll_flush(cx),
            ZabbixStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ZabbixStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            ZabbixStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Opens one TCP connection per request, upgraded to TLS in `cert` mode.
pub struct TcpConnector {
    stream: Option<ZabbixStream>,
    timeout: Duration,
}

impl TcpConnector {
    pub fn new() -> Self {
        Self {
            stream: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT),
        }
    }

    async fn connect(&mut self, config: &SenderConfig) -> Result<ZabbixStream, SenderError> {
        let tls_settings = config.tls();
        // Decided before any socket is opened
        let tls_config = match tls_settings.connect {
            TlsConnect::Psk => return Err(TlsError::PskNotSupported.into()),
            TlsConnect::Cert => Some(tls::build_client_config(tls_settings)?),
            TlsConnect::Unencrypted => None,
        };

        let address = config.server_address();
        let timeout = config.timeout();
        self.timeout = timeout;

        debug!("Connecting to {}", address);
        let connected = tokio::time::timeout(timeout, TcpStream::connect(address.as_str())).await;
        let tcp = match connected {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(ConnectionError::Connect { address, source }.into()),
            Err(_) => {
                return Err(ConnectionError::Timeout {
                    operation: "connect",
                    timeout,
                }
                .into());
            }
        };
        if let Err(e) = tcp.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY: {}", e);
        }

        let Some(tls_config) = tls_config else {
            return Ok(ZabbixStream::Plain(tcp));
        };

        match tokio::time::timeout(
            timeout,
            tls::handshake(tls_config, config.server_active(), tcp),
        )
        .await
        {
            Ok(stream) => Ok(ZabbixStream::Tls(Box::new(stream?))),
            Err(_) => Err(ConnectionError::Timeout {
                operation: "TLS handshake",
                timeout,
            }
            .into()),
        }
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionProvider for TcpConnector {
    type Stream = ZabbixStream;

    async fn acquire(&mut self, config: &SenderConfig) -> Result<&mut ZabbixStream, SenderError> {
        let stream = match self.stream.take() {
            Some(stream) => stream,
            None => self.connect(config).await?,
        };
        Ok(self.stream.insert(stream))
    }

    async fn release(&mut self) {
        let Some(mut stream) = self.stream.take() else {
            return;
        };
        match tokio::time::timeout(self.timeout, stream.shutdown()).await {
            Ok(Ok(())) => debug!("Connection closed"),
            Ok(Err(e)) => debug!("Error while closing connection: {}", e),
            Err(_) => debug!("Timed out closing connection"),
        }
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}
