#![allow(dead_code)]

pub mod pki;

use serde_json::Value;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;
use zabbix_sender::SenderError;
use zabbix_sender::app::config::{LogType, SenderConfig};
use zabbix_sender::domain::Item;
use zabbix_sender::sender::{ConnectionProvider, encode_frame};

/// What the fake trapper answers to each request.
#[derive(Debug, Clone)]
pub enum Reply {
    /// `success`, every item processed.
    Counters,
    /// `success` with a fixed info string.
    Info(String),
    /// Bytes written verbatim instead of a frame.
    Raw(Vec<u8>),
    /// Answers `Counters` for the first `n` requests, then junk info.
    FailAfter(usize),
    /// Reads the request and never answers.
    Silent,
}

impl Reply {
    fn render(&self, request_index: usize, items: usize) -> Option<Vec<u8>> {
        let info = match self {
            Reply::Counters => counters_info(items),
            Reply::Info(info) => info.clone(),
            Reply::Raw(bytes) => return Some(bytes.clone()),
            Reply::FailAfter(n) if request_index < *n => counters_info(items),
            Reply::FailAfter(_) => "unexpected answer".to_string(),
            Reply::Silent => return None,
        };
        let body = serde_json::json!({"response": "success", "info": info});
        Some(encode_frame(body.to_string().as_bytes()).to_vec())
    }
}

pub fn counters_info(items: usize) -> String {
    format!("processed: {items}; failed: 0; total: {items}; seconds spent: 0.000100")
}

/// What the fake trapper saw.
#[derive(Debug, Clone, Default)]
pub struct TrapperStats {
    accepted: Arc<AtomicUsize>,
    handshakes: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl TrapperStats {
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Completed server-side TLS handshakes.
    pub fn handshakes(&self) -> usize {
        self.handshakes.load(Ordering::SeqCst)
    }

    pub fn round_trips(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Item count of each request, in arrival order.
    pub fn request_sizes(&self) -> Vec<usize> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r["data"].as_array().map_or(0, Vec::len))
            .collect()
    }

    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

async fn read_request<S>(stream: &mut S) -> std::io::Result<Value>
where
    S: AsyncRead + Unpin,
{
    let mut header = [0u8; 13];
    stream.read_exact(&mut header).await?;
    assert_eq!(&header[..5], b"ZBXD\x01", "client sent a bad header");
    let len = u64::from_le_bytes(header[5..13].try_into().unwrap()) as usize;
    let mut body = vec![0u8; len];
    stream.read_exact(&mut body).await?;
    Ok(serde_json::from_slice(&body).expect("client sent invalid JSON"))
}

async fn respond<S>(mut stream: S, reply: Reply, stats: TrapperStats)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let Ok(request) = read_request(&mut stream).await else {
        return;
    };
    let items = request["data"].as_array().map_or(0, Vec::len);
    let index = {
        let mut requests = stats.requests.lock().unwrap();
        requests.push(request);
        requests.len() - 1
    };

    match reply.render(index, items) {
        Some(bytes) => {
            let _ = stream.write_all(&bytes).await;
            let _ = stream.shutdown().await;
        }
        None => tokio::time::sleep(Duration::from_secs(10)).await,
    }
}

static NEXT_PORT: AtomicU16 = AtomicU16::new(0);

/// Binds a loopback listener on a port the config validation accepts.
pub async fn bind_in_range() -> TcpListener {
    let _ = NEXT_PORT.compare_exchange(
        0,
        20000 + (std::process::id() % 8000) as u16,
        Ordering::SeqCst,
        Ordering::SeqCst,
    );
    for _ in 0..500 {
        let mut port = NEXT_PORT.fetch_add(1, Ordering::SeqCst);
        if !(1024..=32767).contains(&port) {
            port = 20000 + port % 8000;
        }
        if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)).await {
            return listener;
        }
    }
    panic!("no free loopback port between 1024 and 32767");
}

/// Port nothing listens on.
pub async fn unused_port() -> u16 {
    let listener = bind_in_range().await;
    listener.local_addr().unwrap().port()
}

/// TCP server speaking the trapper side of the protocol. One request per
/// connection, then the connection is closed.
pub struct FakeTrapper {
    pub port: u16,
    pub stats: TrapperStats,
    handle: JoinHandle<()>,
}

impl FakeTrapper {
    pub async fn start(reply: Reply) -> Self {
        Self::spawn(reply, None).await
    }

    /// Trapper behind TLS. Connections whose handshake fails are dropped
    /// without reading a request.
    pub async fn start_tls(reply: Reply, acceptor: TlsAcceptor) -> Self {
        Self::spawn(reply, Some(acceptor)).await
    }

    async fn spawn(reply: Reply, acceptor: Option<TlsAcceptor>) -> Self {
        let listener = bind_in_range().await;
        let port = listener.local_addr().unwrap().port();
        let stats = TrapperStats::default();
        let server_stats = stats.clone();

        let handle = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                server_stats.accepted.fetch_add(1, Ordering::SeqCst);
                let reply = reply.clone();
                let stats = server_stats.clone();
                match acceptor.clone() {
                    None => {
                        tokio::spawn(respond(socket, reply, stats));
                    }
                    Some(acceptor) => {
                        tokio::spawn(async move {
                            if let Ok(stream) = acceptor.accept(socket).await {
                                stats.handshakes.fetch_add(1, Ordering::SeqCst);
                                respond(stream, reply, stats).await;
                            }
                        });
                    }
                }
            }
        });

        Self {
            port,
            stats,
            handle,
        }
    }

    pub fn config(&self) -> SenderConfig {
        config_for(self.port)
    }
}

impl Drop for FakeTrapper {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn config_for(port: u16) -> SenderConfig {
    let mut config = SenderConfig::default();
    config.set_server_active("127.0.0.1").unwrap();
    config.set_server_port(port).unwrap();
    config.set_timeout(2).unwrap();
    config.set_log_type(LogType::Console);
    config.set_log_file(None);
    config
}

/// In-memory provider: every acquire opens a fresh duplex pipe answered by
/// a spawned trapper task.
pub struct DuplexProvider {
    reply: Reply,
    stream: Option<DuplexStream>,
    pub stats: TrapperStats,
    pub releases: usize,
}

impl DuplexProvider {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            stream: None,
            stats: TrapperStats::default(),
            releases: 0,
        }
    }
}

impl ConnectionProvider for DuplexProvider {
    type Stream = DuplexStream;

    async fn acquire(&mut self, _config: &SenderConfig) -> Result<&mut DuplexStream, SenderError> {
        let reply = &self.reply;
        let stats = &self.stats;
        Ok(self.stream.get_or_insert_with(|| {
            let (client, server) = tokio::io::duplex(1 << 20);
            tokio::spawn(respond(server, reply.clone(), stats.clone()));
            client
        }))
    }

    async fn release(&mut self) {
        self.releases += 1;
        self.stream = None;
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

/// Provider that fails the test if anything tries to connect.
#[derive(Default)]
pub struct NoNetworkProvider {
    pub releases: usize,
}

impl ConnectionProvider for NoNetworkProvider {
    type Stream = DuplexStream;

    async fn acquire(&mut self, _config: &SenderConfig) -> Result<&mut DuplexStream, SenderError> {
        panic!("dry run must not open a connection");
    }

    async fn release(&mut self) {
        self.releases += 1;
    }

    fn is_connected(&self) -> bool {
        false
    }
}

pub fn items(count: usize) -> Vec<Item> {
    (0..count)
        .map(|i| Item::new("h1", format!("key{i}"), serde_json::json!(i), 1_700_000_000))
        .collect()
}
