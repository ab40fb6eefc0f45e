use super::config::SenderConfig;
use crate::buffer::{BatchError, ItemBatch};
use crate::domain::{DataType, HostMetrics, Item, SendSummary, SenderError, ValidationError};
use crate::sender::{BatchTransmitter, ConnectionProvider, TcpConnector};
use serde_json::Value;
use tracing::{info, warn};

/// Collects items and ships them to a Zabbix server or proxy.
///
/// One container is one logical sender: it is used sequentially
/// (set data type, append, send, repeat) and shares nothing with other
/// containers.
pub struct DataContainer<P: ConnectionProvider = TcpConnector> {
    config: SenderConfig,
    batch: ItemBatch,
    provider: P,
}

impl DataContainer<TcpConnector> {
    pub fn new(config: SenderConfig) -> Self {
        Self::with_provider(config, TcpConnector::new())
    }
}

impl Default for DataContainer<TcpConnector> {
    fn default() -> Self {
        Self::new(SenderConfig::default())
    }
}

impl<P: ConnectionProvider> DataContainer<P> {
    pub fn with_provider(config: SenderConfig, provider: P) -> Self {
        Self {
            config,
            batch: ItemBatch::new(),
            provider,
        }
    }

    pub fn config(&self) -> &SenderConfig {
        &self.config
    }

    /// Mutable access for the validated setters of [`SenderConfig`].
    pub fn config_mut(&mut self) -> &mut SenderConfig {
        &mut self.config
    }

    pub fn data_type(&self) -> Option<DataType> {
        self.batch.data_type()
    }

    pub fn set_data_type(&mut self, data_type: DataType) {
        self.batch.set_data_type(data_type);
    }

    /// Appends one item stamped with the current time.
    pub fn append(
        &mut self,
        host: impl Into<String>,
        key: impl Into<String>,
        value: Value,
    ) -> Result<(), BatchError> {
        self.batch
            .append(host, key, value, chrono::Utc::now().timestamp())
    }

    pub fn append_at(
        &mut self,
        host: impl Into<String>,
        key: impl Into<String>,
        value: Value,
        clock: i64,
    ) -> Result<(), BatchError> {
        self.batch.append(host, key, value, clock)
    }

    /// Appends a host → key → value structure, skipping `[]` values.
    pub fn add_bulk(&mut self, data: &HostMetrics) -> Result<usize, BatchError> {
        self.batch.add_bulk(data, chrono::Utc::now().timestamp())
    }

    pub fn items(&self) -> &[Item] {
        self.batch.items()
    }

    pub fn len(&self) -> usize {
        self.batch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    /// Drops pending items and the data type.
    pub fn reset(&mut self) {
        info!("Reset DataContainer");
        self.batch.reset();
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Sends every pending item.
    ///
    /// Whatever the outcome, the batch is emptied, the data type forgotten
    /// and the connection released before returning. Nothing is retried.
    pub async fn send(&mut self) -> Result<SendSummary, SenderError> {
        if self.batch.data_type().is_none() {
            return Err(ValidationError::DataTypeNotConfigured.into());
        }
        if self.batch.is_empty() {
            return Err(SenderError::NothingToSend);
        }

        let result = BatchTransmitter::new(&self.config)
            .transmit(&mut self.provider, self.batch.items())
            .await;

        self.provider.release().await;
        self.reset();

        if let Err(e) = &result {
            warn!("Send failed: {}", e);
        }
        result
    }
}
