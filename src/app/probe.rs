use super::config::SenderConfig;
use super::container::DataContainer;
use super::logging_system::{LoggingError, setup_logging};
use crate::domain::{DataType, HostMetrics};
use crate::sender::{ConnectionProvider, TcpConnector};
use std::future::Future;
use tracing::{debug, error, info};

/// Which data a probe run collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbeMode {
    #[default]
    UpdateItems,
    Discovery,
}

impl ProbeMode {
    pub fn data_type(self) -> DataType {
        match self {
            ProbeMode::UpdateItems => DataType::Items,
            ProbeMode::Discovery => DataType::Lld,
        }
    }
}

/// Process exit status of a probe run, one per failing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ProbeExit {
    Success = 0,
    InitFailed = 1,
    CollectFailed = 2,
    FormatFailed = 3,
    SendFailed = 4,
}

impl ProbeExit {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// A monitoring probe: collects values for Zabbix items or discovery rules.
pub trait Probe: Send {
    /// Reads probe configuration and opens whatever the probe needs.
    fn init_probe(&mut self) -> impl Future<Output = anyhow::Result<()>> + Send {
        async { Ok(()) }
    }

    fn get_metrics(
        &mut self,
        hostname: &str,
    ) -> impl Future<Output = anyhow::Result<HostMetrics>> + Send;

    fn get_discovery(
        &mut self,
        hostname: &str,
    ) -> impl Future<Output = anyhow::Result<HostMetrics>> + Send;
}

/// Drives one collect-and-send cycle of a [`Probe`].
pub struct ProbeRunner<T: Probe, P: ConnectionProvider = TcpConnector> {
    probe: T,
    container: DataContainer<P>,
    logging: Option<LoggingError>,
}

impl<T: Probe> ProbeRunner<T, TcpConnector> {
    pub fn new(probe: T, config: SenderConfig) -> Self {
        Self::with_container(probe, DataContainer::new(config))
    }
}

impl<T: Probe, P: ConnectionProvider> ProbeRunner<T, P> {
    /// Debug levels above 4 are lowered to 4. Logging is installed here,
    /// once per runner.
    pub fn with_container(probe: T, mut container: DataContainer<P>) -> Self {
        container.config_mut().cap_debug_level(4);
        let logging = setup_logging(container.config()).err();
        if let Some(e) = &logging {
            debug!("Logging not installed: {}", e);
        }
        Self {
            probe,
            container,
            logging,
        }
    }

    /// Why the runner's own subscriber was not installed, if it was not.
    pub fn logging_error(&self) -> Option<&LoggingError> {
        self.logging.as_ref()
    }

    pub fn container(&self) -> &DataContainer<P> {
        &self.container
    }

    pub fn probe(&self) -> &T {
        &self.probe
    }

    pub async fn run(&mut self, mode: ProbeMode) -> ProbeExit {
        // Step 1
        if let Err(e) = self.probe.init_probe().await {
            error!("Step 1 - Read probe configuration failed [{:#}]", e);
            return ProbeExit::InitFailed;
        }

        // Step 2
        let hostname = self.container.config().hostname().to_string();
        self.container.set_data_type(mode.data_type());
        let collected = match mode {
            ProbeMode::UpdateItems => self.probe.get_metrics(&hostname).await,
            ProbeMode::Discovery => self.probe.get_discovery(&hostname).await,
        };
        let data = match collected {
            Ok(data) => data,
            Err(e) => {
                error!("Step 2 - Get Data failed [{:#}]", e);
                self.container.reset();
                return ProbeExit::CollectFailed;
            }
        };

        // Step 3
        if let Err(e) = self.container.add_bulk(&data) {
            error!("Step 3 - Format & add Data failed [{}]", e);
            self.container.reset();
            return ProbeExit::FormatFailed;
        }

        if self.container.is_empty() {
            info!("Nothing to send");
            self.container.reset();
            return ProbeExit::Success;
        }

        // Step 4
        match self.container.send().await {
            Ok(summary) => {
                debug!(
                    "Probe sent {} items: {} processed, {} failed",
                    summary.total, summary.processed, summary.failed
                );
                ProbeExit::Success
            }
            Err(e) => {
                error!("Step 4 - Sent to Zabbix Server failed [{}]", e);
                ProbeExit::SendFailed
            }
        }
    }
}
