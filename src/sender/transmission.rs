use super::connection::{ConnectionError, ConnectionProvider};
use super::frame::{FrameError, SENDER_REQUEST, encode_request, read_frame, write_frame};
use super::response::parse_response;
use crate::app::config::SenderConfig;
use crate::domain::{Item, ResponseRecord, SendSummary, SenderError};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Maximum number of items the trapper accepts in one request.
pub const ZBX_TRAPPER_MAX_VALUE: usize = 250;

/// Items per request for a given debug level. Levels 4 and 5 send items one
/// at a time so each server answer maps to a single item.
pub fn partition_size(debug_level: u8) -> usize {
    if debug_level >= 4 { 1 } else { ZBX_TRAPPER_MAX_VALUE }
}

/// Splits a batch into requests and aggregates the server answers.
///
/// Runs are strictly sequential. The first failing run aborts the cycle and
/// its error is returned; counters of earlier runs are dropped with it.
pub struct BatchTransmitter<'a> {
    config: &'a SenderConfig,
}

impl<'a> BatchTransmitter<'a> {
    pub fn new(config: &'a SenderConfig) -> Self {
        Self { config }
    }

    pub async fn transmit<P>(&self, provider: &mut P, items: &[Item]) -> Result<SendSummary, SenderError>
    where
        P: ConnectionProvider,
    {
        let debug_level = self.config.debug_level();
        let max_value = partition_size(debug_level);

        info!("Starting to send {} items", items.len());
        if max_value == 1 {
            debug!("Bulk limit is {} items", max_value);
        } else {
            info!("Bulk limit is {} items", max_value);
        }

        let mut summary = SendSummary::default();
        for (index, chunk) in items.chunks(max_value).enumerate() {
            let run = index + 1;
            let start_offset = index * max_value;
            debug!(
                "run {}: start_offset is {}, stop_offset is {}",
                run,
                start_offset,
                start_offset + chunk.len()
            );

            let record = if self.config.dryrun() {
                ResponseRecord::dry_run(chunk.len())
            } else {
                let record = self.exchange(provider, chunk).await?;
                // The trapper closes its side after answering
                provider.release().await;
                record
            };

            let (output_key, output_item) = if debug_level >= 4 {
                (chunk[0].key.clone(), chunk[0].value_display())
            } else {
                ("(bulk)".to_string(), "(bulk)".to_string())
            };
            info!(
                "Send result [{}-{}-{}] for key [{}] item [{}]. Server's response is {}",
                record.processed,
                record.failed,
                record.total,
                output_key,
                output_item,
                record.response
            );
            info!("{} items sent during run {}", record.total, run);
            debug!(
                "run {}: processed is {}, failed is {}, total is {}",
                run, record.processed, record.failed, record.total
            );

            summary.record(record);
        }

        info!(
            "All {} items have been sent in {} runs",
            summary.total,
            summary.run_count()
        );
        debug!(
            "Total run is {}; item processed: {}, failed: {}, total: {}, during {} seconds",
            summary.run_count(),
            summary.processed,
            summary.failed,
            summary.total,
            summary.seconds_spent
        );

        Ok(summary)
    }

    /// One request/response round trip.
    async fn exchange<P>(&self, provider: &mut P, chunk: &[Item]) -> Result<ResponseRecord, SenderError>
    where
        P: ConnectionProvider,
    {
        let timeout = self.config.timeout();
        let frame = encode_request(chunk, SENDER_REQUEST, chrono::Utc::now().timestamp())?;

        let stream = provider.acquire(self.config).await?;
        with_timeout(timeout, "send", write_frame(stream, &frame)).await?;
        let body = with_timeout(timeout, "receive", read_frame(stream)).await?;

        Ok(parse_response(&body)?)
    }
}

async fn with_timeout<T, F>(timeout: Duration, operation: &'static str, fut: F) -> Result<T, SenderError>
where
    F: Future<Output = Result<T, FrameError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        // I/O failures surface as connection errors, not framing errors
        Ok(Err(FrameError::Connection(e))) => Err(SenderError::Connection(e)),
        Ok(Err(e)) => Err(SenderError::Frame(e)),
        Err(_) => Err(ConnectionError::Timeout { operation, timeout }.into()),
    }
}
