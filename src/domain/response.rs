use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome tag of a single request/response exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Failed,
    /// Synthetic record, nothing was sent.
    DryRun,
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResponseStatus::Success => "success",
            ResponseStatus::Failed => "failed",
            ResponseStatus::DryRun => "dryrun",
        })
    }
}

/// Counters extracted from one trapper acknowledgement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub response: ResponseStatus,
    pub processed: u64,
    pub failed: u64,
    pub total: u64,
    pub seconds_spent: f64,
}

impl ResponseRecord {
    /// Record produced for a partition under dry-run.
    ///
    /// `processed` and `failed` are 0; only `total` carries information.
    pub fn dry_run(total: usize) -> Self {
        Self {
            response: ResponseStatus::DryRun,
            processed: 0,
            failed: 0,
            total: total as u64,
            seconds_spent: 0.0,
        }
    }
}

/// Aggregated result of a complete send cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SendSummary {
    /// Runs the server acknowledged with `success`.
    pub server_success: usize,
    /// Runs the server acknowledged with `failed`.
    pub server_failure: usize,
    pub processed: u64,
    pub failed: u64,
    pub total: u64,
    pub seconds_spent: f64,
    /// One record per request/response round trip, in batch order.
    pub runs: Vec<ResponseRecord>,
}

impl SendSummary {
    pub fn record(&mut self, run: ResponseRecord) {
        match run.response {
            ResponseStatus::Success => self.server_success += 1,
            ResponseStatus::Failed => self.server_failure += 1,
            ResponseStatus::DryRun => {}
        }
        self.processed += run.processed;
        self.failed += run.failed;
        self.total += run.total;
        self.seconds_spent += run.seconds_spent;
        self.runs.push(run);
    }

    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    pub fn is_dry_run(&self) -> bool {
        !self.runs.is_empty()
            && self
                .runs
                .iter()
                .all(|run| run.response == ResponseStatus::DryRun)
    }
}
