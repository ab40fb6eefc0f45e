// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
#![allow(
    clippy::cast_possible_truncation, // Payload lengths are bounded by MAX_PAYLOAD_SIZE
    clippy::cast_possible_wrap,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,  // e.g. SenderConfig in config module
    clippy::must_use_candidate,
    clippy::doc_markdown
)]

//! Client for the Zabbix sender (trapper) protocol.

pub mod app;
pub mod buffer;
pub mod domain;
pub mod sender;

pub use app::{DataContainer, Probe, ProbeExit, ProbeMode, ProbeRunner, SenderConfig};
pub use domain::{DataType, HostMetrics, Item, ResponseRecord, SendSummary, SenderError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
