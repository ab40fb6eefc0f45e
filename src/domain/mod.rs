//! Domain layer for zabbix-sender.
//!
//! Contains the canonical types shared across all modules:
//! - `Item` / `DataType`: one measurement and the encoding it is sent with
//! - `ResponseRecord` / `SendSummary`: what the trapper answered
//! - `SenderError` / `ValidationError`: top-level error types

pub mod error;
pub mod item;
pub mod response;

pub use error::{SenderError, ValidationError};
pub use item::{DataType, HostMetrics, Item};
pub use response::{ResponseRecord, ResponseStatus, SendSummary};
