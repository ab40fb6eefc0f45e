pub mod config;
pub mod container;
pub mod logging_system;
pub mod probe;

pub use config::{ConfigError, LogType, SenderConfig, TlsConfig, TlsConnect};
pub use container::DataContainer;
pub use logging_system::{LoggingError, level_filter_for, setup_logging};
pub use probe::{Probe, ProbeExit, ProbeMode, ProbeRunner};
