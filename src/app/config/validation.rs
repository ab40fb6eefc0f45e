use super::settings::validate_tls;
use super::{LogType, SenderConfig};
use crate::domain::ValidationError;

impl SenderConfig {
    /// Checks every field against its allowed range.
    ///
    /// Setters already enforce these rules; this covers values that arrive
    /// through deserialization.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.server_active().trim().is_empty() {
            return Err(ValidationError::EmptyServer);
        }

        if !(1024..=32767).contains(&self.server_port()) {
            return Err(ValidationError::ServerPort(self.server_port()));
        }

        let timeout = self.timeout().as_secs();
        if !(1..=30).contains(&timeout) {
            return Err(ValidationError::Timeout(timeout));
        }

        if self.debug_level() > 5 {
            return Err(ValidationError::DebugLevel(self.debug_level()));
        }

        if self.hostname().trim().is_empty() {
            return Err(ValidationError::EmptyHostname);
        }

        // A file logger with no file is a configuration mistake, not a fallback
        if self.log_type() == LogType::File && self.log_file().is_none() {
            return Err(ValidationError::LogType("file without LogFile".to_string()));
        }

        validate_tls(self.tls())
    }
}
