use super::patterns::RESPONSE_PATTERNS;
use crate::domain::{ResponseRecord, ResponseStatus};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ResponseError {
    #[error("Response is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("Response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown response status '{0}'")]
    UnknownStatus(String),
    #[error("Response has no info field")]
    MissingInfo,
    #[error("No counters recognized in info '{info}'")]
    Unrecognized { info: String },
    #[error("Invalid {field} counter '{value}'")]
    InvalidCounter { field: &'static str, value: String },
    #[error("Response pattern '{name}' failed to compile: {source}")]
    PatternCompilation {
        name: &'static str,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    response: String,
    info: Option<String>,
}

/// Parses a trapper response payload into its counters.
///
/// The `info` text is matched against every known server phrasing; when none
/// matches, [`ResponseError::Unrecognized`] is returned rather than zeros.
pub fn parse_response(body: &[u8]) -> Result<ResponseRecord, ResponseError> {
    let text = std::str::from_utf8(body)?;
    let raw: RawResponse = serde_json::from_str(text)?;

    let response = match raw.response.as_str() {
        "success" => ResponseStatus::Success,
        "failed" => ResponseStatus::Failed,
        other => return Err(ResponseError::UnknownStatus(other.to_string())),
    };
    let info = raw.info.ok_or(ResponseError::MissingInfo)?;

    let (name, caps) = RESPONSE_PATTERNS
        .first_match(&info)
        .map_err(|(name, source)| ResponseError::PatternCompilation { name, source })?
        .ok_or_else(|| ResponseError::Unrecognized { info: info.clone() })?;
    debug!("Response info matched pattern {}", name);

    Ok(ResponseRecord {
        response,
        processed: counter(&caps[1], "processed")?,
        failed: counter(&caps[2], "failed")?,
        total: counter(&caps[3], "total")?,
        seconds_spent: caps[4]
            .parse()
            .map_err(|_| ResponseError::InvalidCounter {
                field: "seconds spent",
                value: caps[4].to_string(),
            })?,
    })
}

fn counter(value: &str, field: &'static str) -> Result<u64, ResponseError> {
    value.parse().map_err(|_| ResponseError::InvalidCounter {
        field,
        value: value.to_string(),
    })
}
