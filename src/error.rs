//! Error types for Sovnlog

use thiserror::Error;

/// Errors that can occur while loading or computing over a diary
#[derive(Debug, Error)]
pub enum DiaryError {
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Invalid window history: {0}")]
    InvalidHistory(String),
}
