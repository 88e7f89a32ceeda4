use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Hand not found: {hand_id}")]
    DataNotFound { hand_id: String },

    #[error("Invalid hand record: {}", .fields.join("; "))]
    Validation { fields: Vec<String> },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Session analysis failed: {0}")]
    Aggregate(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Invalid command line arguments: {0}")]
    InvalidArguments(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Coarse error category carried on failed results so callers can map
/// them (e.g. to HTTP statuses) without parsing the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    DataNotFound,
    Validation,
    Provider,
    Aggregate,
    Internal,
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::Configuration(_) | AnalysisError::InvalidArguments(_) => {
                ErrorKind::Configuration
            }
            AnalysisError::DataNotFound { .. } => ErrorKind::DataNotFound,
            AnalysisError::Validation { .. } => ErrorKind::Validation,
            AnalysisError::Provider(_) => ErrorKind::Provider,
            AnalysisError::Aggregate(_) => ErrorKind::Aggregate,
            AnalysisError::Internal(_)
            | AnalysisError::IoError(_)
            | AnalysisError::SerializationError(_) => ErrorKind::Internal,
        }
    }

    pub fn not_found(hand_id: impl Into<String>) -> Self {
        AnalysisError::DataNotFound {
            hand_id: hand_id.into(),
        }
    }
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::DataNotFound => "data_not_found",
            ErrorKind::Validation => "validation",
            ErrorKind::Provider => "provider",
            ErrorKind::Aggregate => "aggregate",
            ErrorKind::Internal => "internal",
        }
    }
}
