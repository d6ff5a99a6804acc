//! Error types for the optimizer core

use thiserror::Error;

/// Columns every uploaded usage report must carry
pub const REQUIRED_COLUMNS: [&str; 3] = ["Service", "Region", "Cost"];

#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("unknown service category: {0}")]
    UnknownServiceCategory(String),

    #[error("CSV must have columns: {} (missing: {})", REQUIRED_COLUMNS.join(", "), .0.join(", "))]
    MissingRequiredColumns(Vec<String>),

    #[error("empty or malformed upload: {0}")]
    EmptyOrMalformedUpload(String),

    #[error("No file uploaded")]
    NoFileUploaded,

    #[error("invalid observation: {0}")]
    InvalidObservation(String),

    #[error("model checksum mismatch: manifest says {expected}, artifact is {actual}")]
    ModelChecksumMismatch { expected: String, actual: String },

    #[error("model manifest mismatch: {0}")]
    ManifestMismatch(String),

    #[error("classification failed: {0}")]
    Classification(#[from] anyhow::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OptimizerError {
    /// Whether the error was caused by the caller's input rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            OptimizerError::UnknownServiceCategory(_)
                | OptimizerError::MissingRequiredColumns(_)
                | OptimizerError::EmptyOrMalformedUpload(_)
                | OptimizerError::NoFileUploaded
                | OptimizerError::InvalidObservation(_)
                | OptimizerError::Csv(_)
        )
    }

    /// Stable snake_case identifier for API responses and logs
    pub fn kind(&self) -> &'static str {
        match self {
            OptimizerError::UnknownServiceCategory(_) => "unknown_service_category",
            OptimizerError::MissingRequiredColumns(_) => "missing_required_columns",
            OptimizerError::EmptyOrMalformedUpload(_) => "empty_or_malformed_upload",
            OptimizerError::NoFileUploaded => "no_file_uploaded",
            OptimizerError::InvalidObservation(_) => "invalid_observation",
            OptimizerError::ModelChecksumMismatch { .. } => "model_checksum_mismatch",
            OptimizerError::ManifestMismatch(_) => "manifest_mismatch",
            OptimizerError::Classification(_) => "classification_failed",
            OptimizerError::Csv(_) => "csv_error",
            OptimizerError::Io(_) => "io_error",
            OptimizerError::Json(_) => "json_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, OptimizerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message_names_each_column() {
        let err = OptimizerError::MissingRequiredColumns(vec!["Region".into(), "Cost".into()]);
        let msg = err.to_string();
        assert!(msg.contains("Service, Region, Cost"));
        assert!(msg.ends_with("(missing: Region, Cost)"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_model_errors_are_server_side() {
        let err = OptimizerError::ModelChecksumMismatch {
            expected: "aa".into(),
            actual: "bb".into(),
        };
        assert!(!err.is_client_error());
        assert_eq!(err.kind(), "model_checksum_mismatch");

        let err: OptimizerError = anyhow::anyhow!("tensor shape").into();
        assert!(!err.is_client_error());
        assert!(err.to_string().contains("tensor shape"));
    }
}
