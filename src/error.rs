//! Error taxonomy shared by period resolution, evaluation and the manager

use crate::storage::StorageError;

/// Errors raised while loading or evaluating an alert definition
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    /// Structurally invalid or mutually incompatible configuration
    #[error("Config error on {field}: {message}")]
    Config { field: &'static str, message: String },

    /// A string that does not map to a known enumerated value
    #[error("'{value}' is not a valid {kind}, expected one of: {expected}")]
    Enum {
        kind: &'static str,
        value: String,
        expected: &'static str,
    },

    /// The resolved period yielded no aggregable readings
    #[error("No data found: {0}")]
    NoDataFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl AlertError {
    pub fn config(field: &'static str, message: impl Into<String>) -> Self {
        AlertError::Config {
            field,
            message: message.into(),
        }
    }

    pub fn enumeration(kind: &'static str, value: impl Into<String>, expected: &'static str) -> Self {
        AlertError::Enum {
            kind,
            value: value.into(),
            expected,
        }
    }

    /// Short label used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            AlertError::Config { .. } => "config",
            AlertError::Enum { .. } => "enum",
            AlertError::NoDataFound(_) => "no_data",
            AlertError::Storage(_) => "storage",
        }
    }

    /// Fatal errors abort the whole run; everything else only stops the
    /// offending meter or definition.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AlertError::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = AlertError::config("data_period_quantity", "must be positive");
        assert_eq!(err.kind(), "config");
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("data_period_quantity"));

        let err = AlertError::enumeration("operator", "MEDIAN", "MAX, MIN, AVERAGE");
        assert_eq!(err.kind(), "enum");
        assert_eq!(
            err.to_string(),
            "'MEDIAN' is not a valid operator, expected one of: MAX, MIN, AVERAGE"
        );

        let err: AlertError = StorageError::Backend("connection reset".to_string()).into();
        assert!(err.is_fatal());
    }
}
