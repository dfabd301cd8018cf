//! # Scanner Error Types
//!
//! Errors raised by the session plumbing and configuration loading.
//!
//! Scan *outcomes* are never reported through this type: a failed scan is a
//! [`ScanError`](dock_core::ScanError) delivered on the scan's own reply.
//! `ScannerError` covers the cases where the session itself could not be
//! reached or configured.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Scanner Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────────────┐        ┌─────────────────────────┐      │
//! │  │  Configuration          │        │    Session              │      │
//! │  │                         │        │                         │      │
//! │  │  InvalidConfig          │        │  ChannelError           │      │
//! │  │  ConfigLoadFailed       │        │  ShuttingDown           │      │
//! │  │  Validation (patterns)  │        │                         │      │
//! │  └─────────────────────────┘        └─────────────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use dock_core::ValidationError;
use thiserror::Error;

/// Result type alias for scanner operations.
pub type ScannerResult<T> = Result<T, ScannerError>;

#[derive(Debug, Error)]
pub enum ScannerError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid scanner configuration.
    #[error("Invalid scanner configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// A configured code pattern was rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // =========================================================================
    // Session Errors
    // =========================================================================
    /// The session task is gone.
    #[error("Scan session is shutting down")]
    ShuttingDown,

    /// Channel send/receive failed.
    #[error("Channel error: {0}")]
    ChannelError(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<std::io::Error> for ScannerError {
    fn from(err: std::io::Error) -> Self {
        ScannerError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ScannerError {
    fn from(err: toml::de::Error) -> Self {
        ScannerError::ConfigLoadFailed(err.to_string())
    }
}

impl ScannerError {
    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ScannerError::InvalidConfig(_)
                | ScannerError::ConfigLoadFailed(_)
                | ScannerError::Validation(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_categorized() {
        assert!(ScannerError::InvalidConfig("x".into()).is_config_error());
        assert!(!ScannerError::ShuttingDown.is_config_error());
    }

    #[test]
    fn test_toml_error_is_load_failure() {
        let err: ScannerError = toml::from_str::<toml::Value>("= nope").unwrap_err().into();
        assert!(matches!(err, ScannerError::ConfigLoadFailed(_)));
    }
}
