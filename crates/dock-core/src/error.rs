//! # Error Types
//!
//! Domain-specific error types for dock-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  dock-core errors (this file)                                          │
//! │  ├── CoreError        - Warehouse rule violations                      │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  dock-core scan taxonomy (classify.rs)                                 │
//! │  └── ScanError        - The closed set of scan failure kinds           │
//! │                                                                         │
//! │  dock-scan errors (separate crate)                                     │
//! │  └── ScannerError     - Config loading / session plumbing              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → caller (UI / terminal)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Warehouse rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// License plate is already attached to another pallet.
    ///
    /// ## When This Occurs
    /// - Adding a pallet whose LP was scanned into an earlier delivery
    /// - Editing a pallet and typing an LP owned by a different pallet
    ///
    /// `delivery` is the PRO number of the owning delivery when known,
    /// otherwise its id.
    #[error("License Plate {license_plate} already exists in delivery {delivery}")]
    DuplicateLicensePlate {
        license_plate: String,
        delivery: String,
    },

    /// Delivery cannot be found (or is not owned by the caller).
    #[error("Delivery not found: {0}")]
    DeliveryNotFound(String),

    /// Pallet cannot be found.
    #[error("Pallet not found: {0}")]
    PalletNotFound(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., bad license plate or location).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A configured pattern failed to compile.
    #[error("{field} pattern is invalid: {reason}")]
    InvalidPattern { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_license_plate_message() {
        let err = CoreError::DuplicateLicensePlate {
            license_plate: "ABC123".to_string(),
            delivery: "PRO-55".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "License Plate ABC123 already exists in delivery PRO-55"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "license_plate".to_string(),
        };
        assert_eq!(err.to_string(), "license_plate is required");

        let err = ValidationError::MustBePositive {
            field: "piece_count".to_string(),
        };
        assert_eq!(err.to_string(), "piece_count must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "license_plate".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
