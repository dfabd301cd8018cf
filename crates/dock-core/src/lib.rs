//! # dock-core: Pure Scan Logic for Dock Scan
//!
//! Everything a warehouse scanner needs to *decide*, with nothing it needs
//! to *do*. Cameras, timers and stores live in `dock-scan` and the apps.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Dock Scan Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    scan-terminal / UI surface                   │   │
//! │  │      Scan button ──► result card ──► pallet form               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ ScannerHook                            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 dock-scan (session + devices)                   │   │
//! │  │      ScanSession actor, CameraDevice, feedback, config         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ dock-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │ classify  │  │  format   │  │ validation│  │   │
//! │  │   │ ScanResult│  │ ScanError │  │  detect   │  │ FormatRules│ │   │
//! │  │   │ScanRequest│  │ kinds     │  │  suggest  │  │ entity    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                       ┌───────────┐                             │   │
//! │  │                       │ warehouse │ deliveries, pallets         │   │
//! │  │                       └───────────┘                             │   │
//! │  │   NO I/O • NO CAMERA • NO TIMERS • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Scan vocabulary (ScanRequest, ScanResult, ScannerState)
//! - [`classify`] - Native failure → [`ScanError`] classification
//! - [`format`] - Symbology detection and suggestions
//! - [`validation`] - Warehouse code recognition and input validation
//! - [`warehouse`] - Delivery and pallet receiving rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use dock_core::{classify, NativeError, ScanErrorKind};
//! use dock_core::validation::{validate_scanned_data, EntityType, FormatRules};
//!
//! let rules = FormatRules::default();
//! assert_eq!(validate_scanned_data("LOC-A12", &rules), Ok(EntityType::Location));
//!
//! let err = classify(NativeError::new("NotAllowedError", "Permission denied"));
//! assert_eq!(err.kind, ScanErrorKind::PermissionDenied);
//! assert!(!err.is_recoverable());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod classify;
pub mod error;
pub mod format;
pub mod types;
pub mod validation;
pub mod warehouse;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use classify::{classify, is_recoverable, NativeError, ScanError, ScanErrorKind};
pub use error::{CoreError, CoreResult, ValidationError};
pub use types::*;
pub use validation::{EntityType, FormatRejection, FormatRules};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// How long a scan waits for a decodable code before giving up.
pub const DEFAULT_SCAN_TIMEOUT_MS: u64 = 15_000;

/// Upper bound on decoded frames accepted per second.
///
/// Frames arriving faster than this are dropped before validation.
pub const MAX_SCANS_PER_SECOND: u32 = 5;

/// Vibration pulse on a successful scan.
pub const HAPTIC_PULSE_MS: u64 = 30;

/// Success beep pitch.
pub const SUCCESS_TONE_HZ: u32 = 800;

/// Success beep length.
pub const SUCCESS_TONE_MS: u64 = 100;
