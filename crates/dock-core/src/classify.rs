//! # Scan Error Classification
//!
//! Turns whatever the camera stack throws into one of seven error kinds,
//! each with a fixed user-facing message and ordered recovery hints.
//!
//! ## Classification Rules (first match wins)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  NativeError { name, message }                                          │
//! │       │                                                                 │
//! │       ├── NotAllowedError   | "permission"          → PERMISSION_DENIED │
//! │       ├── NotFoundError     | "camera"              → CAMERA_ERROR      │
//! │       ├── NotReadableError  | AbortError            → CAMERA_ERROR      │
//! │       ├── "network"         | "load"                → NETWORK_ERROR     │
//! │       ├── "Content Security Policy" | "worker"      → NETWORK_ERROR     │
//! │       ├── "https"           | "secure"              → PERMISSION_DENIED │
//! │       └── anything else                             → CAMERA_ERROR      │
//! │                                                     (raw message kept)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Matching is case-sensitive on both name and message. An empty message is
//! read as "Unknown error" before any rule runs.
//!
//! ## Recoverability
//! TIMEOUT, CANCELLED, CAMERA_ERROR and NETWORK_ERROR are worth a retry.
//! PERMISSION_DENIED, INVALID_FORMAT and UNSUPPORTED_DEVICE need the user
//! or the environment to change first; route those to manual entry.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Error Kind
// =============================================================================

/// The closed set of scan failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanErrorKind {
    PermissionDenied,
    CameraError,
    Timeout,
    Cancelled,
    InvalidFormat,
    UnsupportedDevice,
    NetworkError,
}

impl ScanErrorKind {
    /// Wire name, e.g. `PERMISSION_DENIED`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanErrorKind::PermissionDenied => "PERMISSION_DENIED",
            ScanErrorKind::CameraError => "CAMERA_ERROR",
            ScanErrorKind::Timeout => "TIMEOUT",
            ScanErrorKind::Cancelled => "CANCELLED",
            ScanErrorKind::InvalidFormat => "INVALID_FORMAT",
            ScanErrorKind::UnsupportedDevice => "UNSUPPORTED_DEVICE",
            ScanErrorKind::NetworkError => "NETWORK_ERROR",
        }
    }

    /// Text shown to the person holding the scanner.
    pub fn user_message(&self) -> &'static str {
        match self {
            ScanErrorKind::PermissionDenied => {
                "Camera access is required for barcode scanning. Note: Camera access requires \
                 HTTPS in production. For local development, you can use localhost or enable \
                 camera permissions manually."
            }
            ScanErrorKind::CameraError => {
                "Unable to access camera. Please check if camera is available and not being \
                 used by another app."
            }
            ScanErrorKind::Timeout => {
                "Scan timed out. Please try again or enter the code manually."
            }
            ScanErrorKind::Cancelled => {
                "Scan was cancelled. You can try again or enter the code manually."
            }
            ScanErrorKind::InvalidFormat => {
                "The scanned code format is not supported. Please try a different barcode or \
                 QR code."
            }
            ScanErrorKind::UnsupportedDevice => {
                "Barcode scanning is not supported on this device. Please enter codes manually."
            }
            ScanErrorKind::NetworkError => {
                "Unable to load scanner due to security policy or network issues. For local \
                 development, this may be due to Content Security Policy restrictions."
            }
        }
    }

    /// Suggested next steps, most useful first.
    pub fn recovery_actions(&self) -> &'static [&'static str] {
        match self {
            ScanErrorKind::PermissionDenied => &[
                "Enable camera permissions in browser settings",
                "Reload the page and allow camera access",
                "Check device camera permissions",
            ],
            ScanErrorKind::CameraError => &[
                "Close other apps using the camera",
                "Check camera hardware connection",
                "Try refreshing the page",
                "Use manual entry as alternative",
            ],
            ScanErrorKind::Timeout => &[
                "Ensure good lighting conditions",
                "Hold barcode steady and in focus",
                "Try moving closer or further from code",
                "Use manual entry if scanning continues to fail",
            ],
            ScanErrorKind::Cancelled => &[
                "Tap the scan button to try again",
                "Use manual entry if needed",
            ],
            ScanErrorKind::InvalidFormat => &[
                "Try scanning a QR code or standard barcode",
                "Check if the code is damaged or unclear",
                "Use manual entry for unsupported formats",
            ],
            ScanErrorKind::UnsupportedDevice => &[
                "Use manual entry on this device",
                "Try using a different device with camera support",
            ],
            ScanErrorKind::NetworkError => &[
                "Check internet connection",
                "Try refreshing the page",
                "Use manual entry if offline",
            ],
        }
    }

    /// True when retrying without outside intervention can succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ScanErrorKind::Timeout
                | ScanErrorKind::Cancelled
                | ScanErrorKind::CameraError
                | ScanErrorKind::NetworkError
        )
    }
}

impl fmt::Display for ScanErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Native Error
// =============================================================================

/// A low-level failure reported by a camera or decoder backend.
///
/// `name` follows the DOM exception naming the classifier keys on
/// (`NotAllowedError`, `NotFoundError`, ...). Backends that have no such
/// name leave it empty and rely on the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, Error)]
#[ts(export)]
#[error("{name}: {message}")]
pub struct NativeError {
    pub name: String,
    pub message: String,
}

impl NativeError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        NativeError {
            name: name.into(),
            message: message.into(),
        }
    }

    /// A nameless error carrying only a message.
    pub fn message(message: impl Into<String>) -> Self {
        NativeError::new("", message)
    }
}

// =============================================================================
// Scan Error
// =============================================================================

/// A classified scan failure.
///
/// Cloneable so one outcome can be handed to every caller waiting on the
/// same in-flight scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, Error)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
#[error("{kind}: {message}")]
pub struct ScanError {
    /// Which of the seven kinds this is.
    pub kind: ScanErrorKind,

    /// Technical description for logs.
    pub message: String,

    /// Text for the operator.
    pub user_message: String,

    /// Ordered recovery suggestions.
    pub recovery_actions: Vec<String>,

    /// The backend failure this was classified from, if any.
    pub native: Option<NativeError>,
}

impl ScanError {
    /// Creates an error of `kind` with the kind's fixed user message and
    /// recovery actions.
    pub fn new(kind: ScanErrorKind, message: impl Into<String>) -> Self {
        ScanError {
            kind,
            message: message.into(),
            user_message: kind.user_message().to_string(),
            recovery_actions: kind
                .recovery_actions()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            native: None,
        }
    }

    /// Attaches the originating backend failure.
    pub fn with_native(mut self, native: NativeError) -> Self {
        self.native = Some(native);
        self
    }

    pub fn timeout(after_ms: u128) -> Self {
        ScanError::new(
            ScanErrorKind::Timeout,
            format!("Scan timed out after {}ms", after_ms),
        )
    }

    pub fn cancelled() -> Self {
        ScanError::new(ScanErrorKind::Cancelled, "Scan was cancelled by user")
    }

    pub fn unsupported_device() -> Self {
        ScanError::new(
            ScanErrorKind::UnsupportedDevice,
            "Barcode scanning not supported on this device",
        )
    }

    pub fn is_recoverable(&self) -> bool {
        self.kind.is_recoverable()
    }
}

impl From<NativeError> for ScanError {
    fn from(native: NativeError) -> Self {
        classify(native)
    }
}

/// True when the caller may simply retry. Same as
/// [`ScanError::is_recoverable`].
pub fn is_recoverable(error: &ScanError) -> bool {
    error.is_recoverable()
}

// =============================================================================
// Classifier
// =============================================================================

/// Maps a backend failure onto a [`ScanError`]. Total: anything unrecognized
/// becomes `CAMERA_ERROR` carrying the raw message.
pub fn classify(native: NativeError) -> ScanError {
    let name = native.name.as_str();
    let message = match native.message.as_str() {
        "" => "Unknown error",
        message => message,
    };
    let mentions = |needle: &str| message.contains(needle);

    let (kind, text) = if name == "NotAllowedError" || mentions("permission") {
        (ScanErrorKind::PermissionDenied, "Camera permission was denied")
    } else if name == "NotFoundError" || mentions("camera") {
        (ScanErrorKind::CameraError, "Camera is not available or in use")
    } else if name == "NotReadableError" || name == "AbortError" {
        (ScanErrorKind::CameraError, "Unable to access camera hardware")
    } else if mentions("network") || mentions("load") {
        (ScanErrorKind::NetworkError, "Failed to load scanner resources")
    } else if mentions("Content Security Policy") || mentions("worker") {
        (ScanErrorKind::NetworkError, "Scanner blocked by security policy")
    } else if mentions("https") || mentions("secure") {
        (ScanErrorKind::PermissionDenied, "Camera requires HTTPS connection")
    } else {
        (ScanErrorKind::CameraError, message)
    };
    let text = text.to_string();

    ScanError::new(kind, text).with_native(native)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(name: &str, message: &str) -> ScanErrorKind {
        classify(NativeError::new(name, message)).kind
    }

    #[test]
    fn test_permission_errors() {
        assert_eq!(kind_of("NotAllowedError", ""), ScanErrorKind::PermissionDenied);
        assert_eq!(
            kind_of("", "User denied permission to the device"),
            ScanErrorKind::PermissionDenied
        );
        assert_eq!(
            kind_of("SecurityError", "getUserMedia requires a secure context"),
            ScanErrorKind::PermissionDenied
        );
    }

    #[test]
    fn test_camera_errors() {
        assert_eq!(kind_of("NotFoundError", "no device"), ScanErrorKind::CameraError);
        assert_eq!(kind_of("", "camera busy"), ScanErrorKind::CameraError);
        assert_eq!(kind_of("NotReadableError", "x"), ScanErrorKind::CameraError);
        assert_eq!(kind_of("AbortError", "x"), ScanErrorKind::CameraError);
    }

    #[test]
    fn test_network_errors() {
        let err = classify(NativeError::message("failed to load wasm decoder"));
        assert_eq!(err.kind, ScanErrorKind::NetworkError);
        assert_eq!(err.message, "Failed to load scanner resources");

        let err = classify(NativeError::message("Refused to create a worker"));
        assert_eq!(err.kind, ScanErrorKind::NetworkError);
        assert_eq!(err.message, "Scanner blocked by security policy");
    }

    #[test]
    fn test_rule_order_camera_before_network() {
        // "camera" is checked before "load"
        assert_eq!(
            kind_of("", "could not load camera driver"),
            ScanErrorKind::CameraError
        );
    }

    #[test]
    fn test_unknown_error_keeps_raw_message() {
        let err = classify(NativeError::new("WeirdError", "frame buffer exploded"));
        assert_eq!(err.kind, ScanErrorKind::CameraError);
        assert_eq!(err.message, "frame buffer exploded");
        assert_eq!(err.native.as_ref().unwrap().name, "WeirdError");

        let err = classify(NativeError::message(""));
        assert_eq!(err.kind, ScanErrorKind::CameraError);
        assert_eq!(err.message, "Unknown error");
    }

    #[test]
    fn test_message_matching_is_case_sensitive() {
        let err = classify(NativeError::message("Secure context required"));
        assert_eq!(err.kind, ScanErrorKind::CameraError);
        assert_eq!(err.message, "Secure context required");
        assert!(err.is_recoverable());

        assert_eq!(kind_of("", "Network request failed"), ScanErrorKind::CameraError);
        assert_eq!(kind_of("", "Permission dismissed"), ScanErrorKind::CameraError);
        assert_eq!(kind_of("", "Camera busy"), ScanErrorKind::CameraError);
        assert_eq!(
            kind_of("", "blocked by content security policy"),
            ScanErrorKind::CameraError
        );
        assert_eq!(
            kind_of("", "Refused by Content Security Policy"),
            ScanErrorKind::NetworkError
        );
        assert_eq!(kind_of("", "network request failed"), ScanErrorKind::NetworkError);
    }

    #[test]
    fn test_user_message_and_actions_attached() {
        let err = ScanError::new(ScanErrorKind::Timeout, "slow");
        assert_eq!(err.user_message, ScanErrorKind::Timeout.user_message());
        assert_eq!(err.recovery_actions.len(), 4);
        assert_eq!(err.recovery_actions[0], "Ensure good lighting conditions");
        assert!(err.native.is_none());
    }

    #[test]
    fn test_recoverable_kinds() {
        let recoverable = [
            ScanErrorKind::Timeout,
            ScanErrorKind::Cancelled,
            ScanErrorKind::CameraError,
            ScanErrorKind::NetworkError,
        ];
        let fatal = [
            ScanErrorKind::PermissionDenied,
            ScanErrorKind::InvalidFormat,
            ScanErrorKind::UnsupportedDevice,
        ];

        for kind in recoverable {
            assert!(is_recoverable(&ScanError::new(kind, "x")), "{kind}");
        }
        for kind in fatal {
            assert!(!is_recoverable(&ScanError::new(kind, "x")), "{kind}");
        }
    }

    #[test]
    fn test_error_display_and_wire_name() {
        let err = ScanError::timeout(15_000);
        assert_eq!(err.to_string(), "TIMEOUT: Scan timed out after 15000ms");

        let json = serde_json::to_value(ScanError::cancelled()).unwrap();
        assert_eq!(json["kind"], "CANCELLED");
        assert!(json["userMessage"].as_str().unwrap().contains("cancelled"));
    }
}
