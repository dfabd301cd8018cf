//! # Scan Types
//!
//! The vocabulary shared by the scan session, the UI surface and the
//! validators.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Scan Types                                     │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  ScanRequest    │   │   ScanResult    │   │  ScannerState   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  formats        │   │  data           │   │  is_scanning    │       │
//! │  │  timeout        │──►│  format         │──►│  is_initializing│       │
//! │  │  feedback flags │   │  timestamp      │   │  permission     │       │
//! │  │  facing         │   │  bounds         │   │  last_result    │       │
//! │  │  validator      │   └─────────────────┘   │  error          │       │
//! │  └─────────────────┘                         └─────────────────┘       │
//! │                                                                         │
//! │  ScanRequest: built per call, immutable once the scan starts           │
//! │  ScanResult:  produced exactly once per successful scan                │
//! │  ScannerState: owned by the session, readers get copies                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::classify::ScanError;
use crate::error::ValidationError;
use crate::DEFAULT_SCAN_TIMEOUT_MS;

// =============================================================================
// Barcode Format
// =============================================================================

/// Barcode symbologies the scanner understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum BarcodeFormat {
    #[serde(rename = "QR_CODE")]
    QrCode,
    #[serde(rename = "CODE_128")]
    Code128,
    #[serde(rename = "EAN_13")]
    Ean13,
    #[serde(rename = "EAN_8")]
    Ean8,
    #[serde(rename = "UPC_A")]
    UpcA,
    #[serde(rename = "UPC_E")]
    UpcE,
    #[serde(rename = "CODE_39")]
    Code39,
    #[serde(rename = "DATA_MATRIX")]
    DataMatrix,
}

impl BarcodeFormat {
    /// Every supported symbology.
    pub const ALL: [BarcodeFormat; 8] = [
        BarcodeFormat::QrCode,
        BarcodeFormat::Code128,
        BarcodeFormat::Ean13,
        BarcodeFormat::Ean8,
        BarcodeFormat::UpcA,
        BarcodeFormat::UpcE,
        BarcodeFormat::Code39,
        BarcodeFormat::DataMatrix,
    ];

    /// Wire name, e.g. `CODE_128`.
    pub fn as_str(&self) -> &'static str {
        match self {
            BarcodeFormat::QrCode => "QR_CODE",
            BarcodeFormat::Code128 => "CODE_128",
            BarcodeFormat::Ean13 => "EAN_13",
            BarcodeFormat::Ean8 => "EAN_8",
            BarcodeFormat::UpcA => "UPC_A",
            BarcodeFormat::UpcE => "UPC_E",
            BarcodeFormat::Code39 => "CODE_39",
            BarcodeFormat::DataMatrix => "DATA_MATRIX",
        }
    }
}

impl fmt::Display for BarcodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BarcodeFormat {
    type Err = ValidationError;

    /// Accepts the wire name in any case, with `-` or `_` separators
    /// (`code-128`, `CODE_128`, `qr_code`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace('-', "_");
        BarcodeFormat::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == normalized)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "format".to_string(),
                allowed: BarcodeFormat::ALL
                    .iter()
                    .map(|f| f.as_str().to_string())
                    .collect(),
            })
    }
}

// =============================================================================
// Camera Facing
// =============================================================================

/// Which camera the scanner should open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CameraFacing {
    /// Rear camera. Warehouse default.
    #[default]
    Environment,
    /// Front (selfie) camera.
    User,
}

// =============================================================================
// Scan Request
// =============================================================================

/// Caller-supplied predicate run on every decoded payload that passed the
/// format filter. Returning `false` keeps the scan going.
pub type CodeValidator = Arc<dyn Fn(&str, BarcodeFormat) -> bool + Send + Sync>;

/// Configuration for one scan attempt.
///
/// ## Defaults
/// - any format accepted
/// - 15 s timeout
/// - haptic feedback on, audio feedback off
/// - rear camera
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use dock_core::{BarcodeFormat, ScanRequest};
///
/// let request = ScanRequest::new()
///     .formats([BarcodeFormat::Code128])
///     .timeout(Duration::from_secs(10))
///     .validator(|data, _| data.len() >= 6);
///
/// assert!(request.accepts("ABC123", BarcodeFormat::Code128));
/// assert!(!request.accepts("ABC123", BarcodeFormat::QrCode));
/// assert!(!request.accepts("AB1", BarcodeFormat::Code128));
/// ```
#[derive(Clone)]
pub struct ScanRequest {
    /// Accepted symbologies. `None` accepts everything.
    pub formats: Option<Vec<BarcodeFormat>>,

    /// Wall-clock limit measured from the moment `scan()` is called.
    pub timeout: Duration,

    /// Vibrate on success.
    pub haptic_feedback: bool,

    /// Play the success tone.
    pub audio_feedback: bool,

    /// Camera to open on first use.
    pub facing: CameraFacing,

    /// Optional custom acceptance predicate.
    pub validator: Option<CodeValidator>,
}

impl Default for ScanRequest {
    fn default() -> Self {
        ScanRequest {
            formats: None,
            timeout: Duration::from_millis(DEFAULT_SCAN_TIMEOUT_MS),
            haptic_feedback: true,
            audio_feedback: false,
            facing: CameraFacing::Environment,
            validator: None,
        }
    }
}

impl fmt::Debug for ScanRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanRequest")
            .field("formats", &self.formats)
            .field("timeout", &self.timeout)
            .field("haptic_feedback", &self.haptic_feedback)
            .field("audio_feedback", &self.audio_feedback)
            .field("facing", &self.facing)
            .field("validator", &self.validator.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl ScanRequest {
    /// Creates a request with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the accepted formats. An empty set removes the filter.
    pub fn formats(mut self, formats: impl IntoIterator<Item = BarcodeFormat>) -> Self {
        let formats: Vec<BarcodeFormat> = formats.into_iter().collect();
        self.formats = if formats.is_empty() { None } else { Some(formats) };
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn haptic_feedback(mut self, enabled: bool) -> Self {
        self.haptic_feedback = enabled;
        self
    }

    pub fn audio_feedback(mut self, enabled: bool) -> Self {
        self.audio_feedback = enabled;
        self
    }

    pub fn facing(mut self, facing: CameraFacing) -> Self {
        self.facing = facing;
        self
    }

    /// Installs a custom acceptance predicate.
    pub fn validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&str, BarcodeFormat) -> bool + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Decode filter: the format must be accepted (when a set was given)
    /// and the custom validator, if any, must agree.
    pub fn accepts(&self, data: &str, format: BarcodeFormat) -> bool {
        if let Some(ref formats) = self.formats {
            if !formats.contains(&format) {
                return false;
            }
        }

        match self.validator {
            Some(ref validator) => validator(data, format),
            None => true,
        }
    }
}

// =============================================================================
// Scan Result
// =============================================================================

/// Bounding box of a detected code, in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One successful scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    /// Decoded payload, exactly as the decoder produced it.
    pub data: String,

    /// Detected symbology (heuristic, see [`crate::format::detect_format`]).
    pub format: BarcodeFormat,

    /// When the scan completed.
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,

    /// Where the code was in the frame, when the decoder reports it.
    pub bounds: Option<Bounds>,
}

// =============================================================================
// Scanner State
// =============================================================================

/// Camera permission as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    /// Never asked, or the platform cannot say without prompting.
    #[default]
    Unknown,
    Granted,
    Denied,
}

impl PermissionState {
    /// `Some(granted)` when the state is definitive.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PermissionState::Unknown => None,
            PermissionState::Granted => Some(true),
            PermissionState::Denied => Some(false),
        }
    }
}

impl From<bool> for PermissionState {
    fn from(granted: bool) -> Self {
        if granted {
            PermissionState::Granted
        } else {
            PermissionState::Denied
        }
    }
}

/// Snapshot of a scan session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ScannerState {
    pub is_scanning: bool,
    pub is_initializing: bool,
    pub permission: PermissionState,
    pub last_result: Option<ScanResult>,
    pub error: Option<ScanError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_wire_names() {
        let json = serde_json::to_string(&BarcodeFormat::Code128).unwrap();
        assert_eq!(json, "\"CODE_128\"");

        let parsed: BarcodeFormat = serde_json::from_str("\"EAN_13\"").unwrap();
        assert_eq!(parsed, BarcodeFormat::Ean13);
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("code-128".parse::<BarcodeFormat>().unwrap(), BarcodeFormat::Code128);
        assert_eq!("QR_CODE".parse::<BarcodeFormat>().unwrap(), BarcodeFormat::QrCode);
        assert_eq!(" upc_e ".parse::<BarcodeFormat>().unwrap(), BarcodeFormat::UpcE);
        assert!("pdf417".parse::<BarcodeFormat>().is_err());
    }

    #[test]
    fn test_request_defaults() {
        let request = ScanRequest::default();
        assert_eq!(request.timeout, Duration::from_millis(15_000));
        assert!(request.haptic_feedback);
        assert!(!request.audio_feedback);
        assert_eq!(request.facing, CameraFacing::Environment);
        assert!(request.formats.is_none());
    }

    #[test]
    fn test_request_accepts_without_filter() {
        let request = ScanRequest::new();
        for format in BarcodeFormat::ALL {
            assert!(request.accepts("anything", format));
        }
    }

    #[test]
    fn test_empty_format_set_means_no_filter() {
        let request = ScanRequest::new().formats(Vec::new());
        assert!(request.formats.is_none());
        assert!(request.accepts("X", BarcodeFormat::DataMatrix));
    }

    #[test]
    fn test_validator_runs_after_format_filter() {
        let request = ScanRequest::new()
            .formats([BarcodeFormat::Ean13])
            .validator(|data, _| data.starts_with('4'));

        assert!(request.accepts("4006381333931", BarcodeFormat::Ean13));
        assert!(!request.accepts("5006381333931", BarcodeFormat::Ean13));
        assert!(!request.accepts("4006381333931", BarcodeFormat::Code128));
    }

    #[test]
    fn test_state_serializes_camel_case() {
        let state = ScannerState::default();
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["isScanning"], false);
        assert_eq!(json["permission"], "unknown");
        assert!(json["lastResult"].is_null());
    }

    #[test]
    fn test_permission_state_from_bool() {
        assert_eq!(PermissionState::from(true), PermissionState::Granted);
        assert_eq!(PermissionState::Denied.as_bool(), Some(false));
        assert_eq!(PermissionState::Unknown.as_bool(), None);
    }
}
