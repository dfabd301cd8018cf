//! # Device Seams
//!
//! The session never touches hardware or platform globals directly. It talks
//! to three injected collaborators:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Device Seams                                   │
//! │                                                                         │
//! │  CameraDevice   probe / init / start(frames) / stop / destroy          │
//! │                 decoded payloads and runtime faults arrive on the      │
//! │                 FrameSink                                              │
//! │                                                                         │
//! │  Capabilities   "can this platform scan at all?"                       │
//! │                 cached permission, haptics available                   │
//! │                                                                         │
//! │  ScanFeedback   vibrate / beep on success                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Failures cross the seam as [`NativeError`] and are classified by the
//! session, so implementations report what went wrong in their own terms.

pub mod wedge;

use std::time::Duration;

use async_trait::async_trait;
use dock_core::{Bounds, CameraFacing, NativeError, PermissionState, MAX_SCANS_PER_SECOND};
use tokio::sync::mpsc;

pub use wedge::WedgeDevice;

// =============================================================================
// Camera Device
// =============================================================================

/// One payload decoded from a camera frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    pub data: String,
    pub bounds: Option<Bounds>,
}

impl DecodedFrame {
    pub fn new(data: impl Into<String>) -> Self {
        DecodedFrame {
            data: data.into(),
            bounds: None,
        }
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }
}

/// What a started device reports.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// A payload was decoded.
    Decoded(DecodedFrame),

    /// The device failed while running (unplugged, input closed).
    Failed(NativeError),
}

/// Where a started device delivers its events.
pub type FrameSink = mpsc::Sender<DeviceEvent>;

/// Settings applied when a device is first acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceOptions {
    pub facing: CameraFacing,

    /// Decode attempts per second. Payloads beyond this rate are dropped by
    /// the device.
    pub max_scans_per_second: u32,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        DeviceOptions {
            facing: CameraFacing::Environment,
            max_scans_per_second: MAX_SCANS_PER_SECOND,
        }
    }
}

impl DeviceOptions {
    /// Minimum spacing between two delivered payloads.
    pub fn min_frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.max_scans_per_second.max(1)
    }
}

/// A camera plus decoder.
///
/// ## Lifecycle
/// ```text
/// probe ─► (released)
///
/// init ─► start ─► frames… ─► stop ─► start ─► … ─► destroy
///   ▲                                                  │
///   └──────────────── init again after destroy ◄───────┘
/// ```
///
/// `stop` and `destroy` must tolerate being called when nothing is running.
/// After `stop` returns the device should not send further events; the
/// session discards any that slip through.
#[async_trait]
pub trait CameraDevice: Send + 'static {
    /// Minimal acquisition to learn whether access is granted. Releases the
    /// camera before returning.
    async fn probe(&mut self, facing: CameraFacing) -> Result<(), NativeError>;

    /// Acquires the camera and decoder.
    async fn init(&mut self, options: DeviceOptions) -> Result<(), NativeError>;

    /// Starts decoding into `frames`.
    async fn start(&mut self, frames: FrameSink) -> Result<(), NativeError>;

    /// Stops decoding. The device stays acquired.
    async fn stop(&mut self);

    /// Releases everything acquired by `init`.
    async fn destroy(&mut self);
}

// =============================================================================
// Capabilities
// =============================================================================

/// What the host platform offers.
pub trait Capabilities: Send + Sync {
    /// A media-capture API exists.
    fn has_media_capture(&self) -> bool;

    /// A frame-decoding surface exists.
    fn has_frame_decoder(&self) -> bool;

    /// Camera access is allowed from this context.
    fn is_secure_context(&self) -> bool;

    /// Permission as the platform remembers it, without prompting.
    fn cached_permission(&self) -> PermissionState {
        PermissionState::Unknown
    }

    fn supports_haptics(&self) -> bool {
        false
    }

    /// Scanning needs all three of capture, decoding and a secure context.
    fn is_scanning_supported(&self) -> bool {
        self.has_media_capture() && self.has_frame_decoder() && self.is_secure_context()
    }
}

/// Fixed capability answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticCapabilities {
    pub media_capture: bool,
    pub frame_decoder: bool,
    pub secure_context: bool,
    pub permission: PermissionState,
    pub haptics: bool,
}

impl StaticCapabilities {
    /// Everything present, permission not yet known.
    pub fn supported() -> Self {
        StaticCapabilities {
            media_capture: true,
            frame_decoder: true,
            secure_context: true,
            permission: PermissionState::Unknown,
            haptics: false,
        }
    }

    /// No media-capture API.
    pub fn unsupported() -> Self {
        StaticCapabilities {
            media_capture: false,
            ..Self::supported()
        }
    }

    pub fn with_permission(mut self, permission: PermissionState) -> Self {
        self.permission = permission;
        self
    }

    pub fn with_haptics(mut self, haptics: bool) -> Self {
        self.haptics = haptics;
        self
    }
}

impl Capabilities for StaticCapabilities {
    fn has_media_capture(&self) -> bool {
        self.media_capture
    }

    fn has_frame_decoder(&self) -> bool {
        self.frame_decoder
    }

    fn is_secure_context(&self) -> bool {
        self.secure_context
    }

    fn cached_permission(&self) -> PermissionState {
        self.permission
    }

    fn supports_haptics(&self) -> bool {
        self.haptics
    }
}

// =============================================================================
// Feedback
// =============================================================================

/// Success feedback. Failures to play feedback are swallowed by implementors.
pub trait ScanFeedback: Send + Sync {
    fn vibrate(&self, duration: Duration);

    fn beep(&self, frequency_hz: u32, duration: Duration);
}

/// Feedback that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFeedback;

impl ScanFeedback for NoFeedback {
    fn vibrate(&self, _duration: Duration) {}

    fn beep(&self, _frequency_hz: u32, _duration: Duration) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_support_requires_all_three() {
        assert!(StaticCapabilities::supported().is_scanning_supported());
        assert!(!StaticCapabilities::unsupported().is_scanning_supported());

        let insecure = StaticCapabilities {
            secure_context: false,
            ..StaticCapabilities::supported()
        };
        assert!(!insecure.is_scanning_supported());
    }

    #[test]
    fn test_frame_interval() {
        let options = DeviceOptions::default();
        assert_eq!(options.min_frame_interval(), Duration::from_millis(200));

        let zero = DeviceOptions {
            max_scans_per_second: 0,
            ..options
        };
        assert_eq!(zero.min_frame_interval(), Duration::from_secs(1));
    }
}
