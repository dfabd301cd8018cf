//! # dock-scan: Scan Session for Dock Scan
//!
//! Drives a camera (or anything that decodes barcodes) through scan
//! attempts, one at a time, and publishes what happened.
//!
//! ## Modules
//!
//! - [`session`] - The scan session actor and its handle
//! - [`device`] - Device, capability and feedback seams, keyboard-wedge device
//! - [`hook`] - UI adapter over a session
//! - [`config`] - scanner.toml + environment configuration
//! - [`error`] - Session and configuration errors
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use dock_scan::{ScanSession, ScannerConfig, WedgeDevice};
//! use tokio::io::{stdin, BufReader};
//!
//! let config = ScannerConfig::load(None)?;
//! let session = ScanSession::builder(WedgeDevice::new(BufReader::new(stdin())))
//!     .max_scans_per_second(config.device.max_scans_per_second)
//!     .spawn();
//!
//! match session.scan(config.to_request()).await {
//!     Ok(result) => println!("{}", result.data),
//!     Err(e) if e.is_recoverable() => { /* try again */ }
//!     Err(e) => eprintln!("{}", e.user_message),
//! }
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod hook;
pub mod session;

pub use config::ScannerConfig;
pub use device::{
    CameraDevice, Capabilities, DecodedFrame, DeviceEvent, DeviceOptions, FrameSink, NoFeedback,
    ScanFeedback, StaticCapabilities, WedgeDevice,
};
pub use error::{ScannerError, ScannerResult};
pub use hook::ScannerHook;
pub use session::{ScanOutcome, ScanSession, SessionBuilder};
