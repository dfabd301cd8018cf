//! # Scan Terminal
//!
//! A receiving-dock terminal driven by a keyboard-wedge scanner.
//!
//! ## Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   scan ──► Ok(result)  ──► classify against FormatRules ──► JSON line   │
//! │     ▲                                                          │        │
//! │     └──────────────────────────────────────────────────────────┘        │
//! │                                                                         │
//! │   Err(TIMEOUT)            ──► scan again (idle dock)                    │
//! │   Err(recoverable)        ──► scan again, up to MAX_CONSECUTIVE_FAILURES│
//! │   Err(non-recoverable)    ──► print guidance, fall back to manual entry │
//! │   Ctrl-C                  ──► cancel scan, release device, exit         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Environment
//! - `DOCK_SCAN_CONFIG` - path to scanner.toml (default: platform config dir)
//! - `RUST_LOG` - log filter (default: `info,dock=debug,scan_terminal=debug`)

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use dock_core::validation::{format_scanned_data, validate_scanned_data, EntityType, FormatRules};
use dock_core::{ScanError, ScanErrorKind, ScanResult};
use dock_scan::{
    Capabilities, ScanFeedback, ScanSession, ScannerConfig, ScannerHook, StaticCapabilities,
    WedgeDevice,
};
use serde::Serialize;
use tokio::io::{stdin, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Recoverable failures tolerated in a row before giving up on the scanner.
const MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// One line of output per accepted scan.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScanLine<'a> {
    result: &'a ScanResult,
    entity: Option<EntityType>,
    display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    rejection: Option<String>,
}

impl<'a> ScanLine<'a> {
    fn new(result: &'a ScanResult, rules: &FormatRules) -> Self {
        let (entity, rejection) = match validate_scanned_data(&result.data, rules) {
            Ok(entity) => (Some(entity), None),
            Err(reason) => (None, Some(reason.to_string())),
        };

        ScanLine {
            result,
            entity,
            display: format_scanned_data(&result.data, entity),
            rejection,
        }
    }
}

/// Rings the terminal bell for the success tone. Terminals cannot vibrate.
struct TerminalBell;

impl ScanFeedback for TerminalBell {
    fn vibrate(&self, _duration: Duration) {}

    fn beep(&self, _frequency_hz: u32, _duration: Duration) {
        let mut stderr = std::io::stderr();
        let _ = stderr.write_all(b"\x07");
        let _ = stderr.flush();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ScannerConfig::load(config_path()).context("loading scanner config")?;
    let rules = config.rules()?;
    info!(
        device = %config.device.name,
        timeout_ms = config.scan.timeout_ms,
        formats = ?config.scan.formats,
        "Scan terminal starting"
    );

    let capabilities: Arc<dyn Capabilities> = Arc::new(StaticCapabilities::supported());
    let session = ScanSession::builder(WedgeDevice::new(BufReader::new(stdin())))
        .capabilities(capabilities.clone())
        .feedback(Arc::new(TerminalBell))
        .max_scans_per_second(config.device.max_scans_per_second)
        .spawn();
    let hook = ScannerHook::new(session, capabilities);

    if !hook.is_supported() || !hook.check_permissions().await {
        if let Some(error) = hook.error() {
            manual_entry(&error);
        }
        hook.unmount().await;
        return Ok(());
    }

    let request = config.to_request();
    let mut failures = 0u32;

    loop {
        tokio::select! {
            outcome = hook.scan(request.clone()) => match outcome {
                Ok(result) => {
                    failures = 0;
                    let line = serde_json::to_string(&ScanLine::new(&result, &rules))?;
                    println!("{line}");
                }
                Err(error) if error.kind == ScanErrorKind::Timeout => {
                    debug!("No scan before timeout, waiting again");
                }
                Err(error) if error.is_recoverable() && failures < MAX_CONSECUTIVE_FAILURES => {
                    failures += 1;
                    warn!(kind = %error.kind, attempt = failures, "Retrying after scan failure");
                }
                Err(error) => {
                    manual_entry(&error);
                    break;
                }
            },

            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, cancelling scan");
                hook.cancel_scan().await?;
                break;
            }
        }
    }

    hook.unmount().await;
    info!("Scan terminal stopped");
    Ok(())
}

/// Tells the operator to key the code in by hand.
fn manual_entry(error: &ScanError) {
    eprintln!("{}", error.user_message);
    for action in &error.recovery_actions {
        eprintln!("  - {action}");
    }
    eprintln!("Enter codes manually until the scanner is fixed.");
}

/// `DOCK_SCAN_CONFIG` if set, else the platform default.
fn config_path() -> Option<PathBuf> {
    std::env::var("DOCK_SCAN_CONFIG").ok().map(PathBuf::from)
}

/// Initializes the tracing subscriber. Logs go to stderr; stdout carries
/// scan output.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=dock=trace` - Show trace for dock crates only
/// - Default: INFO level, DEBUG for dock crates
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,dock=debug,scan_terminal=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use dock_core::BarcodeFormat;

    fn scanned(data: &str) -> ScanResult {
        ScanResult {
            data: data.to_string(),
            format: BarcodeFormat::Code128,
            timestamp: Default::default(),
            bounds: None,
        }
    }

    #[test]
    fn test_scan_line_for_license_plate() {
        let result = scanned("abc123");
        let line = ScanLine::new(&result, &FormatRules::default());

        assert_eq!(line.entity, Some(EntityType::LicensePlate));
        assert_eq!(line.display, "ABC-123");
        assert!(line.rejection.is_none());

        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["entity"], "licensePlate");
        assert!(json.get("rejection").is_none());
    }

    #[test]
    fn test_scan_line_for_unknown_code() {
        let result = scanned("AB");
        let line = ScanLine::new(&result, &FormatRules::default());

        assert_eq!(line.entity, None);
        assert_eq!(
            line.rejection.as_deref(),
            Some("Code too short (minimum 6 characters)")
        );
    }
}
