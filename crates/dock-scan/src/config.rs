//! # Scanner Configuration
//!
//! Configuration for scan defaults, the device, and warehouse code rules.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     DOCK_SCAN_TIMEOUT_MS=10000                                         │
//! │     DOCK_CAMERA_FACING=user                                            │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/scan/scanner.toml (Linux)                                │
//! │     ~/Library/Application Support/com.dock.scan/scanner.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     15 s timeout, haptics on, audio off, rear camera, 5 scans/s        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # scanner.toml
//! [scan]
//! timeout_ms = 15000
//! haptic_feedback = true
//! audio_feedback = false
//! facing = "environment"     # environment | user
//! formats = ["CODE_128", "QR_CODE"]
//!
//! [device]
//! name = "Dock Door 3"
//! max_scans_per_second = 5
//!
//! [rules]
//! license_plate = "^PAL-[0-9]{6}$"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use dock_core::validation::FormatRules;
use dock_core::{BarcodeFormat, CameraFacing, ScanRequest, DEFAULT_SCAN_TIMEOUT_MS, MAX_SCANS_PER_SECOND};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ScannerError, ScannerResult};

/// Upper bound accepted for `max_scans_per_second`.
pub const MAX_SCAN_RATE: u32 = 60;

// =============================================================================
// Scan Settings
// =============================================================================

/// Defaults applied to every scan request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSettings {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_true")]
    pub haptic_feedback: bool,

    #[serde(default)]
    pub audio_feedback: bool,

    #[serde(default)]
    pub facing: CameraFacing,

    /// Accepted formats. Empty accepts everything.
    #[serde(default)]
    pub formats: Vec<BarcodeFormat>,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_SCAN_TIMEOUT_MS
}

fn default_true() -> bool {
    true
}

impl Default for ScanSettings {
    fn default() -> Self {
        ScanSettings {
            timeout_ms: default_timeout_ms(),
            haptic_feedback: true,
            audio_feedback: false,
            facing: CameraFacing::default(),
            formats: Vec::new(),
        }
    }
}

// =============================================================================
// Device Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// Shown in logs.
    #[serde(default = "default_device_name")]
    pub name: String,

    #[serde(default = "default_max_scans_per_second")]
    pub max_scans_per_second: u32,
}

fn default_device_name() -> String {
    "Scan Terminal".to_string()
}

fn default_max_scans_per_second() -> u32 {
    MAX_SCANS_PER_SECOND
}

impl Default for DeviceSettings {
    fn default() -> Self {
        DeviceSettings {
            name: default_device_name(),
            max_scans_per_second: default_max_scans_per_second(),
        }
    }
}

// =============================================================================
// Rule Overrides
// =============================================================================

/// Optional replacements for the built-in warehouse code patterns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_plate: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_number: Option<String>,
}

// =============================================================================
// Main Scanner Configuration
// =============================================================================

/// Complete scanner configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default)]
    pub scan: ScanSettings,

    #[serde(default)]
    pub device: DeviceSettings,

    #[serde(default)]
    pub rules: RuleOverrides,
}

impl ScannerConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (scanner.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ScannerResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading scanner config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ScannerResult<()> {
        if self.scan.timeout_ms == 0 {
            return Err(ScannerError::InvalidConfig(
                "timeout_ms must be greater than 0".into(),
            ));
        }

        if !(1..=MAX_SCAN_RATE).contains(&self.device.max_scans_per_second) {
            return Err(ScannerError::InvalidConfig(format!(
                "max_scans_per_second must be between 1 and {}, got {}",
                MAX_SCAN_RATE, self.device.max_scans_per_second
            )));
        }

        self.rules()?;
        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(timeout) = std::env::var("DOCK_SCAN_TIMEOUT_MS") {
            match timeout.parse::<u64>() {
                Ok(ms) => {
                    debug!(timeout_ms = ms, "Overriding scan timeout from environment");
                    self.scan.timeout_ms = ms;
                }
                Err(_) => warn!(value = %timeout, "Ignoring unparsable DOCK_SCAN_TIMEOUT_MS"),
            }
        }

        if let Ok(facing) = std::env::var("DOCK_CAMERA_FACING") {
            match facing.to_lowercase().as_str() {
                "environment" | "rear" | "back" => self.scan.facing = CameraFacing::Environment,
                "user" | "front" => self.scan.facing = CameraFacing::User,
                _ => warn!(facing = %facing, "Unknown camera facing in environment"),
            }
        }

        if let Ok(formats) = std::env::var("DOCK_SCAN_FORMATS") {
            let parsed: Result<Vec<BarcodeFormat>, _> = formats
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::parse)
                .collect();
            match parsed {
                Ok(parsed) => self.scan.formats = parsed,
                Err(e) => warn!(error = %e, "Ignoring DOCK_SCAN_FORMATS"),
            }
        }

        if let Ok(haptic) = std::env::var("DOCK_HAPTIC_FEEDBACK") {
            if let Some(enabled) = parse_flag(&haptic) {
                self.scan.haptic_feedback = enabled;
            }
        }

        if let Ok(audio) = std::env::var("DOCK_AUDIO_FEEDBACK") {
            if let Some(enabled) = parse_flag(&audio) {
                self.scan.audio_feedback = enabled;
            }
        }

        if let Ok(name) = std::env::var("DOCK_DEVICE_NAME") {
            self.device.name = name;
        }

        if let Ok(rate) = std::env::var("DOCK_MAX_SCANS_PER_SECOND") {
            if let Ok(rate) = rate.parse::<u32>() {
                self.device.max_scans_per_second = rate;
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "dock", "scan")
            .map(|dirs| dirs.config_dir().join("scanner.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.scan.timeout_ms)
    }

    /// A scan request carrying the configured defaults.
    pub fn to_request(&self) -> ScanRequest {
        ScanRequest::new()
            .formats(self.scan.formats.iter().copied())
            .timeout(self.timeout())
            .haptic_feedback(self.scan.haptic_feedback)
            .audio_feedback(self.scan.audio_feedback)
            .facing(self.scan.facing)
    }

    /// Compiles the configured code rules, falling back to the built-in
    /// pattern for every rule left unset.
    pub fn rules(&self) -> ScannerResult<FormatRules> {
        Ok(FormatRules::from_patterns(
            self.rules.license_plate.as_deref(),
            self.rules.location.as_deref(),
            self.rules.part_number.as_deref(),
        )?)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            warn!(value = %value, "Ignoring unparsable flag");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dock_core::validation::{validate_scanned_data, EntityType};

    #[test]
    fn test_default_config() {
        let config = ScannerConfig::default();
        assert_eq!(config.scan.timeout_ms, 15_000);
        assert!(config.scan.haptic_feedback);
        assert!(!config.scan.audio_feedback);
        assert_eq!(config.scan.facing, CameraFacing::Environment);
        assert_eq!(config.device.max_scans_per_second, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: ScannerConfig = toml::from_str(
            r#"
            [scan]
            timeout_ms = 8000
            formats = ["CODE_128"]

            [device]
            name = "Dock Door 3"
            "#,
        )
        .unwrap();

        assert_eq!(config.scan.timeout_ms, 8000);
        assert!(config.scan.haptic_feedback);
        assert_eq!(config.scan.formats, vec![BarcodeFormat::Code128]);
        assert_eq!(config.device.name, "Dock Door 3");
        assert_eq!(config.device.max_scans_per_second, 5);
    }

    #[test]
    fn test_config_validation() {
        let mut config = ScannerConfig::default();

        config.scan.timeout_ms = 0;
        assert!(config.validate().is_err());

        config.scan.timeout_ms = 1000;
        config.device.max_scans_per_second = 0;
        assert!(config.validate().is_err());

        config.device.max_scans_per_second = 61;
        assert!(config.validate().is_err());

        config.device.max_scans_per_second = 60;
        assert!(config.validate().is_ok());

        config.rules.location = Some("([".into());
        let err = config.validate().unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_rule_overrides() {
        let config: ScannerConfig = toml::from_str(
            r#"
            [rules]
            location = "^BIN-[0-9]{2}$"
            "#,
        )
        .unwrap();

        let rules = config.rules().unwrap();
        assert_eq!(validate_scanned_data("bin-42", &rules), Ok(EntityType::Location));
        assert_eq!(validate_scanned_data("ABC123", &rules), Ok(EntityType::LicensePlate));
    }

    #[test]
    fn test_to_request() {
        let mut config = ScannerConfig::default();
        config.scan.timeout_ms = 2500;
        config.scan.audio_feedback = true;

        let request = config.to_request();
        assert_eq!(request.timeout, Duration::from_millis(2500));
        assert!(request.audio_feedback);
        assert_eq!(request.formats, None);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("ON"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_toml_round_trip_sections() {
        let toml_str = toml::to_string_pretty(&ScannerConfig::default()).unwrap();
        assert!(toml_str.contains("[scan]"));
        assert!(toml_str.contains("[device]"));
    }
}
