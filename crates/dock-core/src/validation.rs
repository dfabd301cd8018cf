//! # Validation Module
//!
//! Recognizes what a scanned code *is* in warehouse terms, and validates
//! operator input before it reaches the warehouse rules.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Scan → Entity Pipeline                             │
//! │                                                                         │
//! │  raw payload "  abc123 "                                                │
//! │       │                                                                 │
//! │       ▼  normalize (trim + uppercase)                                   │
//! │  "ABC123"                                                               │
//! │       │                                                                 │
//! │       ├── license_plate  ^[A-Z0-9]{6,8}$        → LicensePlate          │
//! │       ├── location       ^LOC-[A-Z0-9]{2,10}$   → Location              │
//! │       ├── part_number    ^[A-Z0-9]{8,14}$       → PartNumber            │
//! │       │                                                                 │
//! │       └── no match → FormatRejection                                    │
//! │            ├── < 6 chars            TooShort                            │
//! │            ├── > 14 chars           TooLong                             │
//! │            ├── outside [A-Z0-9-]    InvalidCharacters                   │
//! │            └── otherwise            Unknown                             │
//! │                                                                         │
//! │  The three patterns are a FormatRules value: defaults above, any        │
//! │  subset overridable per call site or from scanner.toml.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use dock_core::validation::{validate_scanned_data, EntityType, FormatRules};
//!
//! let rules = FormatRules::default();
//! assert_eq!(validate_scanned_data("abc123", &rules), Ok(EntityType::LicensePlate));
//! assert_eq!(validate_scanned_data("LOC-A12", &rules), Ok(EntityType::Location));
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Patterns
// =============================================================================

/// Default license plate pattern: 6-8 alphanumeric characters.
pub const DEFAULT_LICENSE_PLATE_PATTERN: &str = r"^[A-Z0-9]{6,8}$";

/// Default location pattern: `LOC-` followed by 2-10 alphanumerics.
pub const DEFAULT_LOCATION_PATTERN: &str = r"^LOC-[A-Z0-9]{2,10}$";

/// Default part number pattern: 8-14 alphanumeric characters.
pub const DEFAULT_PART_NUMBER_PATTERN: &str = r"^[A-Z0-9]{8,14}$";

// Built-in patterns are constants, so they are unwrapped at first use.
// `test_built_in_patterns_compile` forces every one of them.
macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($re).expect("built-in pattern compiles"));
    };
}

pattern!(RE_DEFAULT_LICENSE_PLATE, DEFAULT_LICENSE_PLATE_PATTERN);
pattern!(RE_DEFAULT_LOCATION, DEFAULT_LOCATION_PATTERN);
pattern!(RE_DEFAULT_PART_NUMBER, DEFAULT_PART_NUMBER_PATTERN);

// Stricter entity checks used for operator input
pattern!(RE_LICENSE_PLATE, r"^(PAL-)?[A-Z0-9]{6,8}$");
pattern!(RE_LOCATION, r"^(LOC-[A-Z0-9]{2,10}|[A-Z]\d{2}-\d{2})$");
pattern!(RE_PART_NUMBER, r"^[A-Z0-9]{8,14}$");
pattern!(RE_PRO_NUMBER, r"^\d{8,11}$");
pattern!(RE_ORDER_NUMBER, r"^(ORD-|SO-|PO-)?[A-Z0-9]{6,12}$");
pattern!(RE_BARE_LOCATION, r"^[A-Z0-9]{2,10}$");

// =============================================================================
// Format Rules
// =============================================================================

/// The three patterns used to classify scans into warehouse entities.
#[derive(Debug, Clone)]
pub struct FormatRules {
    pub license_plate: Regex,
    pub location: Regex,
    pub part_number: Regex,
}

impl Default for FormatRules {
    fn default() -> Self {
        FormatRules {
            license_plate: RE_DEFAULT_LICENSE_PLATE.clone(),
            location: RE_DEFAULT_LOCATION.clone(),
            part_number: RE_DEFAULT_PART_NUMBER.clone(),
        }
    }
}

impl FormatRules {
    /// Starts from the defaults, replacing only what is overridden.
    pub fn builder() -> FormatRulesBuilder {
        FormatRulesBuilder {
            rules: FormatRules::default(),
        }
    }

    /// Compiles optional string overrides (e.g. from scanner.toml).
    ///
    /// `None` keeps the default for that entity.
    pub fn from_patterns(
        license_plate: Option<&str>,
        location: Option<&str>,
        part_number: Option<&str>,
    ) -> ValidationResult<Self> {
        let mut builder = FormatRules::builder();

        if let Some(pattern) = license_plate {
            builder = builder.license_plate(compile("license_plate", pattern)?);
        }
        if let Some(pattern) = location {
            builder = builder.location(compile("location", pattern)?);
        }
        if let Some(pattern) = part_number {
            builder = builder.part_number(compile("part_number", pattern)?);
        }

        Ok(builder.build())
    }
}

/// Builder returned by [`FormatRules::builder`].
#[derive(Debug, Clone)]
pub struct FormatRulesBuilder {
    rules: FormatRules,
}

impl FormatRulesBuilder {
    pub fn license_plate(mut self, pattern: Regex) -> Self {
        self.rules.license_plate = pattern;
        self
    }

    pub fn location(mut self, pattern: Regex) -> Self {
        self.rules.location = pattern;
        self
    }

    pub fn part_number(mut self, pattern: Regex) -> Self {
        self.rules.part_number = pattern;
        self
    }

    pub fn build(self) -> FormatRules {
        self.rules
    }
}

fn compile(field: &str, pattern: &str) -> ValidationResult<Regex> {
    Regex::new(pattern).map_err(|e| ValidationError::InvalidPattern {
        field: field.to_string(),
        reason: e.to_string(),
    })
}

// =============================================================================
// Scanned Data Classification
// =============================================================================

/// Warehouse entity a scanned code identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum EntityType {
    LicensePlate,
    Location,
    PartNumber,
}

/// Why a code matched none of the rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormatRejection {
    #[error("Code too short (minimum 6 characters)")]
    TooShort,

    #[error("Code too long (maximum 14 characters)")]
    TooLong,

    #[error("Contains invalid characters (only letters, numbers, and dashes allowed)")]
    InvalidCharacters,

    #[error("Unknown format")]
    Unknown,
}

/// Shortest code any default rule accepts.
pub const MIN_CODE_LEN: usize = 6;

/// Longest code any default rule accepts.
pub const MAX_CODE_LEN: usize = 14;

/// Trim + uppercase, the form every rule is matched against.
pub fn normalize_code(data: &str) -> String {
    data.trim().to_uppercase()
}

/// Classifies a scanned payload.
///
/// Rules are tried in order license plate, location, part number; the first
/// match wins, so an 8-character alphanumeric code is a license plate even
/// though it also fits the part-number rule.
pub fn validate_scanned_data(
    data: &str,
    rules: &FormatRules,
) -> Result<EntityType, FormatRejection> {
    let clean = normalize_code(data);

    if rules.license_plate.is_match(&clean) {
        return Ok(EntityType::LicensePlate);
    }
    if rules.location.is_match(&clean) {
        return Ok(EntityType::Location);
    }
    if rules.part_number.is_match(&clean) {
        return Ok(EntityType::PartNumber);
    }

    let len = clean.chars().count();
    let rejection = if len < MIN_CODE_LEN {
        FormatRejection::TooShort
    } else if len > MAX_CODE_LEN {
        FormatRejection::TooLong
    } else if !clean
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        FormatRejection::InvalidCharacters
    } else {
        FormatRejection::Unknown
    };

    Err(rejection)
}

// =============================================================================
// Entity Validators
// =============================================================================

/// License plate: 6-8 alphanumerics, optionally prefixed `PAL-`.
pub fn is_license_plate(data: &str) -> bool {
    RE_LICENSE_PLATE.is_match(&normalize_code(data))
}

/// Location: `LOC-` + 2-10 alphanumerics, or zone-aisle `A12-03`.
pub fn is_location(data: &str) -> bool {
    RE_LOCATION.is_match(&normalize_code(data))
}

/// Part number: 8-14 alphanumerics.
pub fn is_part_number(data: &str) -> bool {
    RE_PART_NUMBER.is_match(&normalize_code(data))
}

/// Carrier PRO number: 8-11 digits.
pub fn is_pro_number(data: &str) -> bool {
    RE_PRO_NUMBER.is_match(data.trim())
}

/// Order number: 6-12 alphanumerics, optionally prefixed `ORD-`, `SO-` or `PO-`.
pub fn is_order_number(data: &str) -> bool {
    RE_ORDER_NUMBER.is_match(&normalize_code(data))
}

// =============================================================================
// Display Formatting
// =============================================================================

/// Formats a scanned code for display.
///
/// | Entity        | Rule                                   | Example                    |
/// |---------------|----------------------------------------|----------------------------|
/// | LicensePlate  | 6 chars split 3-3                      | `ABC123` → `ABC-123`       |
/// | Location      | bare 2-10 alphanumerics get `LOC-`     | `A12` → `LOC-A12`          |
/// | PartNumber    | 8-12 chars grouped in fours            | `ABCDEFGHIJ` → `ABCD-EFGH-IJ` |
///
/// Anything else is returned normalized.
pub fn format_scanned_data(data: &str, entity: Option<EntityType>) -> String {
    let clean = normalize_code(data);
    let len = clean.chars().count();

    match entity {
        Some(EntityType::LicensePlate) if len == 6 => {
            let (head, tail) = split_chars(&clean, 3);
            format!("{}-{}", head, tail)
        }
        Some(EntityType::Location)
            if !clean.starts_with("LOC-") && RE_BARE_LOCATION.is_match(&clean) =>
        {
            format!("LOC-{}", clean)
        }
        Some(EntityType::PartNumber) if (8..=12).contains(&len) => clean
            .chars()
            .collect::<Vec<_>>()
            .chunks(4)
            .map(|chunk| chunk.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("-"),
        _ => clean,
    }
}

fn split_chars(s: &str, at: usize) -> (String, String) {
    let head = s.chars().take(at).collect();
    let tail = s.chars().skip(at).collect();
    (head, tail)
}

// =============================================================================
// Input Validators
// =============================================================================

/// Validates and normalizes a license plate typed or scanned by an operator.
pub fn validate_license_plate(license_plate: &str) -> ValidationResult<String> {
    let clean = normalize_code(license_plate);

    if clean.is_empty() {
        return Err(ValidationError::Required {
            field: "license_plate".to_string(),
        });
    }

    if !RE_LICENSE_PLATE.is_match(&clean) {
        return Err(ValidationError::InvalidFormat {
            field: "license_plate".to_string(),
            reason: "must be 6-8 letters or digits, optionally prefixed PAL-".to_string(),
        });
    }

    Ok(clean)
}

/// Validates an optional storage location. Blank means "not stored yet".
pub fn validate_location(location: Option<&str>) -> ValidationResult<Option<String>> {
    let clean = match location.map(normalize_code) {
        Some(clean) if !clean.is_empty() => clean,
        _ => return Ok(None),
    };

    if !RE_LOCATION.is_match(&clean) {
        return Err(ValidationError::InvalidFormat {
            field: "location".to_string(),
            reason: "must be LOC-XX or zone-aisle like A12-03".to_string(),
        });
    }

    Ok(Some(clean))
}

/// Validates an optional piece count.
pub fn validate_piece_count(count: Option<i64>) -> ValidationResult<()> {
    match count {
        Some(n) if n <= 0 => Err(ValidationError::MustBePositive {
            field: "piece_count".to_string(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(data: &str) -> Result<EntityType, FormatRejection> {
        validate_scanned_data(data, &FormatRules::default())
    }

    #[test]
    fn test_default_rules_classify_entities() {
        assert_eq!(classify("ABC123"), Ok(EntityType::LicensePlate));
        assert_eq!(classify(" abc12345 "), Ok(EntityType::LicensePlate));
        assert_eq!(classify("LOC-A1"), Ok(EntityType::Location));
        assert_eq!(classify("loc-zone0099"), Ok(EntityType::Location));
        assert_eq!(classify("ABCDE12345"), Ok(EntityType::PartNumber));
    }

    #[test]
    fn test_boundaries() {
        // license plate 6..=8, part number 8..=14
        assert_eq!(classify("ABCDEFGH"), Ok(EntityType::LicensePlate));
        assert_eq!(classify("ABCDEFGHI"), Ok(EntityType::PartNumber));
        assert_eq!(classify("ABCDEFGHIJKLMN"), Ok(EntityType::PartNumber));
        assert_eq!(classify("ABCDEFGHIJKLMNO"), Err(FormatRejection::TooLong));
        assert_eq!(classify("LOC-A"), Err(FormatRejection::TooShort));
        assert_eq!(classify("LOC-ABCDEFGHIJ"), Ok(EntityType::Location));
    }

    #[test]
    fn test_twelve_digit_code_is_part_number() {
        assert_eq!(classify("123456789012"), Ok(EntityType::PartNumber));
    }

    #[test]
    fn test_rejection_reasons() {
        assert_eq!(classify("AB1"), Err(FormatRejection::TooShort));
        assert_eq!(
            classify("ABC 1234"),
            Err(FormatRejection::InvalidCharacters)
        );
        assert_eq!(classify("AB-CD-EF"), Err(FormatRejection::Unknown));
        assert_eq!(
            FormatRejection::Unknown.to_string(),
            "Unknown format"
        );
        assert_eq!(
            FormatRejection::TooShort.to_string(),
            "Code too short (minimum 6 characters)"
        );
    }

    #[test]
    fn test_overridden_rules() {
        let rules = FormatRules::builder()
            .license_plate(Regex::new(r"^PAL-\d{6}$").unwrap())
            .build();

        assert_eq!(
            validate_scanned_data("pal-123456", &rules),
            Ok(EntityType::LicensePlate)
        );
        // ABC123 no longer a plate, and too short for a part number
        assert_eq!(
            validate_scanned_data("ABC123", &rules),
            Err(FormatRejection::Unknown)
        );
        // untouched rules keep their defaults
        assert_eq!(
            validate_scanned_data("LOC-B7", &rules),
            Ok(EntityType::Location)
        );
    }

    #[test]
    fn test_from_patterns() {
        let rules = FormatRules::from_patterns(None, Some(r"^BIN-\d+$"), None).unwrap();
        assert_eq!(
            validate_scanned_data("BIN-42", &rules),
            Ok(EntityType::Location)
        );

        let err = FormatRules::from_patterns(Some("(unclosed"), None, None).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidPattern { .. }));
    }

    #[test]
    fn test_entity_validators() {
        assert!(is_license_plate("PAL-ABC123"));
        assert!(is_license_plate("abc123"));
        assert!(!is_license_plate("PAL-AB"));

        assert!(is_location("LOC-A1"));
        assert!(is_location("a12-03"));
        assert!(!is_location("A1-03"));

        assert!(is_part_number("12345678"));
        assert!(!is_part_number("1234567"));

        assert!(is_pro_number(" 12345678 "));
        assert!(!is_pro_number("123456789012"));
        assert!(!is_pro_number("1234567A"));

        assert!(is_order_number("SO-123456"));
        assert!(is_order_number("ord-abc123"));
        assert!(!is_order_number("XX-123456"));
    }

    #[test]
    fn test_format_scanned_data() {
        assert_eq!(
            format_scanned_data("abc123", Some(EntityType::LicensePlate)),
            "ABC-123"
        );
        assert_eq!(
            format_scanned_data("ABC1234", Some(EntityType::LicensePlate)),
            "ABC1234"
        );
        assert_eq!(format_scanned_data("a12", Some(EntityType::Location)), "LOC-A12");
        assert_eq!(
            format_scanned_data("LOC-A12", Some(EntityType::Location)),
            "LOC-A12"
        );
        assert_eq!(
            format_scanned_data("ABCDEFGH", Some(EntityType::PartNumber)),
            "ABCD-EFGH"
        );
        assert_eq!(
            format_scanned_data("ABCDEFGHIJ", Some(EntityType::PartNumber)),
            "ABCD-EFGH-IJ"
        );
        assert_eq!(
            format_scanned_data("ABCDEFGHIJKLM", Some(EntityType::PartNumber)),
            "ABCDEFGHIJKLM"
        );
        assert_eq!(format_scanned_data(" mixed ", None), "MIXED");
    }

    #[test]
    fn test_validate_license_plate_input() {
        assert_eq!(validate_license_plate(" pal-abc123 ").unwrap(), "PAL-ABC123");
        assert!(matches!(
            validate_license_plate("  "),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            validate_license_plate("AB"),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_validate_location_input() {
        assert_eq!(validate_location(None).unwrap(), None);
        assert_eq!(validate_location(Some("   ")).unwrap(), None);
        assert_eq!(
            validate_location(Some("b07-12")).unwrap(),
            Some("B07-12".to_string())
        );
        assert!(validate_location(Some("dock door")).is_err());
    }

    #[test]
    fn test_validate_piece_count() {
        assert!(validate_piece_count(None).is_ok());
        assert!(validate_piece_count(Some(12)).is_ok());
        assert!(validate_piece_count(Some(0)).is_err());
    }

    #[test]
    fn test_built_in_patterns_compile() {
        let patterns = [
            &RE_DEFAULT_LICENSE_PLATE,
            &RE_DEFAULT_LOCATION,
            &RE_DEFAULT_PART_NUMBER,
            &RE_LICENSE_PLATE,
            &RE_LOCATION,
            &RE_PART_NUMBER,
            &RE_PRO_NUMBER,
            &RE_ORDER_NUMBER,
            &RE_BARE_LOCATION,
        ];
        for pattern in patterns {
            assert!(LazyLock::force(pattern).as_str().starts_with('^'));
        }
    }
}
