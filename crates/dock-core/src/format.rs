//! Symbology heuristics.
//!
//! The decoders we drive report the payload but not the symbology, so the
//! format attached to a [`ScanResult`](crate::ScanResult) is a guess made
//! from the payload's shape. Callers that need a strict symbology should
//! filter with [`ScanRequest::formats`](crate::ScanRequest::formats) rather
//! than trust the guess.

use crate::types::BarcodeFormat;

/// Guesses the symbology of a raw decoded payload.
///
/// ## Rules (in order)
/// 1. `LOC-` prefix → QR_CODE (location labels are printed as QR)
/// 2. 12+ ASCII digits → EAN_13
/// 3. 6+ characters of `[A-Z0-9]` → CODE_128
/// 4. anything else → QR_CODE
///
/// The payload is not normalized: lowercase text never classifies as
/// CODE_128.
pub fn detect_format(data: &str) -> BarcodeFormat {
    let len = data.chars().count();

    if data.starts_with("LOC-") {
        return BarcodeFormat::QrCode;
    }
    if len >= 12 && is_digits(data) {
        return BarcodeFormat::Ean13;
    }
    if len >= 6 && is_upper_alnum(data) {
        return BarcodeFormat::Code128;
    }

    BarcodeFormat::QrCode
}

/// Proposes every symbology the (trimmed, uppercased) payload could have
/// been printed in.
///
/// Each check is independent, so a payload can yield several suggestions.
/// Order: QR_CODE (structured payloads), EAN_13, EAN_8, UPC_A, UPC_E,
/// CODE_128, CODE_39. Falls back to `[QR_CODE]`.
///
/// ```rust
/// use dock_core::format::suggest_formats;
/// use dock_core::BarcodeFormat;
///
/// let suggestions = suggest_formats("123456789012");
/// assert!(suggestions.contains(&BarcodeFormat::UpcA));
/// ```
pub fn suggest_formats(data: &str) -> Vec<BarcodeFormat> {
    let clean = data.trim().to_uppercase();
    let len = clean.chars().count();
    let digits = !clean.is_empty() && is_digits(&clean);
    let mut suggestions = Vec::new();

    if clean.contains('-') || clean.contains("://") || len > 50 {
        suggestions.push(BarcodeFormat::QrCode);
    }
    if digits && len == 13 {
        suggestions.push(BarcodeFormat::Ean13);
    }
    if digits && len == 8 {
        suggestions.push(BarcodeFormat::Ean8);
    }
    if digits && len == 12 {
        suggestions.push(BarcodeFormat::UpcA);
    }
    if digits && (6..=8).contains(&len) {
        suggestions.push(BarcodeFormat::UpcE);
    }
    if (6..=12).contains(&len) && is_upper_alnum(&clean) {
        suggestions.push(BarcodeFormat::Code128);
    }
    if !clean.is_empty() && clean.chars().all(is_code39_char) {
        suggestions.push(BarcodeFormat::Code39);
    }

    if suggestions.is_empty() {
        suggestions.push(BarcodeFormat::QrCode);
    }

    suggestions
}

fn is_digits(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_digit())
}

fn is_upper_alnum(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

// CODE 39 alphabet: A-Z 0-9 - . space $ / + %
fn is_code39_char(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | ' ' | '$' | '/' | '+' | '%')
}

#[cfg(test)]
mod tests {
    use super::*;
    use BarcodeFormat::*;

    #[test]
    fn test_detect_format_rules() {
        assert_eq!(detect_format("LOC-A12"), QrCode);
        assert_eq!(detect_format("4006381333931"), Ean13);
        assert_eq!(detect_format("123456789012"), Ean13);
        assert_eq!(detect_format("ABC123"), Code128);
        assert_eq!(detect_format("12345"), QrCode);
        assert_eq!(detect_format("https://example.com/p/1"), QrCode);
    }

    #[test]
    fn test_detect_format_is_case_sensitive() {
        assert_eq!(detect_format("abc123"), QrCode);
        assert_eq!(detect_format("ABC123"), Code128);
    }

    #[test]
    fn test_detect_short_digits_as_code128() {
        // 6..=11 digits are not EAN_13 but are [A-Z0-9]+
        assert_eq!(detect_format("12345678"), Code128);
    }

    #[test]
    fn test_suggest_upc_a() {
        assert_eq!(suggest_formats("123456789012"), vec![UpcA, Code128, Code39]);
    }

    #[test]
    fn test_suggest_ean_13() {
        assert_eq!(suggest_formats("4006381333931"), vec![Ean13, Code39]);
    }

    #[test]
    fn test_suggest_eight_digits() {
        assert_eq!(
            suggest_formats("12345678"),
            vec![Ean8, UpcE, Code128, Code39]
        );
    }

    #[test]
    fn test_suggest_structured_payload() {
        assert_eq!(suggest_formats("LOC-A12"), vec![QrCode, Code39]);
        assert_eq!(suggest_formats("https://x.io/a"), vec![QrCode]);
        assert_eq!(suggest_formats(&"A".repeat(51)), vec![QrCode, Code39]);
    }

    #[test]
    fn test_suggest_normalizes_input() {
        assert_eq!(suggest_formats("  abc123 "), vec![Code128, Code39]);
    }

    #[test]
    fn test_suggest_falls_back_to_qr() {
        assert_eq!(suggest_formats("{\"sku\":1}"), vec![QrCode]);
        assert_eq!(suggest_formats(""), vec![QrCode]);
    }
}
