use anyhow::{anyhow, Result};
use chrono::{NaiveDate, Utc};
use sha2::{Digest, Sha256};

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

pub fn sha256_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

pub fn format_decimal(value: f64) -> String {
    format!("{:.2}", value)
}

pub fn parse_decimal(value: &str) -> Result<f64> {
    value
        .trim()
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|e| anyhow!("Parse decimal: {}", e))
}

/// Lenient date parsing for text found in templates and on the command line.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let raw = value.trim();
    if raw.is_empty() {
        return None;
    }

    let formats = ["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y", "%Y/%m/%d", "%Y.%m.%d", "%d.%m.%y"];
    for fmt in formats.iter() {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date);
        }
    }
    // Timestamps such as "2026-04-01T00:00:00Z" carry the date up front.
    raw.get(..10)
        .filter(|_| raw.len() > 10)
        .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_date_forms() {
        let expected = NaiveDate::from_ymd_opt(2026, 4, 1);
        for raw in ["2026-04-01", "01.04.2026", "01/04/2026", " 2026/04/01 ", "2026-04-01T00:00:00.000Z"] {
            assert_eq!(parse_date(raw), expected, "{raw}");
        }
        assert_eq!(parse_date("Total"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn decimals_accept_comma() {
        assert_eq!(parse_decimal("7,5").unwrap(), 7.5);
        assert!(parse_decimal("abc").is_err());
        assert_eq!(format_decimal(11000.0), "11000.00");
    }

    #[test]
    fn hashes_bytes() {
        assert_eq!(
            sha256_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
