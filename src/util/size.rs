use crate::error::ParseError;
use serde::Serialize;
use std::ops::Add;

/// A memory quantity normalized to KiB, the probe's native unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct SizeQuantity {
    kib: f64,
}

impl SizeQuantity {
    pub const ZERO: SizeQuantity = SizeQuantity { kib: 0.0 };

    pub fn from_kib(kib: f64) -> Self {
        Self { kib }
    }

    pub fn kib(&self) -> f64 {
        self.kib
    }

    pub fn is_zero(&self) -> bool {
        self.kib == 0.0
    }
}

impl Add for SizeQuantity {
    type Output = SizeQuantity;

    fn add(self, rhs: SizeQuantity) -> SizeQuantity {
        SizeQuantity { kib: self.kib + rhs.kib }
    }
}

/// Multiplier from `unit` to KiB. `None` for a unit we don't know.
fn unit_factor(unit: &str) -> Option<f64> {
    match unit.to_ascii_lowercase().as_str() {
        "b" | "bytes"       => Some(1.0 / 1024.0),
        "k" | "kb" | "kib"  => Some(1.0),
        "m" | "mb" | "mib"  => Some(1024.0),
        "g" | "gb" | "gib"  => Some(1024.0 * 1024.0),
        "t" | "tb" | "tib"  => Some(1024.0 * 1024.0 * 1024.0),
        _                   => None,
    }
}

/// Parse a probe size string like `"65856344 KiB"` or `"2048 KB"`.
///
/// The leading whitespace-delimited token must be a number. An unknown or
/// absent unit is taken as KiB so that schema drift in the probe does not
/// drop a host; only a bad magnitude is an error.
pub fn parse_size(field: &str, raw: &str) -> Result<SizeQuantity, ParseError> {
    let mut parts = raw.split_whitespace();
    let magnitude: f64 = parts
        .next()
        .and_then(|tok| tok.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| ParseError::new(field, raw))?;

    let factor = match parts.next() {
        Some(unit) => unit_factor(unit).unwrap_or_else(|| {
            tracing::debug!(field, unit, "unrecognized size unit, assuming KiB");
            1.0
        }),
        None => 1.0,
    };
    Ok(SizeQuantity::from_kib(magnitude * factor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kilobytes_are_base_unit() {
        let q = parse_size("Max memory", "2048 KB").expect("size");
        assert_eq!(q.kib(), 2048.0);

        let q = parse_size("Max memory", "65856344 KiB").expect("size");
        assert_eq!(q.kib(), 65_856_344.0);
    }

    #[test]
    fn larger_units_are_normalized() {
        assert_eq!(parse_size("m", "4 GiB").expect("size").kib(), 4_194_304.0);
        assert_eq!(parse_size("m", "1.5   MB").expect("size").kib(), 1536.0);
        assert_eq!(parse_size("m", "1024 bytes").expect("size").kib(), 1.0);
    }

    #[test]
    fn unknown_or_missing_unit_passes_through() {
        assert_eq!(parse_size("m", "512 pages").expect("size").kib(), 512.0);
        assert_eq!(parse_size("m", "512").expect("size").kib(), 512.0);
    }

    #[test]
    fn non_numeric_magnitude_is_rejected() {
        let err = parse_size("Max memory", "abc KB").expect_err("bad magnitude");
        assert_eq!(err.field, "Max memory");
        assert_eq!(err.raw, "abc KB");

        assert!(parse_size("m", "").is_err());
        assert!(parse_size("m", "2048KB").is_err());
        assert!(parse_size("m", "-4 KiB").is_err());
    }
}
