//! Human-readable formatting and unit-suffixed parsing
//!
//! Operators usually type and read frequencies with a unit (`2.4GHz`,
//! `915 MHz`); the wire always carries plain Hz.

use crate::error::ParseError;

/// Format a frequency in Hz with the largest sensible unit
pub fn format_frequency(hz: f64) -> String {
    let abs = hz.abs();
    if abs >= 1e9 {
        format!("{:.3} GHz", hz / 1e9)
    } else if abs >= 1e6 {
        format!("{:.3} MHz", hz / 1e6)
    } else if abs >= 1e3 {
        format!("{:.3} kHz", hz / 1e3)
    } else {
        format!("{:.0} Hz", hz)
    }
}

/// Format a bandwidth in Hz as MHz with one decimal
pub fn format_bandwidth(hz: f64) -> String {
    format!("{:.1} MHz", hz / 1e6)
}

/// Parse a frequency string, accepting `GHz`, `MHz`, `kHz` and `Hz` suffixes
///
/// Suffixes are case-insensitive; a bare number is taken as Hz.
pub fn parse_frequency(s: &str) -> Result<f64, ParseError> {
    parse_with_units(s, &[("ghz", 1e9), ("mhz", 1e6), ("khz", 1e3), ("hz", 1.0)])
}

/// Parse a bandwidth string, accepting `MHz`, `kHz` and `Hz` suffixes
pub fn parse_bandwidth(s: &str) -> Result<f64, ParseError> {
    parse_with_units(s, &[("mhz", 1e6), ("khz", 1e3), ("hz", 1.0)])
}

fn parse_with_units(s: &str, units: &[(&str, f64)]) -> Result<f64, ParseError> {
    let lower = s.trim().to_ascii_lowercase();

    let (number, scale) = units
        .iter()
        .find_map(|(suffix, scale)| lower.strip_suffix(suffix).map(|n| (n, *scale)))
        .unwrap_or((lower.as_str(), 1.0));

    let number = number.trim();
    if number.is_empty() {
        return Err(ParseError::InvalidNumber(s.to_string()));
    }

    match number.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value * scale),
        Ok(_) => Err(ParseError::InvalidNumber(s.to_string())),
        Err(_) if number.ends_with(|c: char| c.is_ascii_alphabetic()) => {
            Err(ParseError::InvalidUnit(s.to_string()))
        }
        Err(_) => Err(ParseError::InvalidNumber(s.to_string())),
    }
}
