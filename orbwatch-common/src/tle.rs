//! Fixed-column two-line element format helpers.
//!
//! Column numbers in the docs are 1-based, as in the format definition.
//! All slicing goes through [`field`] so that short or non-ASCII lines
//! produce an error instead of a panic.

use chrono::{DateTime, Duration, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

/// Line 1 begins with this token
pub const LINE_ONE_MARKER: &str = "1 ";
/// Line 2 begins with this token
pub const LINE_TWO_MARKER: &str = "2 ";

/// Earth gravitational parameter (km^3/s^2)
pub const MU_EARTH_KM3_S2: f64 = 398_600.4418;
/// Earth equatorial radius (km)
pub const EARTH_RADIUS_KM: f64 = 6_378.137;
pub const SECONDS_PER_DAY: f64 = 86_400.0;

static DRAG_MANTISSA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([ +\-]?)(\d+)$").expect("static regex"));

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FeatureError {
    #[error("line too short for columns {start}-{end}")]
    MissingColumns { start: usize, end: usize },
    #[error("invalid {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },
}

pub fn is_line_one(line: &str) -> bool {
    line.starts_with(LINE_ONE_MARKER)
}

pub fn is_line_two(line: &str) -> bool {
    line.starts_with(LINE_TWO_MARKER)
}

/// Columns `start..=end` (1-based, inclusive), trimmed.
fn field(line: &str, start: usize, end: usize) -> Result<&str, FeatureError> {
    line.get(start - 1..end)
        .map(str::trim)
        .ok_or(FeatureError::MissingColumns { start, end })
}

fn parse_f64(line: &str, start: usize, end: usize, name: &'static str) -> Result<f64, FeatureError> {
    let raw = field(line, start, end)?;
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| FeatureError::InvalidField {
            field: name,
            value: raw.to_string(),
        })
}

/// Catalog number from line 1, columns 3-7.
///
/// Accepts the Alpha-5 form where a leading letter (I and O excluded)
/// stands for 10..=33 ten-thousands.
pub fn catalog_number(line1: &str) -> Result<u32, FeatureError> {
    let raw = field(line1, 3, 7)?;
    let invalid = || FeatureError::InvalidField {
        field: "catalog number",
        value: raw.to_string(),
    };

    let mut chars = raw.chars();
    let first = chars.next().ok_or_else(invalid)?;
    if first.is_ascii_digit() {
        return raw.parse::<u32>().map_err(|_| invalid());
    }

    let upper = first.to_ascii_uppercase();
    if !upper.is_ascii_uppercase() || upper == 'I' || upper == 'O' {
        return Err(invalid());
    }
    let mut prefix = 10 + (upper as u32 - 'A' as u32);
    if upper > 'I' {
        prefix -= 1;
    }
    if upper > 'O' {
        prefix -= 1;
    }
    let rest = chars.as_str();
    if rest.len() != 4 || !rest.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let rest: u32 = rest.parse().map_err(|_| invalid())?;
    Ok(prefix * 10_000 + rest)
}

/// B* drag term from line 1, columns 54-61.
///
/// The mantissa (54-59) carries an implied leading decimal point, the
/// exponent (60-61) is a signed power of ten.
pub fn drag_term(line1: &str) -> Result<f64, FeatureError> {
    let mantissa = field(line1, 54, 59)?;
    let exponent = field(line1, 60, 61)?;

    let caps = DRAG_MANTISSA
        .captures(mantissa)
        .ok_or_else(|| FeatureError::InvalidField {
            field: "drag term",
            value: mantissa.to_string(),
        })?;
    let sign = if &caps[1] == "-" { -1.0 } else { 1.0 };
    let digits = &caps[2];
    let value: f64 = format!("0.{}", digits)
        .parse()
        .map_err(|_| FeatureError::InvalidField {
            field: "drag term",
            value: mantissa.to_string(),
        })?;
    let exponent: i32 = exponent.parse().map_err(|_| FeatureError::InvalidField {
        field: "drag term exponent",
        value: exponent.to_string(),
    })?;

    Ok(sign * value * 10f64.powi(exponent))
}

/// Element set epoch from line 1, columns 19-32.
///
/// The day of year must lie in `[1, 367)`.
pub fn epoch(line1: &str) -> Result<DateTime<Utc>, FeatureError> {
    let year: i32 = field(line1, 19, 20)?
        .parse()
        .map_err(|_| FeatureError::InvalidField {
            field: "epoch year",
            value: line1.get(18..20).unwrap_or_default().to_string(),
        })?;
    let day_of_year = parse_f64(line1, 21, 32, "epoch day")?;
    let bad_day = || FeatureError::InvalidField {
        field: "epoch day",
        value: line1.get(20..32).unwrap_or_default().trim().to_string(),
    };
    if !(1.0..367.0).contains(&day_of_year) {
        return Err(bad_day());
    }
    let full_year = if year >= 57 { 1900 + year } else { 2000 + year };

    let jan1 = Utc
        .with_ymd_and_hms(full_year, 1, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| FeatureError::InvalidField {
            field: "epoch year",
            value: year.to_string(),
        })?;
    let micros = ((day_of_year - 1.0) * SECONDS_PER_DAY * 1e6).round() as i64;
    jan1.checked_add_signed(Duration::microseconds(micros)).ok_or_else(bad_day)
}

/// The four classifier inputs, in their fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub inclination_deg: f64,
    pub eccentricity: f64,
    pub mean_motion_rev_per_day: f64,
    pub drag_term: f64,
}

impl FeatureVector {
    pub fn from_lines(line1: &str, line2: &str) -> Result<Self, FeatureError> {
        let inclination_deg = parse_f64(line2, 9, 16, "inclination")?;

        let ecc_digits = field(line2, 27, 33)?;
        if ecc_digits.is_empty() || !ecc_digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(FeatureError::InvalidField {
                field: "eccentricity",
                value: ecc_digits.to_string(),
            });
        }
        let eccentricity: f64 = format!("0.{}", ecc_digits)
            .parse()
            .map_err(|_| FeatureError::InvalidField {
                field: "eccentricity",
                value: ecc_digits.to_string(),
            })?;

        let mean_motion_rev_per_day = parse_f64(line2, 53, 63, "mean motion")?;
        let drag_term = drag_term(line1)?;

        Ok(Self {
            inclination_deg,
            eccentricity,
            mean_motion_rev_per_day,
            drag_term,
        })
    }

    pub fn as_array(&self) -> [f64; 4] {
        [
            self.inclination_deg,
            self.eccentricity,
            self.mean_motion_rev_per_day,
            self.drag_term,
        ]
    }
}

/// Semi-major axis (km) from mean motion (rev/day).
pub fn semi_major_axis_km(mean_motion_rev_per_day: f64) -> Option<f64> {
    if !mean_motion_rev_per_day.is_finite() || mean_motion_rev_per_day <= 0.0 {
        return None;
    }
    let n_rad_s = mean_motion_rev_per_day * std::f64::consts::TAU / SECONDS_PER_DAY;
    Some((MU_EARTH_KM3_S2 / (n_rad_s * n_rad_s)).cbrt())
}

/// Mean altitude above the equatorial radius (km).
pub fn mean_altitude_km(mean_motion_rev_per_day: f64) -> Option<f64> {
    semi_major_axis_km(mean_motion_rev_per_day).map(|a| a - EARTH_RADIUS_KM)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    const ISS_L1: &str = "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927";
    const ISS_L2: &str = "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";

    #[test]
    fn test_markers() {
        assert!(is_line_one(ISS_L1));
        assert!(is_line_two(ISS_L2));
        assert!(!is_line_one(ISS_L2));
        assert!(!is_line_one("12345"));
    }

    #[test]
    fn test_catalog_number() {
        assert_eq!(catalog_number(ISS_L1), Ok(25544));
        assert_eq!(catalog_number("1 A0001U 98067A"), Ok(100_001));
        assert_eq!(catalog_number("1 J1234U 98067A"), Ok(181_234));
        assert_eq!(catalog_number("1 Z9999U 98067A"), Ok(339_999));
        assert!(catalog_number("1 I0001U").is_err());
        assert!(catalog_number("1 ").is_err());
    }

    #[test]
    fn test_features_from_iss() {
        let f = FeatureVector::from_lines(ISS_L1, ISS_L2).unwrap();
        assert!((f.inclination_deg - 51.6416).abs() < 1e-9);
        assert!((f.eccentricity - 0.0006703).abs() < 1e-12);
        assert!((f.mean_motion_rev_per_day - 15.72125391).abs() < 1e-9);
        assert!((f.drag_term - (-1.1606e-5)).abs() < 1e-15);
    }

    #[test]
    fn test_features_short_line_is_error_not_panic() {
        assert!(FeatureVector::from_lines(ISS_L1, "2 25544  51.64").is_err());
        assert!(FeatureVector::from_lines("1 25544U", ISS_L2).is_err());
        assert!(FeatureVector::from_lines(ISS_L1, "2 ééééééééééééééééééééééééééééééééé").is_err());
    }

    #[test]
    fn test_drag_term_positive_and_zero() {
        let l1 = "1 25544U 98067A   08264.51782528 -.00002182  00000-0  34123-3 0  2927";
        assert!((drag_term(l1).unwrap() - 0.34123e-3).abs() < 1e-15);
        let l1 = "1 25544U 98067A   08264.51782528 -.00002182  00000-0  00000+0 0  2927";
        assert_eq!(drag_term(l1).unwrap(), 0.0);
    }

    #[test]
    fn test_epoch() {
        let e = epoch(ISS_L1).unwrap();
        assert_eq!(e.format("%Y-%m-%d").to_string(), "2008-09-20");
        assert_eq!((e.hour(), e.minute(), e.second()), (12, 25, 40));
    }

    #[test]
    fn test_epoch_out_of_range_day_is_error() {
        let huge = "1 25544U 98067A   08999999999999 -.00002182  00000-0 -11606-4 0  2927";
        assert!(matches!(epoch(huge), Err(FeatureError::InvalidField { field: "epoch day", .. })));
        let zero = "1 25544U 98067A   08000.00000000 -.00002182  00000-0 -11606-4 0  2927";
        assert!(epoch(zero).is_err());
    }

    #[test]
    fn test_altitude() {
        let alt = mean_altitude_km(15.72125391).unwrap();
        assert!(alt > 300.0 && alt < 400.0, "alt = {}", alt);
        let geo = mean_altitude_km(1.0027).unwrap();
        assert!((geo - 35_786.0).abs() < 50.0, "geo = {}", geo);
        assert_eq!(mean_altitude_km(0.0), None);
        assert_eq!(mean_altitude_km(f64::NAN), None);
    }
}
