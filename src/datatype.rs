//! ODF data type conversions (Boolean, Date, DateTime, Duration).
//!
//! Conversion utilities between ODF attribute text and Rust native types.
//! These back the typed attribute accessors, cell value decoding, and the
//! best-effort CSV field decoder.

use crate::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime};

// ============================================================================
// BOOLEAN CONVERSION
// ============================================================================

/// Boolean data type conversion utilities
///
/// Converts between ODF boolean format ("true"/"false") and Rust bool.
pub struct Boolean;

impl Boolean {
    /// Decode ODF boolean string to Rust bool
    ///
    /// # Examples
    ///
    /// ```
    /// use longan::datatype::Boolean;
    ///
    /// assert_eq!(Boolean::decode("true").unwrap(), true);
    /// assert_eq!(Boolean::decode("false").unwrap(), false);
    /// assert!(Boolean::decode("TRUE").is_err());
    /// ```
    pub fn decode(data: &str) -> Result<bool> {
        match data {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(Error::Decode(format!(
                "boolean '{}' is invalid, expected 'true' or 'false'",
                data
            ))),
        }
    }

    /// Encode Rust bool to ODF boolean string
    #[inline]
    pub fn encode(value: bool) -> &'static str {
        if value { "true" } else { "false" }
    }
}

// ============================================================================
// DATE CONVERSION
// ============================================================================

/// Date data type conversion utilities
///
/// Converts between ODF date format (ISO 8601: "YYYY-MM-DD") and
/// `chrono::NaiveDate`.
pub struct Date;

impl Date {
    /// Decode ODF date string to `chrono::NaiveDate`
    ///
    /// # Examples
    ///
    /// ```
    /// use longan::datatype::Date;
    /// use chrono::NaiveDate;
    ///
    /// let date = Date::decode("2024-01-31").unwrap();
    /// assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
    /// ```
    pub fn decode(data: &str) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(data, "%Y-%m-%d")
            .map_err(|e| Error::Decode(format!("failed to parse ODF date '{}': {}", data, e)))
    }

    /// Encode `chrono::NaiveDate` to ODF date string
    #[inline]
    pub fn encode(value: &NaiveDate) -> String {
        value.format("%Y-%m-%d").to_string()
    }
}

// ============================================================================
// DATETIME CONVERSION
// ============================================================================

/// DateTime data type conversion utilities
///
/// Converts between ODF datetime format (ISO 8601, "T" separator) and
/// `chrono::NaiveDateTime`. ODF `office:date-value` carries a datetime
/// exactly when the text contains a "T"; cell decoding relies on that
/// distinction to pick [`Date`] or [`DateTime`].
pub struct DateTime;

impl DateTime {
    /// Decode ODF datetime string to `chrono::NaiveDateTime`
    ///
    /// Accepts plain ISO 8601 datetimes with optional fractional seconds,
    /// and full RFC 3339 timestamps whose offset is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use longan::datatype::DateTime;
    ///
    /// let dt = DateTime::decode("2024-01-31T15:30:00").unwrap();
    /// assert_eq!(dt.to_string(), "2024-01-31 15:30:00");
    /// ```
    pub fn decode(data: &str) -> Result<NaiveDateTime> {
        if let Ok(dt) = NaiveDateTime::parse_from_str(data, "%Y-%m-%dT%H:%M:%S%.f") {
            return Ok(dt);
        }

        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(data) {
            return Ok(dt.naive_local());
        }

        Err(Error::Decode(format!(
            "failed to parse ODF datetime '{}'",
            data
        )))
    }

    /// Encode `chrono::NaiveDateTime` to ODF datetime string
    #[inline]
    pub fn encode(value: &NaiveDateTime) -> String {
        value.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

// ============================================================================
// DURATION CONVERSION
// ============================================================================

/// Duration data type conversion utilities
///
/// Converts between ODF duration format (ISO 8601: "PT1H30M") and
/// `chrono::Duration`. This is the representation of `office:time-value`.
pub struct Duration;

impl Duration {
    /// Decode ODF duration string to `chrono::Duration`
    ///
    /// Supports day and time components (e.g., "PT1H30M", "P1DT2H", "-PT5M").
    /// Month and year components have no fixed length in seconds and are
    /// rejected.
    ///
    /// # Examples
    ///
    /// ```
    /// use longan::datatype::Duration;
    ///
    /// let dur = Duration::decode("PT1H30M").unwrap();
    /// assert_eq!(dur, chrono::Duration::minutes(90));
    /// ```
    pub fn decode(data: &str) -> Result<chrono::Duration> {
        let (sign, data) = if let Some(rest) = data.strip_prefix('-') {
            (-1, rest)
        } else {
            (1, data)
        };

        let body = data.strip_prefix('P').ok_or_else(|| {
            Error::Decode(format!(
                "invalid duration '{}', must start with 'P'",
                data
            ))
        })?;

        let mut days = 0i64;
        let mut hours = 0i64;
        let mut minutes = 0i64;
        let mut seconds = 0i64;

        let mut buffer = String::new();
        let mut in_time = false;
        let mut saw_component = false;

        for c in body.chars() {
            match c {
                '0'..='9' => buffer.push(c),
                'T' => {
                    if buffer.is_empty() {
                        in_time = true;
                    } else {
                        return Err(Error::Decode(format!(
                            "misplaced 'T' in duration '{}'",
                            data
                        )));
                    }
                },
                'D' | 'H' | 'M' | 'S' => {
                    let n: i64 = buffer.parse().map_err(|_| {
                        Error::Decode(format!("invalid component in duration '{}'", data))
                    })?;
                    buffer.clear();
                    saw_component = true;
                    match (c, in_time) {
                        ('D', false) => days = n,
                        ('H', true) => hours = n,
                        ('M', true) => minutes = n,
                        ('S', true) => seconds = n,
                        ('M', false) => {
                            // Months have no fixed second count
                            return Err(Error::Decode(format!(
                                "months not supported in duration '{}'",
                                data
                            )));
                        },
                        _ => {
                            return Err(Error::Decode(format!(
                                "misplaced component '{}' in duration '{}'",
                                c, data
                            )));
                        },
                    }
                },
                _ => {
                    return Err(Error::Decode(format!(
                        "invalid character '{}' in duration '{}'",
                        c, data
                    )));
                },
            }
        }

        if !saw_component || !buffer.is_empty() {
            return Err(Error::Decode(format!("truncated duration '{}'", data)));
        }

        let total_seconds = days
            .checked_mul(86400)
            .and_then(|total| total.checked_add(hours.checked_mul(3600)?))
            .and_then(|total| total.checked_add(minutes.checked_mul(60)?))
            .and_then(|total| total.checked_add(seconds))
            .ok_or_else(|| Error::Decode(format!("duration '{}' out of range", data)))?;
        chrono::Duration::try_seconds(sign * total_seconds)
            .ok_or_else(|| Error::Decode(format!("duration '{}' out of range", data)))
    }

    /// Encode `chrono::Duration` to ODF duration string
    ///
    /// # Examples
    ///
    /// ```
    /// use longan::datatype::Duration;
    ///
    /// assert_eq!(Duration::encode(&chrono::Duration::minutes(90)), "PT1H30M0S");
    /// ```
    pub fn encode(value: &chrono::Duration) -> String {
        let total_seconds = value.num_seconds();
        let (sign, abs_seconds) = if total_seconds < 0 {
            ("-", -total_seconds)
        } else {
            ("", total_seconds)
        };

        let hours = abs_seconds / 3600;
        let minutes = (abs_seconds % 3600) / 60;
        let seconds = abs_seconds % 60;

        format!("{}PT{}H{}M{}S", sign, hours, minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_decode() {
        assert_eq!(Boolean::decode("true").unwrap(), true);
        assert_eq!(Boolean::decode("false").unwrap(), false);
        assert!(Boolean::decode("invalid").is_err());
        assert!(Boolean::decode("TRUE").is_err());
        assert!(Boolean::decode("1").is_err());
    }

    #[test]
    fn test_boolean_encode() {
        assert_eq!(Boolean::encode(true), "true");
        assert_eq!(Boolean::encode(false), "false");
    }

    #[test]
    fn test_date_decode() {
        let date = Date::decode("2024-01-31").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());

        assert!(Date::decode("invalid").is_err());
        assert!(Date::decode("2024-13-01").is_err()); // Invalid month
    }

    #[test]
    fn test_date_encode() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(Date::encode(&date), "2024-01-31");
    }

    #[test]
    fn test_datetime_decode() {
        let dt = DateTime::decode("2024-01-31T15:30:00").unwrap();
        assert_eq!(DateTime::encode(&dt), "2024-01-31T15:30:00");

        // Fractional seconds are accepted and truncated on re-encode
        let dt = DateTime::decode("2024-01-31T15:30:00.25").unwrap();
        assert_eq!(DateTime::encode(&dt), "2024-01-31T15:30:00");

        // RFC 3339 offset is dropped
        let dt = DateTime::decode("2024-01-31T15:30:00+01:00").unwrap();
        assert_eq!(DateTime::encode(&dt), "2024-01-31T15:30:00");

        assert!(DateTime::decode("2024-01-31").is_err());
    }

    #[test]
    fn test_duration_decode() {
        assert_eq!(
            Duration::decode("PT1H30M").unwrap(),
            chrono::Duration::minutes(90)
        );
        assert_eq!(Duration::decode("P1D").unwrap(), chrono::Duration::days(1));
        assert_eq!(
            Duration::decode("-PT5M").unwrap(),
            chrono::Duration::minutes(-5)
        );
        assert_eq!(
            Duration::decode("P1DT2H30M15S").unwrap(),
            chrono::Duration::days(1)
                + chrono::Duration::hours(2)
                + chrono::Duration::minutes(30)
                + chrono::Duration::seconds(15)
        );

        assert!(Duration::decode("PT").is_err());
        assert!(Duration::decode("P1M").is_err()); // Months unsupported
        assert!(Duration::decode("PT5").is_err()); // Dangling digits
        assert!(Duration::decode("5M").is_err()); // Missing 'P'
    }

    #[test]
    fn test_duration_encode() {
        assert_eq!(
            Duration::encode(&chrono::Duration::minutes(90)),
            "PT1H30M0S"
        );
        assert_eq!(
            Duration::encode(&chrono::Duration::minutes(-5)),
            "-PT0H5M0S"
        );
        assert_eq!(
            Duration::encode(&(chrono::Duration::days(1) + chrono::Duration::hours(2))),
            "PT26H0M0S"
        );
    }

    #[test]
    fn test_duration_round_trip() {
        for seconds in [0i64, 1, 59, 60, 3599, 3600, 86400, 90061] {
            let dur = chrono::Duration::seconds(seconds);
            assert_eq!(Duration::decode(&Duration::encode(&dur)).unwrap(), dur);
        }
    }

    #[test]
    fn test_duration_decode_out_of_range() {
        // Component totals that no chrono::Duration can represent must come
        // back as decode errors, never arithmetic faults.
        assert!(Duration::decode("PT9223372036854775807S").is_err());
        assert!(Duration::decode("-PT9223372036854775807S").is_err());
        assert!(Duration::decode("P999999999999999999D").is_err());
        assert!(Duration::decode("P106751991167300DT24H").is_err());

        // The largest representable second count still decodes.
        assert_eq!(
            Duration::decode("PT9223372036854775S").unwrap(),
            chrono::Duration::seconds(9_223_372_036_854_775)
        );
    }
}
