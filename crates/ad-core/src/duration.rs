//! Go-style duration strings.
//!
//! Operators type cooldowns the way they would in a Go or systemd config:
//! a sequence of decimal numbers, each with an optional fraction and a
//! mandatory unit suffix.
//!
//! | Suffix | Unit |
//! |---|---|
//! | `ns` | nanoseconds |
//! | `us`, `µs` | microseconds |
//! | `ms` | milliseconds |
//! | `s` | seconds |
//! | `m` | minutes |
//! | `h` | hours |
//!
//! # Examples
//!
//! ```
//! use ad_core::{format_duration, parse_duration};
//! use std::time::Duration;
//!
//! assert_eq!(parse_duration("90s").ok(), Some(Duration::from_secs(90)));
//! assert_eq!(parse_duration("1h30m").ok(), Some(Duration::from_secs(5400)));
//! assert_eq!(format_duration(Duration::from_secs(90)), "1m30s");
//! ```

use std::fmt::Write;
use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Fraction digits beyond this are below nanosecond precision for every unit.
const MAX_FRACTION_DIGITS: usize = 18;

/// Errors produced while parsing a duration string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationError {
    /// The input was empty.
    #[error("empty duration")]
    Empty,

    /// The input is not a sequence of `<number><unit>` pairs.
    #[error("invalid duration \"{0}\"")]
    Invalid(String),

    /// A number was not followed by a unit.
    #[error("missing unit in duration \"{0}\"")]
    MissingUnit(String),

    /// A unit suffix was not recognized.
    #[error("unknown unit \"{unit}\" in duration \"{input}\"")]
    UnknownUnit {
        /// The unrecognized suffix.
        unit: String,
        /// The full input string.
        input: String,
    },

    /// The value does not fit in a [`Duration`].
    #[error("duration \"{0}\" is out of range")]
    Overflow(String),

    /// The value is negative or zero where a positive duration is required.
    #[error("duration \"{0}\" must be positive")]
    NotPositive(String),
}

/// Parses a Go-style duration string such as `"60s"`, `"2m"` or `"1.5h"`.
///
/// A bare `"0"` is accepted without a unit. Negative durations are rejected
/// with [`DurationError::NotPositive`] since [`Duration`] is unsigned.
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    if input.is_empty() {
        return Err(DurationError::Empty);
    }

    let (negative, mut rest) = match input.as_bytes()[0] {
        b'-' => (true, &input[1..]),
        b'+' => (false, &input[1..]),
        _ => (false, input),
    };

    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(DurationError::Invalid(input.to_owned()));
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (int_digits, after_int) = rest.split_at(int_len);

        let (frac_digits, after_number) = match after_int.strip_prefix('.') {
            Some(after_dot) => {
                let frac_len = after_dot.bytes().take_while(u8::is_ascii_digit).count();
                after_dot.split_at(frac_len)
            }
            None => ("", after_int),
        };

        if int_digits.is_empty() && frac_digits.is_empty() {
            return Err(DurationError::Invalid(input.to_owned()));
        }

        let unit_len = after_number
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(after_number.len());
        let (unit, remaining) = after_number.split_at(unit_len);
        rest = remaining;

        let unit_nanos = unit_in_nanos(unit, input)?;
        let value = component_nanos(int_digits, frac_digits, unit_nanos)
            .ok_or_else(|| DurationError::Overflow(input.to_owned()))?;
        total = total
            .checked_add(value)
            .ok_or_else(|| DurationError::Overflow(input.to_owned()))?;
    }

    if negative && total > 0 {
        return Err(DurationError::NotPositive(input.to_owned()));
    }

    let secs = u64::try_from(total / NANOS_PER_SEC)
        .map_err(|_| DurationError::Overflow(input.to_owned()))?;
    let nanos = u32::try_from(total % NANOS_PER_SEC)
        .map_err(|_| DurationError::Overflow(input.to_owned()))?;
    Ok(Duration::new(secs, nanos))
}

/// Parses a duration that must be strictly greater than zero.
///
/// Used for cooldown windows, where a zero window would disable debouncing.
pub fn parse_positive_duration(input: &str) -> Result<Duration, DurationError> {
    let duration = parse_duration(input)?;
    if duration.is_zero() {
        return Err(DurationError::NotPositive(input.to_owned()));
    }
    Ok(duration)
}

fn unit_in_nanos(unit: &str, input: &str) -> Result<u128, DurationError> {
    match unit {
        "" => Err(DurationError::MissingUnit(input.to_owned())),
        "ns" => Ok(1),
        "us" | "µs" | "μs" => Ok(1_000),
        "ms" => Ok(1_000_000),
        "s" => Ok(NANOS_PER_SEC),
        "m" => Ok(60 * NANOS_PER_SEC),
        "h" => Ok(3_600 * NANOS_PER_SEC),
        other => Err(DurationError::UnknownUnit {
            unit: other.to_owned(),
            input: input.to_owned(),
        }),
    }
}

fn component_nanos(int_digits: &str, frac_digits: &str, unit_nanos: u128) -> Option<u128> {
    let whole: u128 = if int_digits.is_empty() {
        0
    } else {
        int_digits.parse().ok()?
    };
    let mut value = whole.checked_mul(unit_nanos)?;

    if !frac_digits.is_empty() {
        let digits = &frac_digits[..frac_digits.len().min(MAX_FRACTION_DIGITS)];
        let frac: u128 = digits.parse().ok()?;
        let scale = 10u128.checked_pow(u32::try_from(digits.len()).ok()?)?;
        value = value.checked_add(frac * unit_nanos / scale)?;
    }

    Some(value)
}

/// Formats a duration the way Go's `time.Duration.String` does.
///
/// Sub-second values use the largest fitting unit (`"1.5ms"`), longer values
/// are rendered as hours, minutes and seconds (`"1h0m0s"`, `"1m30s"`).
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0s".to_owned();
    }
    if nanos < 1_000 {
        return format!("{nanos}ns");
    }
    if nanos < 1_000_000 {
        return format!("{}µs", with_fraction(nanos, 1_000));
    }
    if nanos < NANOS_PER_SEC {
        return format!("{}ms", with_fraction(nanos, 1_000_000));
    }

    let total_secs = duration.as_secs();
    let hours = total_secs / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let secs_nanos =
        u128::from(total_secs % 60) * NANOS_PER_SEC + u128::from(duration.subsec_nanos());

    let mut out = String::new();
    if hours > 0 {
        let _ = write!(out, "{hours}h{minutes}m");
    } else if minutes > 0 {
        let _ = write!(out, "{minutes}m");
    }
    let _ = write!(out, "{}s", with_fraction(secs_nanos, NANOS_PER_SEC));
    out
}

fn with_fraction(value: u128, unit: u128) -> String {
    let whole = value / unit;
    let frac = value % unit;
    if frac == 0 {
        return whole.to_string();
    }
    let width = unit.ilog10() as usize;
    let digits = format!("{frac:0width$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

/// Serde adapter storing a [`Duration`] as a Go-style string.
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use std::time::Duration;
///
/// #[derive(Serialize, Deserialize)]
/// struct Window {
///     #[serde(with = "ad_core::duration::serde_go")]
///     cooldown: Duration,
/// }
///
/// let window: Window = serde_json::from_str(r#"{"cooldown":"2m"}"#).unwrap();
/// assert_eq!(window.cooldown, Duration::from_secs(120));
/// ```
pub mod serde_go {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes a duration as a Go-style string.
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_duration(*duration))
    }

    /// Deserializes a duration from a Go-style string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
