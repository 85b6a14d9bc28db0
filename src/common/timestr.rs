//! Human timeout strings such as `"60 seconds"` or `"1 min 30 s"`

use std::time::Duration;

use super::{Error, Result};

/// Timeout used when a keyword does not give one
pub const DEFAULT_TIMEOUT: &str = "60 seconds";

/// Parse a timeout string into a duration
///
/// Accepts a bare number of seconds (`"1.5"`) or any sequence of
/// number/unit pairs (`"1 minute 30 seconds"`, `"2s"`, `"500 ms"`).
/// Whitespace and case are ignored.
pub fn parse_timeout(input: &str) -> Result<Duration> {
    let compact: String = input
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    let invalid = || Error::InvalidTimeout(input.to_string());

    if compact.is_empty() {
        return Err(invalid());
    }
    if let Ok(secs) = compact.parse::<f64>() {
        return to_duration(secs).ok_or_else(invalid);
    }

    let is_number = |c: char| c.is_ascii_digit() || c == '.';
    let mut total = 0.0;
    let mut rest = compact.as_str();

    while !rest.is_empty() {
        let number_end = rest.find(|c: char| !is_number(c)).unwrap_or(rest.len());
        if number_end == 0 {
            return Err(invalid());
        }
        let value: f64 = rest[..number_end].parse().map_err(|_| invalid())?;
        rest = &rest[number_end..];

        let unit_end = rest.find(is_number).unwrap_or(rest.len());
        let scale = unit_scale(&rest[..unit_end]).ok_or_else(invalid)?;
        rest = &rest[unit_end..];

        total += value * scale;
    }

    to_duration(total).ok_or_else(invalid)
}

fn unit_scale(unit: &str) -> Option<f64> {
    let scale = match unit {
        "d" | "day" | "days" => 86_400.0,
        "h" | "hour" | "hours" => 3_600.0,
        "m" | "min" | "mins" | "minute" | "minutes" => 60.0,
        "" | "s" | "sec" | "secs" | "second" | "seconds" => 1.0,
        "ms" | "millis" | "millisecond" | "milliseconds" => 0.001,
        _ => return None,
    };
    Some(scale)
}

fn to_duration(secs: f64) -> Option<Duration> {
    (secs.is_finite() && secs >= 0.0).then(|| Duration::from_secs_f64(secs))
}
