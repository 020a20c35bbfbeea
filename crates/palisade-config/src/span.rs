//! Human-readable time spans (`"90s"`, `"1h"`, `"7d"`).

use std::time::Duration;

const SECOND: f64 = 1_000.0;
const MINUTE: f64 = SECOND * 60.0;
const HOUR: f64 = MINUTE * 60.0;
const DAY: f64 = HOUR * 24.0;
const WEEK: f64 = DAY * 7.0;
const YEAR: f64 = DAY * 365.25;

/// Parses a time span.
///
/// A bare number is a count of seconds. Otherwise the number (which may be
/// fractional) is followed by an optional space and a unit: `ms`, `s`, `m`,
/// `h`, `d`, `w` or `y`, or one of their long forms (`secs`, `minutes`,
/// `hours`, ...). Units are case-insensitive.
///
/// Returns `None` for anything else, including negative spans.
///
/// # Example
///
/// ```
/// use palisade_config::parse_span;
/// use std::time::Duration;
///
/// assert_eq!(parse_span("1h"), Some(Duration::from_secs(3600)));
/// assert_eq!(parse_span("3600"), Some(Duration::from_secs(3600)));
/// assert_eq!(parse_span("1.5 minutes"), Some(Duration::from_secs(90)));
/// assert_eq!(parse_span("soon"), None);
/// ```
#[must_use]
pub fn parse_span(input: &str) -> Option<Duration> {
    let input = input.trim();
    let split = input
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(input.len());
    let (number, unit) = input.split_at(split);
    let value: f64 = number.parse().ok()?;

    let unit = unit.trim_start().to_ascii_lowercase();
    let millis_per_unit = match unit.as_str() {
        "" => SECOND,
        "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => 1.0,
        "s" | "sec" | "secs" | "second" | "seconds" => SECOND,
        "m" | "min" | "mins" | "minute" | "minutes" => MINUTE,
        "h" | "hr" | "hrs" | "hour" | "hours" => HOUR,
        "d" | "day" | "days" => DAY,
        "w" | "week" | "weeks" => WEEK,
        "y" | "yr" | "yrs" | "year" | "years" => YEAR,
        _ => return None,
    };

    let millis = value * millis_per_unit;
    if !millis.is_finite() {
        return None;
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let millis = millis.round() as u64;
    Some(Duration::from_millis(millis))
}

/// Formats a span using the largest unit that divides it exactly.
///
/// ```
/// use palisade_config::format_span;
/// use std::time::Duration;
///
/// assert_eq!(format_span(Duration::from_secs(3600)), "1h");
/// assert_eq!(format_span(Duration::from_secs(90)), "90s");
/// assert_eq!(format_span(Duration::from_millis(1500)), "1500ms");
/// ```
#[must_use]
pub fn format_span(span: Duration) -> String {
    let millis = span.as_millis();
    if millis == 0 {
        return "0s".to_string();
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let units = [
        (WEEK as u128, "w"),
        (DAY as u128, "d"),
        (HOUR as u128, "h"),
        (MINUTE as u128, "m"),
        (SECOND as u128, "s"),
    ];

    units
        .iter()
        .find(|(size, _)| millis % size == 0)
        .map_or_else(
            || format!("{millis}ms"),
            |(size, suffix)| format!("{}{suffix}", millis / size),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_units() {
        assert_eq!(parse_span("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_span("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_span("15m"), Some(Duration::from_secs(900)));
        assert_eq!(parse_span("2d"), Some(Duration::from_secs(172_800)));
        assert_eq!(parse_span("1w"), Some(Duration::from_secs(604_800)));
        assert_eq!(parse_span("1y"), Some(Duration::from_secs(31_557_600)));
    }

    #[test]
    fn test_long_units_and_spacing() {
        assert_eq!(parse_span("10 hours"), Some(Duration::from_secs(36_000)));
        assert_eq!(parse_span("2 Days"), Some(Duration::from_secs(172_800)));
        assert_eq!(parse_span(" 45 sec "), Some(Duration::from_secs(45)));
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(parse_span(""), None);
        assert_eq!(parse_span("h"), None);
        assert_eq!(parse_span("-1h"), None);
        assert_eq!(parse_span("1 fortnight"), None);
        assert_eq!(parse_span("1.2.3s"), None);
    }

    #[test]
    fn test_format_round_trips_common_values() {
        for text in ["1h", "15m", "3d", "2w", "45s"] {
            let span = parse_span(text).unwrap();
            assert_eq!(format_span(span), text);
        }
        assert_eq!(format_span(Duration::ZERO), "0s");
    }
}
