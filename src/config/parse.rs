//! Environment variable parsing utilities.

use std::str::FromStr;
use std::time::Duration;

use super::ConfigError;

/// Value of `key`, or `default` when unset.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Value of `key`, treating an empty string as unset.
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

/// Flag variable: `1`, `true`, `yes` or `on` (any case) enable it.
pub fn env_bool(key: &str, default: bool) -> bool {
    match env_opt(key) {
        Some(v) => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

/// Parse `key` with `FromStr`, falling back to `default` when unset.
pub fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    let Some(raw) = env_opt(key) else {
        return Ok(default);
    };
    raw.parse().map_err(|e: T::Err| ConfigError::Parse {
        key: key.into(),
        error: e.to_string(),
        value: raw,
    })
}

/// Milliseconds per unit suffix.
const UNITS: [(&str, u64); 6] = [
    ("ms", 1),
    ("s", 1_000),
    ("m", 60_000),
    ("h", 3_600_000),
    ("d", 86_400_000),
    ("w", 604_800_000),
];

/// Parse a duration such as `250ms`, `30s`, `2m`, `1h`, `1d` or `1w`.
/// A bare number is seconds. `off`, an empty string or any zero length
/// yields `None`.
pub fn parse_duration(s: &str) -> Result<Option<Duration>, String> {
    let s = s.trim().to_lowercase();
    if s.is_empty() || s == "off" {
        return Ok(None);
    }

    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, suffix) = s.split_at(split);
    if digits.is_empty() {
        return Err(format!("invalid duration: {}", s));
    }
    let num: u64 = digits
        .parse()
        .map_err(|_| format!("invalid number: {}", digits))?;

    let per_unit = match suffix {
        "" => 1_000,
        _ => UNITS
            .iter()
            .find(|(unit, _)| *unit == suffix)
            .map(|(_, ms)| *ms)
            .ok_or_else(|| format!("invalid unit: {}", suffix))?,
    };

    let millis = num
        .checked_mul(per_unit)
        .ok_or_else(|| format!("duration too large: {}", s))?;
    Ok(Some(Duration::from_millis(millis)).filter(|d| !d.is_zero()))
}

/// Read `key` as a duration, using `default` when unset.
pub fn env_duration(key: &str, default: &str) -> Result<Option<Duration>, ConfigError> {
    let value = env_opt(key).unwrap_or_else(|| default.to_string());
    parse_duration(&value).map_err(|error| ConfigError::Parse {
        key: key.into(),
        value,
        error,
    })
}
