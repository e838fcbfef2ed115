// Refresh interval parsing ("30s", "5m", "1.5h")
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntervalError {
    #[error("Interval is empty")]
    Empty,

    #[error("Invalid interval '{0}', expecting a number followed by one of ms, s, m, h, d, w, M, y")]
    Malformed(String),

    #[error("Unknown unit '{unit}' in interval '{interval}'")]
    UnknownUnit { interval: String, unit: String },

    #[error("Interval '{0}' is shorter than one millisecond")]
    NonPositive(String),
}

/// Convert an interval string to a timer period.
pub fn parse_interval(interval: &str) -> Result<Duration, IntervalError> {
    let trimmed = interval.trim();
    if trimmed.is_empty() {
        return Err(IntervalError::Empty);
    }

    let malformed = || IntervalError::Malformed(trimmed.to_string());

    let unit_start = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .ok_or_else(malformed)?;
    let (number, unit) = trimmed.split_at(unit_start);
    let value: f64 = number.parse().map_err(|_| malformed())?;

    let unit_ms = unit_millis(unit).ok_or_else(|| IntervalError::UnknownUnit {
        interval: trimmed.to_string(),
        unit: unit.to_string(),
    })?;

    let millis = (value * unit_ms as f64).round();
    if !millis.is_finite() {
        return Err(malformed());
    }
    if millis < 1.0 {
        return Err(IntervalError::NonPositive(trimmed.to_string()));
    }

    Ok(Duration::from_millis(millis as u64))
}

fn unit_millis(unit: &str) -> Option<u64> {
    let millis = match unit {
        "ms" => 1,
        "s" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        "d" => 86_400_000,
        "w" => 604_800_000,
        "M" => 2_592_000_000,
        "y" => 31_536_000_000,
        _ => return None,
    };
    Some(millis)
}
