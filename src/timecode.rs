//! Timecode parsing and formatting
//!
//! Sample timing fields in catalog metadata are written by hand, either
//! as bare second counts (`90`, `90.5`) or as colon-separated timecodes
//! (`1:30`, `1:02:03.25`). This module converts between the two.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A timing value as it appears on the wire: a number of seconds or a
/// timecode string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeValue {
    Seconds(f64),
    Timecode(String),
}

impl TimeValue {
    /// Convert to seconds. Negative values are rejected.
    pub fn to_seconds(&self) -> Result<f64> {
        match self {
            TimeValue::Seconds(s) if s.is_finite() && *s >= 0.0 => Ok(*s),
            TimeValue::Seconds(s) => Err(Error::InvalidTimecode(s.to_string())),
            TimeValue::Timecode(t) => parse_timecode(t),
        }
    }
}

/// Parse a timecode string into seconds.
///
/// Accepted forms: `SS`, `SS.S`, `M:SS`, `H:MM:SS`, each with an optional
/// fractional part on the last component. Components after the first must
/// be below 60.
pub fn parse_timecode(text: &str) -> Result<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidTimecode(text.to_string()));
    }

    let components: Vec<&str> = trimmed.split(':').collect();
    if components.len() > 3 {
        return Err(Error::InvalidTimecode(text.to_string()));
    }

    let mut seconds = 0.0;
    for (i, component) in components.iter().enumerate() {
        let is_last = i == components.len() - 1;

        let value: f64 = if is_last {
            component
                .parse()
                .map_err(|_| Error::InvalidTimecode(text.to_string()))?
        } else {
            component
                .parse::<u32>()
                .map_err(|_| Error::InvalidTimecode(text.to_string()))?
                .into()
        };

        if value < 0.0 {
            return Err(Error::InvalidTimecode(text.to_string()));
        }
        // Only the leading component may exceed the carry limit
        if i > 0 && value >= 60.0 {
            return Err(Error::InvalidTimecode(text.to_string()));
        }

        seconds = seconds * 60.0 + value;
    }

    Ok(seconds)
}

/// Format seconds as a timecode string, choosing the shortest form that
/// fits the magnitude: `SS.S` below one minute, `M:SS.S` below one hour,
/// `H:MM:SS.S` beyond. Whole-second values drop the fractional part.
pub fn format_timecode(seconds: f64) -> String {
    let total = seconds.max(0.0);
    let whole = total.floor() as u64;
    let frac = total - whole as f64;

    let frac_suffix = if frac >= 0.05 {
        format!(".{}", ((frac * 10.0).round() as u64).min(9))
    } else {
        String::new()
    };

    if whole < 60 {
        format!("{}{}", whole, frac_suffix)
    } else if whole < 3600 {
        format!("{}:{:02}{}", whole / 60, whole % 60, frac_suffix)
    } else {
        format!(
            "{}:{:02}:{:02}{}",
            whole / 3600,
            (whole % 3600) / 60,
            whole % 60,
            frac_suffix
        )
    }
}
