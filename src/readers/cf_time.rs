//! Decoding of CF-convention time axes (`"<unit> since <epoch>"`).

use chrono::{Duration, NaiveDateTime};

use crate::error::{ProcessingError, Result};
use crate::readers::date_parser::DateFormat;

/// Parsed `units` attribute of a time variable
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeUnits {
    seconds_per_unit: f64,
    epoch: NaiveDateTime,
}

impl TimeUnits {
    pub fn parse(units: &str) -> Result<Self> {
        let invalid = || {
            ProcessingError::InvalidFormat(format!(
                "Unsupported time units: '{}'. Expected '<unit> since <epoch>'",
                units
            ))
        };

        let units_trimmed = units.trim();
        let split_at = units_trimmed
            .to_ascii_lowercase()
            .find(" since ")
            .ok_or_else(invalid)?;
        let unit = units_trimmed[..split_at].to_ascii_lowercase();
        let epoch = &units_trimmed[split_at + " since ".len()..];

        let seconds_per_unit = match unit.trim() {
            "milliseconds" | "millisecond" | "msecs" | "msec" | "ms" => 0.001,
            "seconds" | "second" | "secs" | "sec" | "s" => 1.0,
            "minutes" | "minute" | "mins" | "min" => 60.0,
            "hours" | "hour" | "hrs" | "hr" | "h" => 3_600.0,
            "days" | "day" | "d" => 86_400.0,
            _ => return Err(invalid()),
        };

        let epoch = parse_epoch(epoch.trim()).ok_or_else(invalid)?;

        Ok(Self {
            seconds_per_unit,
            epoch,
        })
    }

    /// Timestamp of one axis value; `None` for NaN or out-of-range offsets
    pub fn decode(&self, value: f64) -> Option<NaiveDateTime> {
        if !value.is_finite() {
            return None;
        }
        let millis = (value * (self.seconds_per_unit * 1_000.0)).round();
        if millis.abs() >= i64::MAX as f64 {
            return None;
        }
        self.epoch
            .checked_add_signed(Duration::milliseconds(millis as i64))
    }
}

/// Decode a whole axis, failing if any value cannot be represented
pub fn decode_axis(values: &[f64], units: &str) -> Result<Vec<NaiveDateTime>> {
    let units = TimeUnits::parse(units)?;
    values
        .iter()
        .map(|v| {
            units.decode(*v).ok_or_else(|| {
                ProcessingError::InvalidFormat(format!("Time value {} cannot be decoded", v))
            })
        })
        .collect()
}

fn parse_epoch(raw: &str) -> Option<NaiveDateTime> {
    let cleaned = raw
        .trim_end_matches(" UTC")
        .trim_end_matches(" utc")
        .trim_end_matches(|c: char| c == 'Z' || c == 'z' || c.is_whitespace())
        .to_string();
    DateFormat::Iso
        .parse(&cleaned)
        .or_else(|| DateFormat::Iso.parse(&pad_date(&cleaned)))
}

/// `1-1-1 0:0:0` style epochs with unpadded fields
fn pad_date(raw: &str) -> String {
    let (date, time) = raw.split_once(' ').unwrap_or((raw, ""));
    let date = date
        .split('-')
        .enumerate()
        .map(|(i, part)| if i == 0 { format!("{:0>4}", part) } else { format!("{:0>2}", part) })
        .collect::<Vec<_>>()
        .join("-");
    if time.is_empty() {
        date
    } else {
        let time = time
            .split(':')
            .map(|part| format!("{:0>2}", part))
            .collect::<Vec<_>>()
            .join(":");
        format!("{} {}", date, time)
    }
}
