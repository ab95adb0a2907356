//! Time parsing and formatting utilities

use crate::domain::model::{Micros, MICROS_PER_SECOND};
use crate::error::{CutError, CutResult};

/// Time parser for the formats users and tools hand us
pub struct TimeParser;

impl TimeParser {
    /// Create a new time parser
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self
    }
}

impl Default for TimeParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeParser {
    /// Parse `HH:MM:SS.fff`, `MM:SS.fff` or plain seconds into microseconds
    pub fn parse_time(&self, time_str: &str) -> CutResult<Micros> {
        let time_str = time_str.trim();
        let invalid = || CutError::InvalidTimeFormat {
            time: time_str.to_string(),
        };

        let parts: Vec<&str> = time_str.split(':').collect();
        match parts.as_slice() {
            [seconds] => parse_decimal_seconds(seconds).ok_or_else(invalid),
            [minutes, seconds] => {
                let minutes = parse_whole(minutes).ok_or_else(invalid)?;
                let seconds = parse_decimal_seconds(seconds).ok_or_else(invalid)?;
                if seconds >= 60 * MICROS_PER_SECOND {
                    return Err(invalid());
                }
                clock_micros(0, minutes, seconds).ok_or_else(invalid)
            }
            [hours, minutes, seconds] => {
                let hours = parse_whole(hours).ok_or_else(invalid)?;
                let minutes = parse_whole(minutes).ok_or_else(invalid)?;
                let seconds = parse_decimal_seconds(seconds).ok_or_else(invalid)?;
                if minutes >= 60 || seconds >= 60 * MICROS_PER_SECOND {
                    return Err(invalid());
                }
                clock_micros(hours, minutes, seconds).ok_or_else(invalid)
            }
            _ => Err(invalid()),
        }
    }

    /// Parse a `START-END` pair
    pub fn parse_span(&self, span_str: &str) -> CutResult<(Micros, Micros)> {
        let (start, end) = span_str
            .split_once('-')
            .ok_or_else(|| CutError::InvalidTimeFormat {
                time: span_str.to_string(),
            })?;
        Ok((self.parse_time(start)?, self.parse_time(end)?))
    }
}

/// Parse a whole number of units, digits only
fn parse_whole(text: &str) -> Option<Micros> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// `hours:minutes` plus microseconds, `None` on overflow
pub fn clock_micros(hours: Micros, minutes: Micros, seconds: Micros) -> Option<Micros> {
    hours
        .checked_mul(60)?
        .checked_add(minutes)?
        .checked_mul(60 * MICROS_PER_SECOND)?
        .checked_add(seconds)
}

/// Parse `S[.ffffff]` exactly; digits past the sixth decimal are truncated
pub fn parse_decimal_seconds(text: &str) -> Option<Micros> {
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (text, ""),
    };
    let whole = if whole.is_empty() && !fraction.is_empty() {
        0
    } else {
        parse_whole(whole)?
    };
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mut micros: Micros = 0;
    for i in 0..6 {
        let digit = fraction.as_bytes().get(i).map(|b| (b - b'0') as Micros).unwrap_or(0);
        micros = micros * 10 + digit;
    }
    whole.checked_mul(MICROS_PER_SECOND)?.checked_add(micros)
}

/// Display form, e.g. `1:02:03.456` or `2:03.456`
pub fn format_hms(micros: Micros) -> String {
    let total_seconds = micros / MICROS_PER_SECOND;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    let millis = (micros % MICROS_PER_SECOND) / 1000;

    if hours > 0 {
        format!("{}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
    } else {
        format!("{}:{:02}.{:03}", minutes, seconds, millis)
    }
}

/// Argument form for the transcoding tool, e.g. `12.345678`
pub fn format_seconds_arg(micros: Micros) -> String {
    format!(
        "{}.{:06}",
        micros / MICROS_PER_SECOND,
        micros % MICROS_PER_SECOND
    )
}

/// Extract the `time=HH:MM:SS.xx` position from a progress line
pub fn parse_progress_time(line: &str) -> Option<Micros> {
    let start = line.find("time=")? + "time=".len();
    let value: String = line[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ':' || *c == '.')
        .collect();
    TimeParser::new().parse_time(&value).ok()
}
