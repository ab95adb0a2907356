//! Progress events emitted while a plan executes

use serde::{Deserialize, Serialize};

use crate::domain::model::Micros;
use crate::utils::time::{clock_micros, parse_decimal_seconds, parse_progress_time};

/// What happened to one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProgressKind {
    Started,
    /// Fraction of the step done, 0.0 to 1.0
    Advanced(f32),
    Succeeded,
    Failed(String),
    /// Not launched because of an earlier failure or cancellation
    Skipped,
}

/// One progress notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub step: usize,
    pub total_steps: usize,
    pub kind: ProgressKind,
}

impl ProgressEvent {
    pub fn new(step: usize, total_steps: usize, kind: ProgressKind) -> Self {
        Self {
            step,
            total_steps,
            kind,
        }
    }

    /// Fraction of the whole run, assuming equal weight per step
    pub fn overall_fraction(&self, completed_steps: usize) -> f32 {
        if self.total_steps == 0 {
            return 1.0;
        }
        let current = match self.kind {
            ProgressKind::Advanced(f) => f,
            _ => 0.0,
        };
        ((completed_steps as f32 + current) / self.total_steps as f32).clamp(0.0, 1.0)
    }
}

/// Position reported by one line of ffmpeg `-progress` or stats output
pub fn parse_progress_line(line: &str) -> Option<Micros> {
    let line = line.trim();
    if let Some(value) = line.strip_prefix("out_time_us=") {
        return value.parse::<i64>().ok().filter(|v| *v >= 0).map(|v| v as Micros);
    }
    if let Some(value) = line.strip_prefix("out_time=") {
        return parse_clock(value);
    }
    parse_progress_time(line)
}

fn parse_clock(value: &str) -> Option<Micros> {
    let mut parts = value.trim().splitn(3, ':');
    let hours: Micros = parts.next()?.parse().ok()?;
    let minutes: Micros = parts.next()?.parse().ok()?;
    let seconds = parse_decimal_seconds(parts.next()?)?;
    clock_micros(hours, minutes, seconds)
}

/// Step fraction for a reported position
pub fn step_fraction(position: Micros, expected: Micros) -> f32 {
    if expected == 0 {
        return 0.0;
    }
    (position as f64 / expected as f64).clamp(0.0, 1.0) as f32
}

/// The most useful few lines of a failed tool's stderr
pub fn error_snippet(lines: &[String]) -> String {
    let flagged: Vec<&str> = lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| {
            let lower = l.to_lowercase();
            lower.contains("error") || lower.contains("failed") || lower.contains("invalid")
        })
        .collect();

    let (chosen, keep): (Vec<&str>, usize) = if flagged.is_empty() {
        let tail = lines
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect();
        (tail, 5)
    } else {
        (flagged, 3)
    };

    let start = chosen.len().saturating_sub(keep);
    chosen[start..].join(" | ")
}
