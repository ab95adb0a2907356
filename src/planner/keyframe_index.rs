//! Keyframe index for a probed source
//!
//! The index is the only way the rest of the crate reasons about keyframe
//! alignment. It is built once per probed source and never mutated.

use serde::Serialize;
use tracing::debug;

use crate::domain::model::Micros;
use crate::error::{CutError, CutResult};

/// Sorted, deduplicated keyframe offsets bounded by the source duration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyframeIndex {
    duration: Micros,
    /// Strictly increasing, always starts with 0
    timestamps: Vec<Micros>,
}

/// Spacing statistics between consecutive keyframes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GopStats {
    /// Number of keyframes in the index
    pub keyframe_count: usize,
    /// Mean distance between keyframes
    pub average: Micros,
    /// Shortest distance between keyframes
    pub min: Micros,
    /// Longest distance between keyframes
    pub max: Micros,
}

impl KeyframeIndex {
    /// Build an index from raw probe output.
    ///
    /// Fails with `InvalidProbeData` when the duration is not positive or a
    /// timestamp falls outside `[0, duration]`. Input order and duplicates
    /// do not matter; `0` is always part of the result.
    pub fn build(duration_micros: i64, raw_timestamps: &[i64]) -> CutResult<Self> {
        if duration_micros <= 0 {
            return Err(CutError::InvalidProbeData {
                message: format!("duration must be positive, got {}us", duration_micros),
            });
        }

        if let Some(bad) = raw_timestamps
            .iter()
            .find(|&&t| t < 0 || t > duration_micros)
        {
            return Err(CutError::InvalidProbeData {
                message: format!(
                    "keyframe at {}us is outside [0, {}us]",
                    bad, duration_micros
                ),
            });
        }

        let mut timestamps: Vec<Micros> = raw_timestamps.iter().map(|&t| t as Micros).collect();
        timestamps.push(0);
        timestamps.sort_unstable();
        timestamps.dedup();

        debug!(
            "Built keyframe index: {} keyframes over {}us",
            timestamps.len(),
            duration_micros
        );

        Ok(Self {
            duration: duration_micros as Micros,
            timestamps,
        })
    }

    pub fn duration(&self) -> Micros {
        self.duration
    }

    pub fn timestamps(&self) -> &[Micros] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Whether `time` is an indexed keyframe
    pub fn contains(&self, time: Micros) -> bool {
        self.timestamps.binary_search(&time).is_ok()
    }

    /// Whether a stream copy may begin or end at `time`
    pub fn is_cut_point(&self, time: Micros) -> bool {
        time == 0 || time == self.duration || self.contains(time)
    }

    /// Largest keyframe at or before `time` (0 if none)
    pub fn nearest_at_or_before(&self, time: Micros) -> Micros {
        match self.timestamps.binary_search(&time) {
            Ok(i) => self.timestamps[i],
            Err(0) => 0,
            Err(i) => self.timestamps[i - 1],
        }
    }

    /// Smallest keyframe at or after `time` (the duration if none, meaning "cut to end")
    pub fn nearest_at_or_after(&self, time: Micros) -> Micros {
        match self.timestamps.binary_search(&time) {
            Ok(i) => self.timestamps[i],
            Err(i) => self.timestamps.get(i).copied().unwrap_or(self.duration),
        }
    }

    /// Keyframe spacing, `None` when there is only the implicit keyframe at 0
    pub fn gop_stats(&self) -> Option<GopStats> {
        let intervals: Vec<Micros> = self.timestamps.windows(2).map(|w| w[1] - w[0]).collect();
        if intervals.is_empty() {
            return None;
        }

        Some(GopStats {
            keyframe_count: self.timestamps.len(),
            average: intervals.iter().sum::<Micros>() / intervals.len() as Micros,
            min: intervals.iter().copied().min().unwrap_or(0),
            max: intervals.iter().copied().max().unwrap_or(0),
        })
    }
}
