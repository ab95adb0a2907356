// Domain models - Core types and data structures

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CutError, CutResult};

/// Offsets and durations are whole microseconds to avoid float drift.
pub type Micros = u64;

pub const MICROS_PER_SECOND: Micros = 1_000_000;

/// Half-open source interval `[start, end)` with `start < end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: Micros,
    pub end: Micros,
}

impl TimeSpan {
    /// Create a span, rejecting empty or inverted bounds
    pub fn new(start: Micros, end: Micros) -> CutResult<Self> {
        if start >= end {
            return Err(CutError::invalid_range(
                start,
                end,
                "start must be before end",
            ));
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> Micros {
        self.end - self.start
    }

    /// Closed-interval containment, matching how a playhead on an edge selects a range
    pub fn contains(&self, time: Micros) -> bool {
        self.start <= time && time <= self.end
    }

    /// Closed-interval touch counts as overlap
    pub fn touches(&self, other: &TimeSpan) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            crate::utils::time::format_hms(self.start),
            crate::utils::time::format_hms(self.end)
        )
    }
}

/// What a save action does with the user's selections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SaveMode {
    /// Join the selected ranges into one output
    KeepSelections,
    /// Join everything except the selected ranges
    RemoveSelections,
    /// One output per selected range
    SplitBySelections,
    /// One output per part between tag points
    SplitByTags,
}

impl SaveMode {
    pub const ALL: [SaveMode; 4] = [
        SaveMode::KeepSelections,
        SaveMode::RemoveSelections,
        SaveMode::SplitBySelections,
        SaveMode::SplitByTags,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SaveMode::KeepSelections => "keep",
            SaveMode::RemoveSelections => "remove",
            SaveMode::SplitBySelections => "split-selections",
            SaveMode::SplitByTags => "split-tags",
        }
    }
}

impl fmt::Display for SaveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SaveMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        SaveMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == wanted)
            .ok_or_else(|| {
                format!(
                    "Invalid save mode: {}. Valid modes: keep, remove, split-selections, split-tags",
                    s
                )
            })
    }
}

/// Target container/codec family for a save action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Source container, stream copy wherever alignment allows
    Original,
    /// H.264 + AAC in MP4
    Mp4,
    /// H.264 + AAC in Matroska
    Mkv,
    /// Xvid + MP3 in AVI
    Avi,
    /// Audio only
    Mp3,
    /// Animated GIF
    Gif,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 6] = [
        OutputFormat::Original,
        OutputFormat::Mp4,
        OutputFormat::Mkv,
        OutputFormat::Avi,
        OutputFormat::Mp3,
        OutputFormat::Gif,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Original => "original",
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Mkv => "mkv",
            OutputFormat::Avi => "avi",
            OutputFormat::Mp3 => "mp3",
            OutputFormat::Gif => "gif",
        }
    }

    /// Parse a short format name
    pub fn parse(name: &str) -> CutResult<Self> {
        let wanted = name.trim().to_lowercase();
        OutputFormat::ALL
            .into_iter()
            .find(|format| format.as_str() == wanted)
            .ok_or(CutError::UnsupportedFormat {
                format: name.to_string(),
            })
    }

    /// Output container extension (without dot)
    pub fn extension<'a>(&self, source: &'a SourceProfile) -> &'a str {
        match self {
            OutputFormat::Original => source.container.as_str(),
            other => other.as_str(),
        }
    }

    /// Formats that can never be produced by stream copy
    pub fn forces_reencode(&self) -> bool {
        !matches!(self, OutputFormat::Original)
    }

    pub fn is_audio_only(&self) -> bool {
        matches!(self, OutputFormat::Mp3)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = CutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OutputFormat::parse(s)
    }
}

/// What the probe learned about the source besides its keyframes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceProfile {
    /// Container extension, lowercase, without dot
    pub container: String,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Pixel format of the video stream, e.g. `yuv420p10le`
    pub pix_fmt: Option<String>,
    /// Codec profile as the probe names it, e.g. `High`
    pub video_profile: Option<String>,
    /// Base frame rate as `num/den`
    pub frame_rate: Option<String>,
}

impl SourceProfile {
    /// Profile with only a container known
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into().trim_start_matches('.').to_lowercase(),
            video_codec: None,
            audio_codec: None,
            width: None,
            height: None,
            pix_fmt: None,
            video_profile: None,
            frame_rate: None,
        }
    }

    pub fn with_video_codec(mut self, codec: impl Into<String>) -> Self {
        self.video_codec = Some(codec.into().to_lowercase());
        self
    }

    pub fn with_audio_codec(mut self, codec: impl Into<String>) -> Self {
        self.audio_codec = Some(codec.into().to_lowercase());
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_pix_fmt(mut self, pix_fmt: impl Into<String>) -> Self {
        self.pix_fmt = Some(pix_fmt.into().to_lowercase());
        self
    }

    pub fn with_video_profile(mut self, profile: impl Into<String>) -> Self {
        self.video_profile = Some(profile.into());
        self
    }

    /// Rates that are not a positive `num/den` or plain number (ffprobe's
    /// `0/0`) leave the rate unknown
    pub fn with_frame_rate(mut self, rate: &str) -> Self {
        let rate = rate.trim();
        let positive = |text: &str| text.parse::<f64>().map(|v| v.is_finite() && v > 0.0).unwrap_or(false);
        let valid = match rate.split_once('/') {
            Some((num, den)) => positive(num) && positive(den),
            None => positive(rate),
        };
        self.frame_rate = valid.then(|| rate.to_string());
        self
    }
}
