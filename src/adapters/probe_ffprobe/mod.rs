//! FFprobe adapter for media file probing
//!
//! Two ffprobe runs per file: stream/format metadata as JSON, then the
//! presentation times of keyframes in the first video stream.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::domain::model::SourceProfile;
use crate::engine::{CommandSynthesizer, InvocationDescriptor};
use crate::error::{CutError, CutResult};
use crate::ports::{ProbePort, ProbeReport};
use crate::utils::path::extension;
use crate::utils::time::parse_decimal_seconds;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    format_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
    pix_fmt: Option<String>,
    profile: Option<String>,
    r_frame_rate: Option<String>,
}

/// FFprobe-based probe adapter
#[derive(Debug, Clone)]
pub struct FfprobeAdapter {
    ffprobe: PathBuf,
}

impl FfprobeAdapter {
    pub fn new(ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
        }
    }

    async fn run(&self, descriptor: &InvocationDescriptor) -> CutResult<String> {
        debug!("Running {} {}", self.ffprobe.display(), descriptor.args.join(" "));
        let output = Command::new(&self.ffprobe)
            .args(&descriptor.args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| CutError::Probe {
                message: format!("failed to start {}: {}", self.ffprobe.display(), e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CutError::Probe {
                message: format!("ffprobe exited with {}: {}", output.status, stderr.trim()),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Signed decimal seconds to microseconds; `None` for "N/A" and garbage
fn parse_signed_seconds(text: &str) -> Option<i64> {
    let text = text.trim().trim_end_matches(',');
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let micros = i64::try_from(parse_decimal_seconds(digits)?).ok()?;
    Some(if negative { -micros } else { micros })
}

/// Duration and profile from `-show_format -show_streams` JSON
pub fn parse_format_json(json: &str, path: &Path) -> CutResult<(i64, SourceProfile)> {
    let parsed: FfprobeOutput = serde_json::from_str(json).map_err(|e| CutError::Probe {
        message: format!("unreadable ffprobe output: {}", e),
    })?;

    let format_duration = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(parse_signed_seconds)
        .filter(|d| *d > 0);
    let duration = format_duration
        .or_else(|| {
            parsed
                .streams
                .iter()
                .filter_map(|s| s.duration.as_deref().and_then(parse_signed_seconds))
                .max()
        })
        .unwrap_or(0);

    let container = extension(path)
        .or_else(|| {
            parsed
                .format
                .as_ref()
                .and_then(|f| f.format_name.as_deref())
                .and_then(|name| name.split(',').next())
                .map(str::to_string)
        })
        .unwrap_or_default();

    let mut profile = SourceProfile::new(container);
    let stream_of = |kind: &str| {
        parsed
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some(kind))
    };
    if let Some(video) = stream_of("video") {
        if let Some(codec) = &video.codec_name {
            profile = profile.with_video_codec(codec.as_str());
        }
        if let (Some(w), Some(h)) = (video.width, video.height) {
            profile = profile.with_dimensions(w, h);
        }
        if let Some(pix_fmt) = &video.pix_fmt {
            profile = profile.with_pix_fmt(pix_fmt.as_str());
        }
        if let Some(name) = &video.profile {
            profile = profile.with_video_profile(name.as_str());
        }
        if let Some(rate) = &video.r_frame_rate {
            profile = profile.with_frame_rate(rate);
        }
    }
    if let Some(codec) = stream_of("audio").and_then(|a| a.codec_name.as_ref()) {
        profile = profile.with_audio_codec(codec.as_str());
    }

    Ok((duration, profile))
}

/// Keyframe times from `-show_entries frame=pts_time -of csv=p=0` output
pub fn parse_keyframe_csv(csv: &str) -> Vec<i64> {
    csv.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let parsed = parse_signed_seconds(line);
            if parsed.is_none() {
                debug!("Skipping unparsable keyframe time {:?}", line);
            }
            parsed
        })
        .collect()
}

/// Drop keyframes the container reports outside `[0, duration]`
pub fn clamp_keyframes(keyframes: Vec<i64>, duration: i64) -> Vec<i64> {
    let total = keyframes.len();
    let kept: Vec<i64> = keyframes
        .into_iter()
        .filter(|t| (0..=duration).contains(t))
        .collect();
    if kept.len() < total {
        warn!(
            "Dropped {} keyframe(s) outside the reported duration",
            total - kept.len()
        );
    }
    kept
}

#[async_trait]
impl ProbePort for FfprobeAdapter {
    async fn probe(&self, path: &Path) -> CutResult<ProbeReport> {
        info!("Probing {}", path.display());
        let descriptors = CommandSynthesizer::probe_invocations(path);
        let (format_step, keyframe_step) = match descriptors.as_slice() {
            [format, keyframes] => (format, keyframes),
            _ => {
                return Err(CutError::Probe {
                    message: "unexpected probe invocation list".to_string(),
                })
            }
        };

        let json = self.run(format_step).await?;
        let (duration, profile) = parse_format_json(&json, path)?;

        let keyframes = match self.run(keyframe_step).await {
            Ok(csv) => parse_keyframe_csv(&csv),
            Err(e) => {
                warn!("Keyframe probe failed, only the file start is a cut point: {}", e);
                Vec::new()
            }
        };
        let keyframes = clamp_keyframes(keyframes, duration);

        info!(
            "Probed {}: {}us, {} keyframe(s), {} {}",
            path.display(),
            duration,
            keyframes.len(),
            profile.container,
            profile.video_codec.as_deref().unwrap_or("no video")
        );

        Ok(ProbeReport {
            path: path.to_path_buf(),
            duration_micros: duration,
            keyframes_micros: keyframes,
            profile,
        })
    }
}
