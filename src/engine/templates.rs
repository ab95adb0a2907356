//! Argument templates per output format and encoder lookup tables

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::model::{OutputFormat, SourceProfile};
use crate::error::{CutError, CutResult};

/// Placeholder replaced with the GIF width at synthesis time
pub const GIF_WIDTH_PLACEHOLDER: &str = "{gif_width}";

/// Encoder knobs shared by every re-encoding template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingSettings {
    /// Constant rate factor for x264/x265/vp9/av1
    pub crf: u8,
    /// x264/x265 preset
    pub preset: String,
    /// AAC bitrate for MP4/MKV
    pub audio_bitrate: String,
    /// Bitrate for MP3 output
    pub mp3_bitrate: String,
    pub gif_fps: u32,
    /// Upper bound on GIF width; narrower sources keep their width
    pub gif_width: u32,
}

impl Default for EncodingSettings {
    fn default() -> Self {
        Self {
            crf: 23,
            preset: "medium".to_string(),
            audio_bitrate: "128k".to_string(),
            mp3_bitrate: "192k".to_string(),
            gif_fps: 10,
            gif_width: 480,
        }
    }
}

/// How pieces of one output are joined
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum JoinStrategy {
    /// Concat demuxer with packet copy; pieces already have the final codec
    CopyJoin { args: Vec<String> },
    /// Pieces go through an intermediate container, then one final transcode
    JoinThenTranscode {
        intermediate_extension: String,
        intermediate_args: Vec<String>,
    },
}

/// Codec arguments and join strategy for one output format
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatTemplate {
    /// Codec arguments for producing one piece (or a whole output)
    pub codec_args: Vec<String>,
    pub join: JoinStrategy,
}

/// Encoder for edge slivers joined with copied packets of one source codec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchingEncoder {
    /// Codec and quality arguments
    pub args: Vec<String>,
    /// Pixel formats the encoder writes
    pub pix_fmts: Vec<String>,
    /// Probe profile name -> `-profile:v` value; empty when the profile is not pinned
    pub profiles: Vec<(String, String)>,
}

impl MatchingEncoder {
    fn new(args: Vec<String>, pix_fmts: &[&str], profiles: &[(&str, &str)]) -> Self {
        Self {
            args,
            pix_fmts: pix_fmts.iter().map(|s| s.to_string()).collect(),
            profiles: profiles
                .iter()
                .map(|(probe, encoder)| (probe.to_string(), encoder.to_string()))
                .collect(),
        }
    }

    /// Encoder arguments with pixel format, profile and frame rate pinned to
    /// the source. `Err` names the parameter that cannot be reproduced.
    pub fn stream_args(&self, source: &SourceProfile) -> Result<Vec<String>, String> {
        let pix_fmt = source
            .pix_fmt
            .as_deref()
            .ok_or_else(|| "source pixel format unknown".to_string())?;
        if !self.pix_fmts.iter().any(|p| p == pix_fmt) {
            return Err(format!("encoder cannot write pixel format {}", pix_fmt));
        }
        let rate = source
            .frame_rate
            .as_deref()
            .ok_or_else(|| "source frame rate unknown".to_string())?;

        let mut args = self.args.clone();
        args.extend(["-pix_fmt".to_string(), pix_fmt.to_string()]);
        if !self.profiles.is_empty() {
            let name = source
                .video_profile
                .as_deref()
                .ok_or_else(|| "source codec profile unknown".to_string())?;
            let (_, value) = self
                .profiles
                .iter()
                .find(|(probe, _)| probe.eq_ignore_ascii_case(name.trim()))
                .ok_or_else(|| format!("encoder has no equivalent of profile {}", name))?;
            args.extend(["-profile:v".to_string(), value.clone()]);
        }
        args.extend(["-r".to_string(), rate.to_string()]);
        Ok(args)
    }
}

/// Templates keyed by output format, plus encoder lookups for lossless joins
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    settings: EncodingSettings,
    formats: HashMap<OutputFormat, FormatTemplate>,
    /// Source video codec -> encoder producing a concat-compatible stream
    matching_encoders: HashMap<String, MatchingEncoder>,
    /// Source container -> full re-encode arguments
    container_fallbacks: HashMap<String, Vec<String>>,
}

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl TemplateRegistry {
    /// Registry with no templates at all
    pub fn empty(settings: EncodingSettings) -> Self {
        Self {
            settings,
            formats: HashMap::new(),
            matching_encoders: HashMap::new(),
            container_fallbacks: HashMap::new(),
        }
    }

    /// Registry with the built-in formats, encoders and container fallbacks
    pub fn with_defaults(settings: EncodingSettings) -> Self {
        let mut registry = Self::empty(settings);
        let s = registry.settings.clone();
        let crf = s.crf.to_string();

        let copy_join = || JoinStrategy::CopyJoin {
            args: args(&["-c", "copy"]),
        };

        registry.register(
            OutputFormat::Original,
            FormatTemplate {
                codec_args: stream_copy_args(),
                join: JoinStrategy::CopyJoin {
                    args: args(&["-map", "0", "-c", "copy"]),
                },
            },
        );
        registry.register(
            OutputFormat::Mp4,
            FormatTemplate {
                codec_args: args(&[
                    "-c:v", "libx264", "-preset", s.preset.as_str(), "-crf", crf.as_str(), "-c:a", "aac", "-b:a",
                    s.audio_bitrate.as_str(), "-movflags", "+faststart",
                ]),
                join: JoinStrategy::CopyJoin {
                    args: args(&["-c", "copy", "-movflags", "+faststart"]),
                },
            },
        );
        registry.register(
            OutputFormat::Mkv,
            FormatTemplate {
                codec_args: args(&[
                    "-c:v", "libx264", "-preset", s.preset.as_str(), "-crf", crf.as_str(), "-c:a", "aac", "-b:a",
                    s.audio_bitrate.as_str(),
                ]),
                join: copy_join(),
            },
        );
        registry.register(
            OutputFormat::Avi,
            FormatTemplate {
                codec_args: args(&[
                    "-c:v", "libxvid", "-qscale:v", "4", "-c:a", "libmp3lame", "-qscale:a", "4",
                ]),
                join: copy_join(),
            },
        );
        registry.register(
            OutputFormat::Mp3,
            FormatTemplate {
                codec_args: args(&[
                    "-vn", "-c:a", "libmp3lame", "-b:a", s.mp3_bitrate.as_str(), "-ar", "44100", "-ac", "2",
                ]),
                join: copy_join(),
            },
        );
        let gif_filter = format!(
            "fps={},scale={}:-1:flags=lanczos,split[s0][s1];[s0]palettegen[p];[s1][p]paletteuse",
            s.gif_fps, GIF_WIDTH_PLACEHOLDER
        );
        registry.register(
            OutputFormat::Gif,
            FormatTemplate {
                codec_args: args(&["-vf", gif_filter.as_str(), "-an", "-loop", "0"]),
                join: JoinStrategy::JoinThenTranscode {
                    intermediate_extension: "mkv".to_string(),
                    intermediate_args: args(&[
                        "-c:v", "libx264", "-preset", "veryfast", "-crf", "18", "-an",
                    ]),
                },
            },
        );

        for (codec, encoder) in [
            (
                "h264",
                MatchingEncoder::new(
                    args(&["-c:v", "libx264", "-preset", s.preset.as_str(), "-crf", crf.as_str()]),
                    &["yuv420p", "yuvj420p", "yuv422p", "yuv444p", "yuv420p10le", "yuv422p10le"],
                    &[
                        ("Constrained Baseline", "baseline"),
                        ("Baseline", "baseline"),
                        ("Main", "main"),
                        ("High", "high"),
                        ("High 10", "high10"),
                        ("High 4:2:2", "high422"),
                        ("High 4:4:4 Predictive", "high444"),
                    ],
                ),
            ),
            (
                "hevc",
                MatchingEncoder::new(
                    args(&["-c:v", "libx265", "-preset", s.preset.as_str(), "-crf", crf.as_str()]),
                    &["yuv420p", "yuv420p10le", "yuv422p10le", "yuv444p"],
                    &[
                        ("Main", "main"),
                        ("Main 10", "main10"),
                        ("Rext", "main422-10"),
                    ],
                ),
            ),
            (
                "vp9",
                MatchingEncoder::new(
                    args(&["-c:v", "libvpx-vp9", "-crf", crf.as_str(), "-b:v", "0"]),
                    &["yuv420p", "yuv420p10le", "yuv444p"],
                    &[
                        ("Profile 0", "0"),
                        ("Profile 1", "1"),
                        ("Profile 2", "2"),
                        ("Profile 3", "3"),
                    ],
                ),
            ),
            (
                "av1",
                MatchingEncoder::new(
                    args(&["-c:v", "libsvtav1", "-crf", crf.as_str()]),
                    &["yuv420p", "yuv420p10le"],
                    &[],
                ),
            ),
            (
                "mpeg4",
                MatchingEncoder::new(args(&["-c:v", "mpeg4", "-qscale:v", "2"]), &["yuv420p"], &[]),
            ),
        ] {
            registry.matching_encoders.insert(codec.to_string(), encoder);
        }

        let h264_aac = args(&[
            "-c:v", "libx264", "-preset", s.preset.as_str(), "-crf", crf.as_str(), "-c:a", "aac", "-b:a",
            s.audio_bitrate.as_str(),
        ]);
        for container in ["mp4", "m4v", "mov", "mkv", "ts", "flv"] {
            registry
                .container_fallbacks
                .insert(container.to_string(), h264_aac.clone());
        }
        registry.container_fallbacks.insert(
            "webm".to_string(),
            args(&["-c:v", "libvpx-vp9", "-crf", crf.as_str(), "-b:v", "0", "-c:a", "libopus"]),
        );
        registry.container_fallbacks.insert(
            "avi".to_string(),
            args(&[
                "-c:v", "libxvid", "-qscale:v", "4", "-c:a", "libmp3lame", "-qscale:a", "4",
            ]),
        );

        registry
    }

    pub fn settings(&self) -> &EncodingSettings {
        &self.settings
    }

    /// Add or replace the template for a format
    pub fn register(&mut self, format: OutputFormat, template: FormatTemplate) {
        self.formats.insert(format, template);
    }

    pub fn unregister(&mut self, format: OutputFormat) -> Option<FormatTemplate> {
        self.formats.remove(&format)
    }

    /// Template for a format, `UnsupportedFormat` if none is registered
    pub fn template(&self, format: OutputFormat) -> CutResult<&FormatTemplate> {
        self.formats
            .get(&format)
            .ok_or_else(|| CutError::UnsupportedFormat {
                format: format.to_string(),
            })
    }

    /// Encoder whose output can be joined with copied packets of `codec`
    pub fn matching_encoder(&self, codec: &str) -> Option<&MatchingEncoder> {
        self.matching_encoders.get(&codec.to_lowercase())
    }

    /// Full re-encode arguments for staying in the source container
    pub fn container_fallback(&self, container: &str) -> Option<&[String]> {
        self.container_fallbacks
            .get(&container.to_lowercase())
            .map(Vec::as_slice)
    }

    /// GIF width for a source: the configured width, capped at the source width
    pub fn gif_width(&self, source: &SourceProfile) -> u32 {
        source
            .width
            .map(|w| w.min(self.settings.gif_width))
            .unwrap_or(self.settings.gif_width)
    }
}

/// Packet copy of every stream
pub fn stream_copy_args() -> Vec<String> {
    args(&["-map", "0", "-c", "copy", "-avoid_negative_ts", "make_zero"])
}

/// Substitute the placeholders in a template argument list
pub fn render(template: &[String], gif_width: u32) -> Vec<String> {
    template
        .iter()
        .map(|arg| arg.replace(GIF_WIDTH_PLACEHOLDER, &gif_width.to_string()))
        .collect()
}
