//! Command-line argument definitions

use std::path::PathBuf;

use clap::{Args, ValueEnum};

use crate::domain::model::{OutputFormat, SaveMode};

/// Arguments for the probe command
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Input file, selections and output options shared by plan and cut
#[derive(Args, Debug, Clone)]
pub struct SelectionArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// What to do with the selections: keep, remove, split-selections, split-tags
    #[arg(short, long, default_value = "keep")]
    pub mode: SaveMode,

    /// Output format: original, mp4, mkv, avi, mp3, gif (default: last used)
    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Selected range START-END (HH:MM:SS.ms, MM:SS.ms, or seconds); repeatable
    #[arg(short, long = "range", value_name = "START-END")]
    pub ranges: Vec<String>,

    /// Tag point for split-tags; repeatable
    #[arg(short, long = "tag", value_name = "TIME")]
    pub tags: Vec<String>,

    /// Output file path for saves that produce a single file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory for generated output names (default: last used, else the input's directory)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

/// How the plan command prints its result
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintFormat {
    Text,
    Json,
    Yaml,
}

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Output format of the printed plan
    #[arg(long, value_enum, default_value = "text")]
    pub print: PrintFormat,

    /// Source duration; with this set the input is not probed
    #[arg(long)]
    pub duration: Option<String>,

    /// Comma-separated keyframe times, used with --duration
    #[arg(long, value_delimiter = ',', requires = "duration")]
    pub keyframes: Vec<String>,

    /// Source video codec, used with --duration
    #[arg(long, requires = "duration")]
    pub codec: Option<String>,

    /// Source pixel format, used with --duration (e.g. yuv420p)
    #[arg(long, requires = "duration")]
    pub pix_fmt: Option<String>,

    /// Source codec profile as ffprobe names it, used with --duration (e.g. High)
    #[arg(long, requires = "duration")]
    pub profile: Option<String>,

    /// Source frame rate as NUM/DEN or a number, used with --duration
    #[arg(long, requires = "duration")]
    pub frame_rate: Option<String>,

    /// Source container, used with --duration (default: input extension)
    #[arg(long, requires = "duration")]
    pub container: Option<String>,
}

/// Arguments for the cut command
#[derive(Args, Debug)]
pub struct CutArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
}
