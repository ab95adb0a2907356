//! Translation of plans into external tool invocations

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::domain::model::Micros;

pub mod progress;
pub mod synthesizer;
pub mod templates;

pub use progress::{ProgressEvent, ProgressKind};
pub use synthesizer::{CommandSynthesizer, OutputTarget};
pub use templates::{
    EncodingSettings, FormatTemplate, JoinStrategy, MatchingEncoder, TemplateRegistry,
};

/// Which external tool a descriptor is for and what it produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    /// Read stream metadata or keyframe times
    Probe,
    /// Cut one segment out of the source
    Extract,
    /// Join pieces listed in a manifest
    Concat,
    /// Re-encode a joined intermediate into the final format
    Transcode,
}

impl Role {
    /// Whether the probing binary runs this step instead of the transcoder
    pub fn uses_probe_binary(&self) -> bool {
        matches!(self, Role::Probe)
    }
}

/// Concat demuxer input list written before its step runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConcatManifest {
    pub path: PathBuf,
    pub contents: String,
}

/// One external tool run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationDescriptor {
    /// Position in the invocation list
    pub step: usize,
    pub role: Role,
    pub input_paths: Vec<PathBuf>,
    pub output_path: PathBuf,
    /// Full argument vector, without the program name
    pub args: Vec<String>,
    pub is_lossless_hint: bool,
    /// Steps whose outputs this step reads
    pub depends_on: Vec<usize>,
    /// Output lives in the work directory and is removed afterwards
    pub is_temporary: bool,
    pub manifest: Option<ConcatManifest>,
    /// Media time this step writes, for progress fractions
    pub expected_duration: Micros,
}

/// Process-unique component of temp paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct WorkId {
    pub pid: u32,
    pub sequence: u64,
}

static NEXT_WORK_SEQUENCE: AtomicU64 = AtomicU64::new(1);

impl WorkId {
    /// Fresh id for one synthesis call
    pub fn next() -> Self {
        Self {
            pid: std::process::id(),
            sequence: NEXT_WORK_SEQUENCE.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn new(pid: u32, sequence: u64) -> Self {
        Self { pid, sequence }
    }
}

impl fmt::Display for WorkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.pid, self.sequence)
    }
}

/// Ordered descriptors for one plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocations {
    pub work_id: WorkId,
    /// Directory holding every temporary output and manifest
    pub work_dir: PathBuf,
    pub steps: Vec<InvocationDescriptor>,
    /// Final output files in operation order
    pub outputs: Vec<PathBuf>,
}

impl Invocations {
    pub fn is_lossless(&self) -> bool {
        self.steps.iter().all(|s| s.is_lossless_hint)
    }

    /// Steps with no unfinished dependency, given the finished set
    pub fn ready_steps<'a>(
        &'a self,
        finished: &'a [bool],
    ) -> impl Iterator<Item = &'a InvocationDescriptor> + 'a {
        self.steps.iter().filter(move |step| {
            !finished.get(step.step).copied().unwrap_or(false)
                && step
                    .depends_on
                    .iter()
                    .all(|&d| finished.get(d).copied().unwrap_or(false))
        })
    }
}
