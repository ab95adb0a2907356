// Ports - Interface definitions (contracts)

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{mpsc, watch};

use crate::domain::model::SourceProfile;
use crate::engine::{Invocations, ProgressEvent};
use crate::error::CutResult;

/// Raw probe result, before it is validated into a keyframe index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeReport {
    pub path: PathBuf,
    /// As reported; may be zero or negative for broken files
    pub duration_micros: i64,
    /// Keyframe presentation times of the first video stream
    pub keyframes_micros: Vec<i64>,
    pub profile: SourceProfile,
}

/// Port for media file probing
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Read duration, keyframe times and codec profile of `path`
    async fn probe(&self, path: &Path) -> CutResult<ProbeReport>;
}

/// Outcome of one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StepOutcome {
    Succeeded,
    Failed(String),
    /// Never launched because of a failure or cancellation elsewhere
    Skipped,
}

/// Per-step outcomes of one plan run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub outcomes: Vec<StepOutcome>,
    pub outputs: Vec<PathBuf>,
}

impl ExecutionReport {
    pub fn succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| *o == StepOutcome::Succeeded)
    }
}

/// Port for running synthesized invocations
#[async_trait]
pub trait ExecutePort: Send + Sync {
    /// Run every step, honoring dependencies, until done, failed or cancelled.
    ///
    /// Setting `cancel` to `true` stops launching steps and kills running ones.
    async fn execute(
        &self,
        invocations: &Invocations,
        progress: mpsc::UnboundedSender<ProgressEvent>,
        cancel: watch::Receiver<bool>,
    ) -> CutResult<ExecutionReport>;
}
