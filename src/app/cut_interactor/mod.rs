// Cut interactor - probe, plan, synthesize and execute one save action

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::info;

use crate::domain::model::{Micros, OutputFormat, SaveMode, SourceProfile};
use crate::engine::{CommandSynthesizer, Invocations, OutputTarget, ProgressEvent};
use crate::error::{CutError, CutResult};
use crate::planner::{CutPlanner, KeyframeIndex, Plan};
use crate::ports::{ExecutePort, ExecutionReport, ProbePort, StepOutcome};
use crate::selection::SelectionSet;

/// One save action as requested by a front end
#[derive(Debug, Clone)]
pub struct CutRequest {
    pub input: PathBuf,
    pub save_mode: SaveMode,
    pub format: OutputFormat,
    pub ranges: Vec<(Micros, Micros)>,
    pub tags: Vec<Micros>,
    pub output_dir: PathBuf,
    pub output_path: Option<PathBuf>,
    /// Parent for the work directory; system temp dir when unset
    pub temp_root: Option<PathBuf>,
}

/// What planning needs to know about the source
#[derive(Debug, Clone, Serialize)]
pub struct SourceInfo {
    pub index: KeyframeIndex,
    pub profile: SourceProfile,
}

/// Plan and descriptors, ready to run or print
#[derive(Debug, Clone, Serialize)]
pub struct PreparedCut {
    pub plan: Plan,
    pub invocations: Invocations,
}

/// Interactor for the cut use case
pub struct CutInteractor {
    probe_port: Arc<dyn ProbePort>,
    execute_port: Arc<dyn ExecutePort>,
    synthesizer: CommandSynthesizer,
}

impl CutInteractor {
    /// Create new cut interactor with injected ports
    pub fn new(
        probe_port: Arc<dyn ProbePort>,
        execute_port: Arc<dyn ExecutePort>,
        synthesizer: CommandSynthesizer,
    ) -> Self {
        Self {
            probe_port,
            execute_port,
            synthesizer,
        }
    }

    /// Probe a file and validate the result into a keyframe index
    pub async fn inspect(&self, input: &Path) -> CutResult<SourceInfo> {
        let report = self.probe_port.probe(input).await?;
        let index = KeyframeIndex::build(report.duration_micros, &report.keyframes_micros)?;
        Ok(SourceInfo {
            index,
            profile: report.profile,
        })
    }

    /// Plan and synthesize without touching the filesystem
    pub fn prepare(&self, source: &SourceInfo, request: &CutRequest) -> CutResult<PreparedCut> {
        let selections = build_selections(request, source.index.duration())?;
        let planner = CutPlanner::new(source.profile.clone(), &self.synthesizer);
        let plan = planner.plan(&selections, &source.index, request.save_mode, request.format)?;

        let mut target = OutputTarget::new(&request.input, &request.output_dir);
        if let Some(path) = &request.output_path {
            target = target.with_output_path(path);
        }
        if let Some(root) = &request.temp_root {
            target = target.with_temp_root(root);
        }
        let invocations = self.synthesizer.synthesize(&plan, &target)?;

        Ok(PreparedCut { plan, invocations })
    }

    /// Execute a prepared cut; a failed step is an error
    pub async fn run(
        &self,
        prepared: &PreparedCut,
        progress: mpsc::UnboundedSender<ProgressEvent>,
        cancel: watch::Receiver<bool>,
    ) -> CutResult<ExecutionReport> {
        let report = self
            .execute_port
            .execute(&prepared.invocations, progress, cancel)
            .await?;

        if let Some((step, reason)) = report.outcomes.iter().enumerate().find_map(|(i, o)| match o {
            StepOutcome::Failed(reason) => Some((i, reason.clone())),
            _ => None,
        }) {
            return Err(CutError::Execution { step, reason });
        }

        info!("Wrote {} output file(s)", report.outputs.len());
        Ok(report)
    }

    /// Probe, plan, synthesize and execute
    pub async fn cut(
        &self,
        request: &CutRequest,
        progress: mpsc::UnboundedSender<ProgressEvent>,
        cancel: watch::Receiver<bool>,
    ) -> CutResult<ExecutionReport> {
        info!(
            "Starting {} of {} as {}",
            request.save_mode,
            request.input.display(),
            request.format
        );
        let source = self.inspect(&request.input).await?;
        let prepared = self.prepare(&source, request)?;
        self.run(&prepared, progress, cancel).await
    }
}

/// Selection set holding the requested ranges and tags
pub fn build_selections(request: &CutRequest, duration: Micros) -> CutResult<SelectionSet> {
    let mut selections = SelectionSet::new(duration);
    for &(start, end) in &request.ranges {
        selections.add_range(start, end)?;
    }
    for &tag in &request.tags {
        selections.add_tag(tag)?;
    }
    Ok(selections)
}
