//! FFmpeg execution adapter
//!
//! Runs synthesized invocations as child processes. Steps whose
//! dependencies have succeeded run concurrently, bounded by a semaphore;
//! the work directory is removed however the run ends. Outputs of steps
//! that started but did not succeed are deleted on failure or cancel.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::engine::progress::{error_snippet, parse_progress_line, step_fraction};
use crate::engine::{InvocationDescriptor, Invocations, ProgressEvent, ProgressKind, Role};
use crate::error::{CutError, CutResult};
use crate::ports::{ExecutePort, ExecutionReport, StepOutcome};

/// Stderr lines kept per step for error reports
const STDERR_TAIL: usize = 200;

/// FFmpeg-based execution adapter
#[derive(Debug, Clone)]
pub struct FfmpegExecAdapter {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    max_parallel: usize,
    progress_args: Vec<String>,
}

impl FfmpegExecAdapter {
    /// Create new FFmpeg adapter running at most `max_parallel` steps at once
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>, max_parallel: usize) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            max_parallel: max_parallel.max(1),
            progress_args: ["-progress", "pipe:1", "-nostats"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Replace the arguments that make the transcoder report progress on stdout
    pub fn with_progress_args(mut self, args: Vec<String>) -> Self {
        self.progress_args = args;
        self
    }

    fn program(&self, role: Role) -> &Path {
        if role.uses_probe_binary() {
            &self.ffprobe
        } else {
            &self.ffmpeg
        }
    }

    async fn run_steps(
        &self,
        invocations: &Invocations,
        progress: &mpsc::UnboundedSender<ProgressEvent>,
        mut cancel: watch::Receiver<bool>,
    ) -> CutResult<ExecutionReport> {
        let total = invocations.steps.len();
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let mut outcomes: Vec<Option<StepOutcome>> = vec![None; total];
        let mut succeeded = vec![false; total];
        let mut launched = vec![false; total];
        let mut join_set = JoinSet::new();
        let mut failed = false;
        let mut cancelled = *cancel.borrow();
        let mut cancel_open = true;

        loop {
            if !failed && !cancelled {
                let ready: Vec<InvocationDescriptor> = invocations
                    .ready_steps(&succeeded)
                    .filter(|s| !launched[s.step])
                    .cloned()
                    .collect();

                for step in ready {
                    launched[step.step] = true;
                    let mut args = if step.role.uses_probe_binary() {
                        Vec::new()
                    } else {
                        self.progress_args.clone()
                    };
                    args.extend(step.args.iter().cloned());

                    let program = self.program(step.role).to_path_buf();
                    let sender = progress.clone();
                    let semaphore = Arc::clone(&semaphore);
                    join_set.spawn(async move {
                        let index = step.step;
                        let result = match semaphore.acquire_owned().await {
                            Ok(_permit) => run_step(&program, &args, &step, total, &sender).await,
                            Err(_) => Err("worker pool closed".to_string()),
                        };
                        (index, result)
                    });
                }
            }

            if join_set.is_empty() {
                break;
            }

            tokio::select! {
                joined = join_set.join_next() => match joined {
                    Some(Ok((index, Ok(())))) => {
                        succeeded[index] = true;
                        outcomes[index] = Some(StepOutcome::Succeeded);
                        let _ = progress.send(ProgressEvent::new(index, total, ProgressKind::Succeeded));
                    }
                    Some(Ok((index, Err(reason)))) => {
                        warn!("Step {} failed: {}", index, reason);
                        let _ = progress.send(ProgressEvent::new(
                            index,
                            total,
                            ProgressKind::Failed(reason.clone()),
                        ));
                        outcomes[index] = Some(StepOutcome::Failed(reason));
                        failed = true;
                    }
                    Some(Err(e)) if e.is_cancelled() => {}
                    Some(Err(e)) => {
                        warn!("Worker task ended abnormally: {}", e);
                        failed = true;
                    }
                    None => {}
                },
                changed = cancel.changed(), if cancel_open => match changed {
                    Ok(()) => {
                        if *cancel.borrow() && !cancelled {
                            info!("Cancelling run, killing {} running step(s)", join_set.len());
                            cancelled = true;
                            join_set.abort_all();
                        }
                    }
                    Err(_) => cancel_open = false,
                },
            }
        }

        let outcomes: Vec<StepOutcome> = outcomes
            .into_iter()
            .enumerate()
            .map(|(index, outcome)| {
                outcome.unwrap_or_else(|| {
                    let _ = progress.send(ProgressEvent::new(index, total, ProgressKind::Skipped));
                    StepOutcome::Skipped
                })
            })
            .collect();

        if failed || cancelled {
            let unfinished = invocations
                .steps
                .iter()
                .filter(|s| launched[s.step] && !succeeded[s.step]);
            remove_partial_outputs(unfinished).await;
        }
        if cancelled {
            return Err(CutError::Cancelled);
        }

        Ok(ExecutionReport {
            outcomes,
            outputs: invocations.outputs.clone(),
        })
    }
}

/// Two steps writing the same file would race
fn check_unique_outputs(invocations: &Invocations) -> CutResult<()> {
    let mut seen = HashSet::new();
    for step in &invocations.steps {
        if step.role == Role::Probe {
            continue;
        }
        if !seen.insert(&step.output_path) {
            return Err(CutError::Execution {
                step: step.step,
                reason: format!(
                    "output {} is written by more than one step",
                    step.output_path.display()
                ),
            });
        }
    }
    Ok(())
}

async fn run_step(
    program: &Path,
    args: &[String],
    step: &InvocationDescriptor,
    total: usize,
    progress: &mpsc::UnboundedSender<ProgressEvent>,
) -> Result<(), String> {
    let _ = progress.send(ProgressEvent::new(step.step, total, ProgressKind::Started));

    if let Some(manifest) = &step.manifest {
        tokio::fs::write(&manifest.path, &manifest.contents)
            .await
            .map_err(|e| format!("cannot write {}: {}", manifest.path.display(), e))?;
    }

    debug!("Running {} {}", program.display(), args.join(" "));
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| format!("failed to start {}: {}", program.display(), e))?;

    let stderr_task = child.stderr.take().map(|stderr| {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut tail: Vec<String> = Vec::new();
            while let Ok(Some(line)) = lines.next_line().await {
                if tail.len() == STDERR_TAIL {
                    tail.remove(0);
                }
                tail.push(line);
            }
            tail
        })
    });

    if let Some(stdout) = child.stdout.take() {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(position) = parse_progress_line(&line) {
                let fraction = step_fraction(position, step.expected_duration);
                let _ = progress.send(ProgressEvent::new(
                    step.step,
                    total,
                    ProgressKind::Advanced(fraction),
                ));
            }
        }
    }

    let status = child
        .wait()
        .await
        .map_err(|e| format!("failed to wait for {}: {}", program.display(), e))?;
    let stderr = match stderr_task {
        Some(handle) => handle.await.unwrap_or_default(),
        None => Vec::new(),
    };

    if status.success() {
        Ok(())
    } else {
        Err(format!("exited with {}: {}", status, error_snippet(&stderr)))
    }
}

/// Delete what interrupted steps left at their final destinations
async fn remove_partial_outputs<'a>(steps: impl Iterator<Item = &'a InvocationDescriptor>) {
    for step in steps.filter(|s| !s.is_temporary && s.role != Role::Probe) {
        match tokio::fs::remove_file(&step.output_path).await {
            Ok(()) => info!("Removed partial output {}", step.output_path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Could not remove partial output {}: {}",
                step.output_path.display(),
                e
            ),
        }
    }
}

async fn remove_work_dir(work_dir: &Path) {
    match tokio::fs::remove_dir_all(work_dir).await {
        Ok(()) => debug!("Removed work dir {}", work_dir.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove work dir {}: {}", work_dir.display(), e),
    }
}

#[async_trait]
impl ExecutePort for FfmpegExecAdapter {
    async fn execute(
        &self,
        invocations: &Invocations,
        progress: mpsc::UnboundedSender<ProgressEvent>,
        cancel: watch::Receiver<bool>,
    ) -> CutResult<ExecutionReport> {
        check_unique_outputs(invocations)?;

        tokio::fs::create_dir_all(&invocations.work_dir).await?;
        for output in &invocations.outputs {
            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        info!(
            "Executing {} step(s), up to {} at a time",
            invocations.steps.len(),
            self.max_parallel
        );
        let result = self.run_steps(invocations, &progress, cancel).await;
        remove_work_dir(&invocations.work_dir).await;
        result
    }
}
