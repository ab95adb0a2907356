//! Command implementations

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::adapters::{AppConfig, FfmpegExecAdapter, FfprobeAdapter, TomlConfigAdapter};
use crate::app::{CutInteractor, CutRequest, PreparedCut, SourceInfo};
use crate::cli::args::{CutArgs, PlanArgs, PrintFormat, ProbeArgs, SelectionArgs};
use crate::domain::model::SourceProfile;
use crate::engine::{CommandSynthesizer, ProgressEvent, ProgressKind, TemplateRegistry};
use crate::planner::{CutMode, KeyframeIndex};
use crate::utils::path::extension;
use crate::utils::time::{format_hms, TimeParser};

fn interactor(config: &AppConfig) -> CutInteractor {
    CutInteractor::new(
        Arc::new(FfprobeAdapter::new(&config.ffprobe_path)),
        Arc::new(FfmpegExecAdapter::new(
            &config.ffmpeg_path,
            &config.ffprobe_path,
            config.max_parallel,
        )),
        CommandSynthesizer::new(TemplateRegistry::with_defaults(config.encoding.clone())),
    )
}

/// Turn selection arguments into a cut request
fn build_request(args: &SelectionArgs, config: &AppConfig) -> Result<CutRequest> {
    let parser = TimeParser::new();
    let ranges = args
        .ranges
        .iter()
        .map(|r| parser.parse_span(r))
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid --range")?;
    let tags = args
        .tags
        .iter()
        .map(|t| parser.parse_time(t))
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid --tag")?;

    let output_dir = args
        .output_dir
        .clone()
        .or_else(|| config.last_output_dir.clone())
        .or_else(|| {
            args.input
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
        })
        .unwrap_or_else(|| PathBuf::from("."));

    Ok(CutRequest {
        input: args.input.clone(),
        save_mode: args.mode,
        format: args.format.unwrap_or(config.last_output_format),
        ranges,
        tags,
        output_dir,
        output_path: args.output.clone(),
        temp_root: None,
    })
}

/// Source description from command-line flags instead of a probe
fn offline_source(args: &PlanArgs) -> Result<Option<SourceInfo>> {
    let Some(duration) = &args.duration else {
        return Ok(None);
    };
    let parser = TimeParser::new();
    let duration = parser.parse_time(duration).context("Invalid --duration")?;
    let keyframes = args
        .keyframes
        .iter()
        .map(|k| parser.parse_time(k).map(|t| t as i64))
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid --keyframes")?;

    let container = args
        .container
        .clone()
        .or_else(|| extension(&args.selection.input))
        .unwrap_or_else(|| "mp4".to_string());
    let mut profile = SourceProfile::new(container);
    if let Some(codec) = &args.codec {
        profile = profile.with_video_codec(codec.as_str());
    }
    if let Some(pix_fmt) = &args.pix_fmt {
        profile = profile.with_pix_fmt(pix_fmt.as_str());
    }
    if let Some(name) = &args.profile {
        profile = profile.with_video_profile(name.as_str());
    }
    if let Some(rate) = &args.frame_rate {
        profile = profile.with_frame_rate(rate);
        if profile.frame_rate.is_none() {
            anyhow::bail!("Invalid --frame-rate: {}", rate);
        }
    }

    let index = KeyframeIndex::build(duration as i64, &keyframes)?;
    Ok(Some(SourceInfo { index, profile }))
}

/// Execute the probe command
pub async fn probe(args: ProbeArgs, config: &AppConfig) -> Result<()> {
    let source = interactor(config)
        .inspect(&args.input)
        .await
        .with_context(|| format!("Failed to probe {}", args.input.display()))?;

    if args.json {
        let json = serde_json::to_string_pretty(&source)
            .context("Failed to serialize probe result to JSON")?;
        println!("{}", json);
        return Ok(());
    }

    let profile = &source.profile;
    println!("File:      {}", args.input.display());
    println!("Duration:  {}", format_hms(source.index.duration()));
    println!("Container: {}", profile.container);
    println!(
        "Video:     {}",
        profile.video_codec.as_deref().unwrap_or("none")
    );
    if let (Some(w), Some(h)) = (profile.width, profile.height) {
        println!("Size:      {}x{}", w, h);
    }
    println!(
        "Stream:    {} / {} / {} fps",
        profile.pix_fmt.as_deref().unwrap_or("?"),
        profile.video_profile.as_deref().unwrap_or("?"),
        profile.frame_rate.as_deref().unwrap_or("?")
    );
    println!(
        "Audio:     {}",
        profile.audio_codec.as_deref().unwrap_or("none")
    );
    println!("Keyframes: {}", source.index.len());
    if let Some(stats) = source.index.gop_stats() {
        println!(
            "GOP:       avg {} / min {} / max {}",
            format_hms(stats.average),
            format_hms(stats.min),
            format_hms(stats.max)
        );
    }
    Ok(())
}

/// Execute the plan command
pub async fn plan(args: PlanArgs, config: &AppConfig) -> Result<()> {
    let interactor = interactor(config);
    let request = build_request(&args.selection, config)?;

    let source = match offline_source(&args)? {
        Some(source) => source,
        None => interactor
            .inspect(&request.input)
            .await
            .with_context(|| format!("Failed to probe {}", request.input.display()))?,
    };

    let prepared = interactor.prepare(&source, &request)?;
    match args.print {
        PrintFormat::Text => print!("{}", render_plan(&prepared, &config.ffmpeg_path)),
        PrintFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&prepared).context("Failed to serialize plan to JSON")?
        ),
        PrintFormat::Yaml => print!(
            "{}",
            serde_yaml::to_string(&prepared).context("Failed to serialize plan to YAML")?
        ),
    }
    Ok(())
}

/// Execute the cut command
pub async fn cut(args: CutArgs, mut config: AppConfig, store: &TomlConfigAdapter) -> Result<()> {
    let request = build_request(&args.selection, &config)?;
    let interactor = interactor(&config);

    let (progress_tx, progress_rx) = mpsc::unbounded_channel();
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let reporter = tokio::spawn(report_progress(progress_rx));
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            let _ = cancel_tx.send(true);
        }
    });

    let result = interactor.cut(&request, progress_tx, cancel_rx).await;
    let _ = reporter.await;
    let report = result.with_context(|| format!("Failed to cut {}", request.input.display()))?;

    for output in &report.outputs {
        println!("{}", output.display());
    }

    config.remember(request.format, &request.input, &request.output_dir);
    if let Err(e) = store.save(&config) {
        warn!("Could not save preferences: {}", e);
    }
    Ok(())
}

async fn report_progress(mut events: mpsc::UnboundedReceiver<ProgressEvent>) {
    let mut completed = 0;
    while let Some(event) = events.recv().await {
        match &event.kind {
            ProgressKind::Started => debug!("Step {}/{} started", event.step + 1, event.total_steps),
            ProgressKind::Advanced(_) => debug!(
                "Progress {:.0}%",
                event.overall_fraction(completed) * 100.0
            ),
            ProgressKind::Succeeded => {
                completed += 1;
                info!("Step {}/{} done", completed, event.total_steps);
            }
            ProgressKind::Failed(reason) => warn!("Step {} failed: {}", event.step + 1, reason),
            ProgressKind::Skipped => debug!("Step {} skipped", event.step + 1),
        }
    }
}

/// Human-readable plan listing
pub fn render_plan(prepared: &PreparedCut, ffmpeg: &Path) -> String {
    let plan = &prepared.plan;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Plan: {} as {} ({:?}), {} operation(s), transcode: {}",
        plan.save_mode(),
        plan.output_format(),
        plan.assembly(),
        plan.operations().len(),
        if plan.requires_transcode() { "yes" } else { "no" }
    );

    for (i, op) in plan.operations().iter().enumerate() {
        let mode = match (op.mode, op.escalated) {
            (CutMode::StreamCopy, _) => "copy",
            (CutMode::ReEncode, true) => "re-encode (escalated)",
            (CutMode::ReEncode, false) if op.is_edge_split() => "copy + re-encoded edges",
            (CutMode::ReEncode, false) => "re-encode",
        };
        let _ = writeln!(out, "  #{} {} {}", i, op.source_range, mode);
        if op.is_edge_split() {
            for segment in &op.segments {
                let kind = match segment.mode {
                    CutMode::StreamCopy => "copy",
                    CutMode::ReEncode => "encode",
                };
                let _ = writeln!(out, "      {:<6} {}", kind, segment.span);
            }
        }
    }

    let _ = writeln!(out, "Steps:");
    for step in &prepared.invocations.steps {
        let _ = writeln!(
            out,
            "  [{}] {:?} -> {}{}",
            step.step,
            step.role,
            step.output_path.display(),
            if step.depends_on.is_empty() {
                String::new()
            } else {
                format!(" (after {:?})", step.depends_on)
            }
        );
        let _ = writeln!(out, "      {} {}", ffmpeg.display(), step.args.join(" "));
    }

    let _ = writeln!(out, "Outputs:");
    for output in &prepared.invocations.outputs {
        let _ = writeln!(out, "  {}", output.display());
    }
    let _ = writeln!(out, "Duration: {}", format_hms(plan.output_duration()));
    out
}
