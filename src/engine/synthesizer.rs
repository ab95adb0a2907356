//! Command synthesizer: Plan -> ordered invocation descriptors
//!
//! Pure translation. Nothing here touches the filesystem or spawns a
//! process; the only varying input is the work id in temp paths.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::domain::model::{Micros, OutputFormat, SourceProfile};
use crate::engine::templates::{render, JoinStrategy, TemplateRegistry};
use crate::engine::{ConcatManifest, InvocationDescriptor, Invocations, Role, WorkId};
use crate::error::{CutError, CutResult};
use crate::planner::{Assembly, CompatibilityCheck, CutMode, CutOperation, Plan, Segment};
use crate::utils::path::{manifest_quote, OutputNamer};
use crate::utils::time::format_seconds_arg;

/// Where outputs and temporaries go for one synthesis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    /// Explicit path for plans that produce exactly one file
    pub output_path: Option<PathBuf>,
    /// Parent of the per-synthesis work directory
    pub temp_root: PathBuf,
}

impl OutputTarget {
    pub fn new(input: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output_dir: output_dir.into(),
            output_path: None,
            temp_root: std::env::temp_dir(),
        }
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = root.into();
        self
    }
}

/// Maps plan operations to tool invocations using a template registry
#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    registry: TemplateRegistry,
}

/// Descriptor list under construction
struct StepList<'a> {
    input: &'a Path,
    work_dir: PathBuf,
    steps: Vec<InvocationDescriptor>,
}

impl<'a> StepList<'a> {
    fn extract(
        &mut self,
        segment: &Segment,
        codec_args: Vec<String>,
        output: PathBuf,
        is_temporary: bool,
    ) -> usize {
        let mut args = common_args();
        args.extend([
            "-ss".to_string(),
            format_seconds_arg(segment.decode_from),
            "-i".to_string(),
            self.input.to_string_lossy().to_string(),
        ]);
        let offset = segment.span.start - segment.decode_from;
        if offset > 0 {
            args.extend(["-ss".to_string(), format_seconds_arg(offset)]);
        }
        args.extend(["-t".to_string(), format_seconds_arg(segment.span.duration())]);
        args.extend(codec_args);
        args.push(output.to_string_lossy().to_string());

        self.push(InvocationDescriptor {
            step: 0,
            role: Role::Extract,
            input_paths: vec![self.input.to_path_buf()],
            output_path: output,
            args,
            is_lossless_hint: segment.mode == CutMode::StreamCopy,
            depends_on: Vec::new(),
            is_temporary,
            manifest: None,
            expected_duration: segment.span.duration(),
        })
    }

    fn concat(
        &mut self,
        pieces: &[(usize, PathBuf)],
        join_args: &[String],
        output: PathBuf,
        is_temporary: bool,
        expected_duration: Micros,
    ) -> usize {
        let manifest_path = self
            .work_dir
            .join(format!("concat-{}.txt", self.steps.len()));
        let inputs: Vec<PathBuf> = pieces.iter().map(|(_, path)| path.clone()).collect();

        let mut args = common_args();
        args.extend(
            ["-f", "concat", "-safe", "0", "-i"]
                .iter()
                .map(|s| s.to_string()),
        );
        args.push(manifest_path.to_string_lossy().to_string());
        args.extend(join_args.iter().cloned());
        args.push(output.to_string_lossy().to_string());

        self.push(InvocationDescriptor {
            step: 0,
            role: Role::Concat,
            manifest: Some(ConcatManifest {
                path: manifest_path,
                contents: concat_manifest(&inputs),
            }),
            input_paths: inputs,
            output_path: output,
            args,
            is_lossless_hint: true,
            depends_on: pieces.iter().map(|(step, _)| *step).collect(),
            is_temporary,
            expected_duration,
        })
    }

    fn transcode(
        &mut self,
        source: (usize, PathBuf),
        codec_args: Vec<String>,
        output: PathBuf,
        expected_duration: Micros,
    ) -> usize {
        let (depends_on, input) = source;
        let mut args = common_args();
        args.extend(["-i".to_string(), input.to_string_lossy().to_string()]);
        args.extend(codec_args);
        args.push(output.to_string_lossy().to_string());

        self.push(InvocationDescriptor {
            step: 0,
            role: Role::Transcode,
            input_paths: vec![input],
            output_path: output,
            args,
            is_lossless_hint: false,
            depends_on: vec![depends_on],
            is_temporary: false,
            manifest: None,
            expected_duration,
        })
    }

    fn push(&mut self, mut descriptor: InvocationDescriptor) -> usize {
        let step = self.steps.len();
        descriptor.step = step;
        debug!(
            "Step {}: {:?} -> {}",
            step,
            descriptor.role,
            descriptor.output_path.display()
        );
        self.steps.push(descriptor);
        step
    }

    fn temp(&self, name: String) -> PathBuf {
        self.work_dir.join(name)
    }
}

fn common_args() -> Vec<String> {
    ["-hide_banner", "-nostdin", "-y"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Concat demuxer manifest listing `paths` in order
pub fn concat_manifest(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("file {}\n", manifest_quote(p)))
        .collect()
}

impl CommandSynthesizer {
    pub fn new(registry: TemplateRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// Descriptors for a plan, with a fresh work id
    pub fn synthesize(&self, plan: &Plan, target: &OutputTarget) -> CutResult<Invocations> {
        self.synthesize_with_work_id(plan, target, WorkId::next())
    }

    /// Descriptors for a plan under a caller-chosen work id
    pub fn synthesize_with_work_id(
        &self,
        plan: &Plan,
        target: &OutputTarget,
        work_id: WorkId,
    ) -> CutResult<Invocations> {
        let template = self.registry.template(plan.output_format())?;
        self.check(plan)?;

        let outputs = self.output_paths(plan, target);
        let mut list = StepList {
            input: &target.input,
            work_dir: target.temp_root.join(format!("keycut-{}", work_id)),
            steps: Vec::new(),
        };
        let piece_extension = self.piece_extension(plan);

        match plan.assembly() {
            Assembly::SingleOutput | Assembly::OneFilePerOperation => {
                for ((position, op), output) in plan.operations().iter().enumerate().zip(&outputs) {
                    if let [segment] = op.segments.as_slice() {
                        let codec_args = self.segment_args(plan, op, segment, false)?;
                        list.extract(segment, codec_args, output.clone(), false);
                        continue;
                    }

                    let mut pieces = Vec::with_capacity(op.segments.len());
                    for (j, segment) in op.segments.iter().enumerate() {
                        let codec_args = self.segment_args(plan, op, segment, true)?;
                        let path = list.temp(format!("op{}-seg{}.{}", position, j, piece_extension));
                        pieces.push((list.extract(segment, codec_args, path.clone(), true), path));
                    }
                    let join_args = self.copy_join_args(plan.output_format())?;
                    list.concat(
                        &pieces,
                        &join_args,
                        output.clone(),
                        false,
                        op.source_range.duration(),
                    );
                }
            }
            Assembly::ConcatenateAll => {
                let mut pieces = Vec::new();
                for (position, op) in plan.operations().iter().enumerate() {
                    for (j, segment) in op.segments.iter().enumerate() {
                        let codec_args = self.segment_args(plan, op, segment, true)?;
                        let path = list.temp(format!("op{}-seg{}.{}", position, j, piece_extension));
                        pieces.push((list.extract(segment, codec_args, path.clone(), true), path));
                    }
                }

                let total = plan.output_duration();
                let output = outputs.first().cloned().unwrap_or_default();
                match &template.join {
                    JoinStrategy::CopyJoin { args } => {
                        list.concat(&pieces, args, output, false, total);
                    }
                    JoinStrategy::JoinThenTranscode {
                        intermediate_extension,
                        ..
                    } => {
                        let joined = list.temp(format!("joined.{}", intermediate_extension));
                        let copy = vec!["-c".to_string(), "copy".to_string()];
                        let step = list.concat(&pieces, &copy, joined.clone(), true, total);
                        let codec_args = self.final_args(plan)?;
                        list.transcode((step, joined), codec_args, output, total);
                    }
                }
            }
        }

        info!(
            "Synthesized {} step(s) for {} output(s) in work dir {}",
            list.steps.len(),
            outputs.len(),
            list.work_dir.display()
        );

        Ok(Invocations {
            work_id,
            work_dir: list.work_dir,
            steps: list.steps,
            outputs,
        })
    }

    /// Descriptors for reading stream metadata and keyframe times of `input`
    pub fn probe_invocations(input: &Path) -> Vec<InvocationDescriptor> {
        let path = input.to_string_lossy().to_string();
        let probe = |step: usize, args: &[&str]| {
            let mut all: Vec<String> = args.iter().map(|s| s.to_string()).collect();
            all.push(path.clone());
            InvocationDescriptor {
                step,
                role: Role::Probe,
                input_paths: vec![input.to_path_buf()],
                output_path: PathBuf::from("-"),
                args: all,
                is_lossless_hint: true,
                depends_on: Vec::new(),
                is_temporary: false,
                manifest: None,
                expected_duration: 0,
            }
        };

        vec![
            probe(
                0,
                &["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"],
            ),
            probe(
                1,
                &[
                    "-v", "error", "-skip_frame", "nokey", "-select_streams", "v:0",
                    "-show_entries", "frame=pts_time", "-of", "csv=p=0",
                ],
            ),
        ]
    }

    /// Final output paths in operation order
    pub fn output_paths(&self, plan: &Plan, target: &OutputTarget) -> Vec<PathBuf> {
        let extension = plan.output_format().extension(plan.source());
        let namer = OutputNamer::new(&target.input, &target.output_dir);
        let single = match plan.assembly() {
            Assembly::OneFilePerOperation => plan.operations().len() == 1,
            _ => true,
        };

        if single {
            if let Some(path) = &target.output_path {
                return vec![path.clone()];
            }
        }

        match plan.assembly() {
            Assembly::SingleOutput | Assembly::ConcatenateAll => {
                vec![namer.joined(plan.save_mode(), extension)]
            }
            Assembly::OneFilePerOperation => (0..plan.operations().len())
                .map(|i| namer.part(plan.save_mode(), i, extension))
                .collect(),
        }
    }

    /// Container of intermediate pieces
    fn piece_extension(&self, plan: &Plan) -> String {
        let format = plan.output_format();
        match self.registry.template(format).map(|t| &t.join) {
            Ok(JoinStrategy::JoinThenTranscode {
                intermediate_extension,
                ..
            }) if plan.assembly() == Assembly::ConcatenateAll => intermediate_extension.clone(),
            _ => format.extension(plan.source()).to_string(),
        }
    }

    /// Codec arguments for one segment; `joined` when it ends up in a concat
    fn segment_args(
        &self,
        plan: &Plan,
        op: &CutOperation,
        segment: &Segment,
        joined: bool,
    ) -> CutResult<Vec<String>> {
        let format = plan.output_format();
        let template = self.registry.template(format)?;
        let gif_width = self.registry.gif_width(plan.source());

        if format != OutputFormat::Original {
            return Ok(match (&template.join, joined) {
                (
                    JoinStrategy::JoinThenTranscode {
                        intermediate_args, ..
                    },
                    true,
                ) if plan.assembly() == Assembly::ConcatenateAll => intermediate_args.clone(),
                _ => render(&template.codec_args, gif_width),
            });
        }

        if segment.mode == CutMode::StreamCopy {
            return Ok(template.codec_args.clone());
        }

        let source = plan.source();
        match (op.escalated, self.sliver_args(source)) {
            (false, Ok(encoder_args)) => {
                let mut args = vec!["-map".to_string(), "0".to_string()];
                args.extend(encoder_args);
                args.extend(["-c:a", "copy", "-c:s", "copy"].iter().map(|s| s.to_string()));
                Ok(args)
            }
            (false, Err(reason)) if joined => Err(CutError::CodecIncompatible {
                operation: plan
                    .operations()
                    .iter()
                    .position(|o| o == op)
                    .unwrap_or(0),
                reason,
            }),
            _ => self
                .registry
                .container_fallback(&source.container)
                .map(|args| args.to_vec())
                .ok_or_else(|| CutError::UnsupportedFormat {
                    format: format!("original ({} re-encode)", source.container),
                }),
        }
    }

    /// Encoder arguments for slivers that must join copied source packets
    fn sliver_args(&self, source: &SourceProfile) -> Result<Vec<String>, String> {
        let codec = source
            .video_codec
            .as_deref()
            .ok_or_else(|| "source codec unknown".to_string())?;
        self.registry
            .matching_encoder(codec)
            .ok_or_else(|| format!("no encoder matches source codec {}", codec))?
            .stream_args(source)
    }

    fn copy_join_args(&self, format: OutputFormat) -> CutResult<Vec<String>> {
        match &self.registry.template(format)?.join {
            JoinStrategy::CopyJoin { args } => Ok(args.clone()),
            JoinStrategy::JoinThenTranscode { .. } => Ok(vec!["-c".to_string(), "copy".to_string()]),
        }
    }

    fn final_args(&self, plan: &Plan) -> CutResult<Vec<String>> {
        let template = self.registry.template(plan.output_format())?;
        Ok(render(
            &template.codec_args,
            self.registry.gif_width(plan.source()),
        ))
    }
}

impl CompatibilityCheck for CommandSynthesizer {
    /// Original-format joins must not mix stream parameters.
    ///
    /// Re-encoded pieces joined with copied packets need an encoder that
    /// matches the source codec and can reproduce its pixel format, profile
    /// and frame rate. A concatenation is either fully escalated or not
    /// escalated at all.
    fn check(&self, plan: &Plan) -> CutResult<()> {
        if plan.output_format() != OutputFormat::Original {
            return Ok(());
        }

        let operations = plan.operations();
        let joins_all = plan.assembly() == Assembly::ConcatenateAll && operations.len() > 1;
        let sliver = self.sliver_args(plan.source());

        for (i, op) in operations.iter().enumerate() {
            if op.escalated || !op.has_reencoded_segment() {
                continue;
            }
            if let (true, Err(reason)) = (op.is_edge_split() || joins_all, &sliver) {
                return Err(CutError::CodecIncompatible {
                    operation: i,
                    reason: reason.clone(),
                });
            }
        }

        if joins_all {
            let escalated = operations.iter().filter(|op| op.escalated).count();
            if escalated > 0 && escalated < operations.len() {
                if let Some(i) = operations.iter().position(|op| !op.escalated) {
                    return Err(CutError::CodecIncompatible {
                        operation: i,
                        reason: "joined with fully re-encoded operations".to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
