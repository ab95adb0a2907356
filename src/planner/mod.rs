//! Cut planning: keyframe index, edge splitting and the planner itself

use serde::Serialize;

use crate::domain::model::{Micros, OutputFormat, SaveMode, SourceProfile, TimeSpan};
use crate::error::CutResult;

pub mod gop;
pub mod keyframe_index;
pub mod strategy;

pub use keyframe_index::{GopStats, KeyframeIndex};
pub use strategy::CutPlanner;

/// How a piece of the source reaches the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CutMode {
    /// Lossless packet copy; only valid between cut points
    StreamCopy,
    /// Decode and recompress
    ReEncode,
}

/// How the operations of a plan become output files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Assembly {
    /// Exactly one operation, one output
    SingleOutput,
    /// All operations joined in sequence into one output
    ConcatenateAll,
    /// Each operation is its own output
    OneFilePerOperation,
}

/// One contiguous extraction from the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub span: TimeSpan,
    pub mode: CutMode,
    /// Where decoding starts; the keyframe at or before `span.start` for
    /// re-encoded pieces, `span.start` itself for copies
    pub decode_from: Micros,
}

impl Segment {
    pub fn copy(span: TimeSpan) -> Self {
        Self {
            span,
            mode: CutMode::StreamCopy,
            decode_from: span.start,
        }
    }

    pub fn reencode(span: TimeSpan, decode_from: Micros) -> Self {
        Self {
            span,
            mode: CutMode::ReEncode,
            decode_from: decode_from.min(span.start),
        }
    }
}

/// One planned output unit: a source range and how to produce it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CutOperation {
    pub source_range: TimeSpan,
    pub mode: CutMode,
    /// Position in the final concatenation, if the plan joins operations
    pub sequence_index: Option<usize>,
    /// Pieces in source order; several when only the edges are re-encoded
    pub segments: Vec<Segment>,
    /// Video is dropped from the output
    pub audio_only: bool,
    /// Re-encoded whole after a codec compatibility failure
    pub escalated: bool,
}

impl CutOperation {
    /// Stream copy pieces joined with re-encoded edge pieces
    pub fn is_edge_split(&self) -> bool {
        self.segments.len() > 1
    }

    pub fn has_reencoded_segment(&self) -> bool {
        self.segments.iter().any(|s| s.mode == CutMode::ReEncode)
    }
}

/// Ordered, mode-annotated operations for one save action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    save_mode: SaveMode,
    operations: Vec<CutOperation>,
    assembly: Assembly,
    output_format: OutputFormat,
    source: SourceProfile,
    source_duration: Micros,
}

impl Plan {
    pub(crate) fn new(
        save_mode: SaveMode,
        operations: Vec<CutOperation>,
        assembly: Assembly,
        output_format: OutputFormat,
        source: SourceProfile,
        source_duration: Micros,
    ) -> Self {
        Self {
            save_mode,
            operations,
            assembly,
            output_format,
            source,
            source_duration,
        }
    }

    pub fn save_mode(&self) -> SaveMode {
        self.save_mode
    }

    pub fn operations(&self) -> &[CutOperation] {
        &self.operations
    }

    pub fn assembly(&self) -> Assembly {
        self.assembly
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn source(&self) -> &SourceProfile {
        &self.source
    }

    pub fn source_duration(&self) -> Micros {
        self.source_duration
    }

    /// True if any operation re-encodes or the container changes
    pub fn requires_transcode(&self) -> bool {
        self.operations.iter().any(|op| op.mode == CutMode::ReEncode)
            || self.output_format.extension(&self.source) != self.source.container
    }

    /// Total source time covered by the plan
    pub fn output_duration(&self) -> Micros {
        self.operations
            .iter()
            .map(|op| op.source_range.duration())
            .sum()
    }

    /// A new plan with operation `index` re-encoded as a single piece
    pub(crate) fn escalate(&self, index: usize) -> Plan {
        let mut escalated = self.clone();
        if let Some(op) = escalated.operations.get_mut(index) {
            let decode_from = op
                .segments
                .first()
                .map(|s| s.decode_from)
                .unwrap_or(op.source_range.start);
            op.mode = CutMode::ReEncode;
            op.segments = vec![Segment::reencode(op.source_range, decode_from)];
            op.escalated = true;
        }
        escalated
    }
}

/// Pre-concatenation codec check consulted before a plan is finalized
pub trait CompatibilityCheck {
    /// `Err(CodecIncompatible)` names the operation to escalate
    fn check(&self, plan: &Plan) -> CutResult<()>;
}
