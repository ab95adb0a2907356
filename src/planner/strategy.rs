//! Cut planner: selections + keyframes + save mode + format -> Plan

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::domain::model::{Micros, OutputFormat, SaveMode, SourceProfile, TimeSpan};
use crate::error::{CutError, CutResult};
use crate::planner::gop::edge_split;
use crate::planner::{Assembly, CompatibilityCheck, CutMode, CutOperation, KeyframeIndex, Plan, Segment};
use crate::selection::{Complement, SelectionSet};

/// Planner for one probed source
pub struct CutPlanner<'a> {
    source: SourceProfile,
    compatibility: &'a dyn CompatibilityCheck,
}

impl<'a> CutPlanner<'a> {
    /// Create a planner that finalizes plans against `compatibility`
    pub fn new(source: SourceProfile, compatibility: &'a dyn CompatibilityCheck) -> Self {
        Self {
            source,
            compatibility,
        }
    }

    /// Build a finalized plan for one save action
    pub fn plan(
        &self,
        selections: &SelectionSet,
        index: &KeyframeIndex,
        save_mode: SaveMode,
        format: OutputFormat,
    ) -> CutResult<Plan> {
        info!(
            "Planning {} as {} ({} ranges, {} tags)",
            save_mode,
            format,
            selections.ranges().len(),
            selections.tag_count()
        );

        let (spans, assembly) = match save_mode {
            SaveMode::KeepSelections => {
                let spans = self.selected_spans(selections, index, save_mode)?;
                let assembly = if spans.len() > 1 {
                    Assembly::ConcatenateAll
                } else {
                    Assembly::SingleOutput
                };
                (spans, assembly)
            }
            SaveMode::RemoveSelections => {
                let remaining = match selections.complement(index.duration()) {
                    Complement::Gaps(gaps) => gaps,
                    Complement::Empty => {
                        return Err(CutError::EmptySelection {
                            mode: save_mode.to_string(),
                            reason: "selections cover the whole source".to_string(),
                        })
                    }
                };
                let spans = self.selected_spans(&remaining, index, save_mode)?;
                let assembly = if spans.len() > 1 {
                    Assembly::ConcatenateAll
                } else {
                    Assembly::SingleOutput
                };
                (spans, assembly)
            }
            SaveMode::SplitBySelections => (
                self.selected_spans(selections, index, save_mode)?,
                Assembly::OneFilePerOperation,
            ),
            SaveMode::SplitByTags => (
                self.tag_spans(selections, index)?,
                Assembly::OneFilePerOperation,
            ),
        };

        let operations = spans
            .into_iter()
            .enumerate()
            .map(|(i, span)| self.plan_operation(i, span, index, format, assembly))
            .collect();

        let plan = Plan::new(
            save_mode,
            operations,
            assembly,
            format,
            self.source.clone(),
            index.duration(),
        );
        self.finalize(plan)
    }

    /// Normalized ranges, bounded by the indexed duration
    fn selected_spans(
        &self,
        selections: &SelectionSet,
        index: &KeyframeIndex,
        save_mode: SaveMode,
    ) -> CutResult<Vec<TimeSpan>> {
        let spans = selections.normalized().spans();
        if spans.is_empty() {
            return Err(CutError::EmptySelection {
                mode: save_mode.to_string(),
                reason: "no ranges selected".to_string(),
            });
        }
        if let Some(past_end) = spans.iter().find(|s| s.end > index.duration()) {
            return Err(CutError::invalid_range(
                past_end.start,
                past_end.end,
                format!("range ends past the source duration {}us", index.duration()),
            ));
        }
        Ok(spans)
    }

    /// Consecutive parts between keyframe-snapped tag points and the file bounds
    fn tag_spans(&self, selections: &SelectionSet, index: &KeyframeIndex) -> CutResult<Vec<TimeSpan>> {
        if selections.tag_count() == 0 {
            return Err(CutError::InvalidTagAlignment);
        }

        let duration = index.duration();
        let mut boundaries: BTreeSet<Micros> = BTreeSet::from([0, duration]);
        for tag in selections.tags() {
            let snapped = if index.is_cut_point(tag) {
                tag
            } else {
                index.nearest_at_or_after(tag)
            };
            if snapped != tag {
                debug!("Tag {}us snapped forward to keyframe {}us", tag, snapped);
            }
            boundaries.insert(snapped.min(duration));
        }

        let boundaries: Vec<Micros> = boundaries.into_iter().collect();
        Ok(boundaries
            .windows(2)
            .map(|w| TimeSpan {
                start: w[0],
                end: w[1],
            })
            .collect())
    }

    fn plan_operation(
        &self,
        position: usize,
        span: TimeSpan,
        index: &KeyframeIndex,
        format: OutputFormat,
        assembly: Assembly,
    ) -> CutOperation {
        let segments = if format.forces_reencode() {
            vec![Segment::reencode(span, index.nearest_at_or_before(span.start))]
        } else if index.is_cut_point(span.start) && index.is_cut_point(span.end) {
            vec![Segment::copy(span)]
        } else {
            edge_split(span, index)
        };

        let mode = if segments.iter().all(|s| s.mode == CutMode::StreamCopy) {
            CutMode::StreamCopy
        } else {
            CutMode::ReEncode
        };

        debug!(
            "Operation {}: {} {:?} in {} piece(s)",
            position,
            span,
            mode,
            segments.len()
        );

        CutOperation {
            source_range: span,
            mode,
            sequence_index: (assembly == Assembly::ConcatenateAll).then_some(position),
            segments,
            audio_only: format.is_audio_only(),
            escalated: false,
        }
    }

    /// Escalate operations flagged by the compatibility check until none are
    fn finalize(&self, mut plan: Plan) -> CutResult<Plan> {
        for _ in 0..=plan.operations().len() {
            match self.compatibility.check(&plan) {
                Ok(()) => {
                    info!(
                        "Plan ready: {} operation(s), {:?}, transcode required: {}",
                        plan.operations().len(),
                        plan.assembly(),
                        plan.requires_transcode()
                    );
                    return Ok(plan);
                }
                Err(CutError::CodecIncompatible { operation, reason }) => {
                    let already = plan
                        .operations()
                        .get(operation)
                        .map(|op| op.escalated)
                        .unwrap_or(true);
                    if already {
                        return Err(CutError::CodecIncompatible { operation, reason });
                    }
                    warn!("Re-encoding operation {} in full: {}", operation, reason);
                    plan = plan.escalate(operation);
                }
                Err(e) => return Err(e),
            }
        }

        Err(CutError::CodecIncompatible {
            operation: 0,
            reason: "escalation did not converge".to_string(),
        })
    }
}
