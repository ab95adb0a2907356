//! User selections: time ranges and tag points
//!
//! This is the only mutation surface the core exposes to a front end.
//! Ranges are kept normalized (sorted, overlap-merged) after every
//! mutation; tags are stored as clicked and snapped at plan time.

use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::model::{Micros, TimeSpan};
use crate::error::{CutError, CutResult};

/// Undo steps kept; older snapshots are dropped
pub const UNDO_LIMIT: usize = 100;

/// Stable handle for one user-drawn range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SelectionId(u64);

/// One user-drawn range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub id: SelectionId,
    pub span: TimeSpan,
}

#[derive(Debug, Clone)]
struct Snapshot {
    ranges: Vec<Selection>,
    tags: BTreeSet<Micros>,
}

/// Ranges and tag points for one loaded source
#[derive(Debug, Clone)]
pub struct SelectionSet {
    duration: Micros,
    ranges: Vec<Selection>,
    tags: BTreeSet<Micros>,
    next_id: u64,
    history: VecDeque<Snapshot>,
}

/// Result of inverting a selection set against the source duration
#[derive(Debug, Clone, PartialEq)]
pub enum Complement {
    /// The gaps between the selections and the file bounds
    Gaps(SelectionSet),
    /// The selections cover the whole source; nothing remains
    Empty,
}

impl Complement {
    pub fn is_empty(&self) -> bool {
        matches!(self, Complement::Empty)
    }

    pub fn into_set(self) -> Option<SelectionSet> {
        match self {
            Complement::Gaps(set) => Some(set),
            Complement::Empty => None,
        }
    }
}

impl SelectionSet {
    /// Empty selection set for a source of `duration` microseconds
    pub fn new(duration: Micros) -> Self {
        Self {
            duration,
            ranges: Vec::new(),
            tags: BTreeSet::new(),
            next_id: 1,
            history: VecDeque::new(),
        }
    }

    pub fn duration(&self) -> Micros {
        self.duration
    }

    /// Current ranges, normalized
    pub fn ranges(&self) -> &[Selection] {
        &self.ranges
    }

    pub fn spans(&self) -> Vec<TimeSpan> {
        self.ranges.iter().map(|s| s.span).collect()
    }

    /// Tag points in ascending order
    pub fn tags(&self) -> impl Iterator<Item = Micros> + '_ {
        self.tags.iter().copied()
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Add a range and re-normalize.
    ///
    /// Returns the id of the range that covers the new one afterwards,
    /// which is an existing id when the new range merged into it.
    pub fn add_range(&mut self, start: Micros, end: Micros) -> CutResult<SelectionId> {
        let span = TimeSpan::new(start, end)?;
        if end > self.duration {
            return Err(CutError::invalid_range(
                start,
                end,
                format!("range ends past the source duration {}us", self.duration),
            ));
        }

        self.checkpoint();
        let id = self.allocate_id();
        self.ranges.push(Selection { id, span });
        self.normalize();
        debug!("Added range {} ({} ranges)", span, self.ranges.len());

        let covering = self
            .ranges
            .iter()
            .find(|s| s.span.start <= start && end <= s.span.end)
            .map(|s| s.id)
            .unwrap_or(id);
        Ok(covering)
    }

    /// Remove a range by id; absent ids are ignored
    pub fn remove_range(&mut self, id: SelectionId) -> bool {
        let Some(position) = self.ranges.iter().position(|s| s.id == id) else {
            return false;
        };
        self.checkpoint();
        let removed = self.ranges.remove(position);
        debug!("Removed range {}", removed.span);
        true
    }

    /// Remove the range under a playhead position, if any
    pub fn remove_at(&mut self, time: Micros) -> Option<Selection> {
        let selection = *self.ranges.iter().find(|s| s.span.contains(time))?;
        self.remove_range(selection.id);
        Some(selection)
    }

    /// Store a tag at the user's true click point
    pub fn add_tag(&mut self, time: Micros) -> CutResult<()> {
        self.check_tag(time)?;
        if !self.tags.contains(&time) {
            self.checkpoint();
            self.tags.insert(time);
        }
        Ok(())
    }

    pub fn remove_tag(&mut self, time: Micros) -> bool {
        if !self.tags.contains(&time) {
            return false;
        }
        self.checkpoint();
        self.tags.remove(&time)
    }

    /// Flip a tag on or off; returns whether it is now set
    pub fn toggle_tag(&mut self, time: Micros) -> CutResult<bool> {
        if self.remove_tag(time) {
            return Ok(false);
        }
        self.add_tag(time)?;
        Ok(true)
    }

    /// Drop every range and tag
    pub fn clear(&mut self) {
        if self.ranges.is_empty() && self.tags.is_empty() {
            return;
        }
        self.checkpoint();
        self.ranges.clear();
        self.tags.clear();
    }

    /// Restore the state before the last mutation
    pub fn undo_last(&mut self) -> bool {
        match self.history.pop_back() {
            Some(snapshot) => {
                self.ranges = snapshot.ranges;
                self.tags = snapshot.tags;
                true
            }
            None => false,
        }
    }

    /// Sort by start and merge ranges that overlap or touch. Idempotent.
    pub fn normalize(&mut self) {
        self.ranges
            .sort_by_key(|s| (s.span.start, s.span.end, s.id));

        let mut merged: Vec<Selection> = Vec::with_capacity(self.ranges.len());
        for selection in self.ranges.drain(..) {
            match merged.last_mut() {
                Some(current) if selection.span.start <= current.span.end => {
                    current.span.end = current.span.end.max(selection.span.end);
                }
                _ => merged.push(selection),
            }
        }
        self.ranges = merged;
    }

    /// Normalized copy of this set
    pub fn normalized(&self) -> SelectionSet {
        let mut copy = self.clone();
        copy.normalize();
        copy
    }

    /// Gaps between the normalized ranges and `[0, duration]`
    pub fn complement(&self, duration: Micros) -> Complement {
        let mut gaps = SelectionSet::new(duration);
        let mut cursor: Micros = 0;

        for span in self.normalized().spans() {
            let start = span.start.min(duration);
            if start > cursor {
                gaps.push_unchecked(cursor, start);
            }
            cursor = cursor.max(span.end.min(duration));
        }
        if cursor < duration {
            gaps.push_unchecked(cursor, duration);
        }

        if gaps.is_empty() {
            Complement::Empty
        } else {
            Complement::Gaps(gaps)
        }
    }

    fn push_unchecked(&mut self, start: Micros, end: Micros) {
        let id = self.allocate_id();
        self.ranges.push(Selection {
            id,
            span: TimeSpan { start, end },
        });
    }

    fn check_tag(&self, time: Micros) -> CutResult<()> {
        if time > self.duration {
            return Err(CutError::invalid_range(
                time,
                time,
                format!("tag is past the source duration {}us", self.duration),
            ));
        }
        Ok(())
    }

    fn allocate_id(&mut self) -> SelectionId {
        let id = SelectionId(self.next_id);
        self.next_id += 1;
        id
    }

    fn checkpoint(&mut self) {
        if self.history.len() == UNDO_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(Snapshot {
            ranges: self.ranges.clone(),
            tags: self.tags.clone(),
        });
    }
}

/// Equality ignores authoring order, ids and undo history
impl PartialEq for SelectionSet {
    fn eq(&self, other: &Self) -> bool {
        self.duration == other.duration
            && self.tags == other.tags
            && self.normalized().spans() == other.normalized().spans()
    }
}

#[cfg(test)]
mod tests;
