//! GOP-spanning edge split
//!
//! A range whose edges fall mid-GOP is cut in up to three pieces:
//! a re-encoded leading sliver up to the first keyframe inside the range,
//! a stream-copied middle between keyframes, and a re-encoded trailing
//! sliver from the last keyframe inside the range.

use tracing::debug;

use crate::domain::model::TimeSpan;
use crate::planner::{KeyframeIndex, Segment};

/// Split `span` into copy and re-encode pieces along keyframes
pub fn edge_split(span: TimeSpan, index: &KeyframeIndex) -> Vec<Segment> {
    let copy_start = if index.is_cut_point(span.start) {
        span.start
    } else {
        index.nearest_at_or_after(span.start)
    };
    let copy_end = if index.is_cut_point(span.end) {
        span.end
    } else {
        index.nearest_at_or_before(span.end)
    };

    if copy_start >= copy_end {
        debug!("No keyframe pair inside {}, re-encoding whole range", span);
        return vec![Segment::reencode(
            span,
            index.nearest_at_or_before(span.start),
        )];
    }

    let mut segments = Vec::with_capacity(3);
    if span.start < copy_start {
        segments.push(Segment::reencode(
            TimeSpan {
                start: span.start,
                end: copy_start,
            },
            index.nearest_at_or_before(span.start),
        ));
    }
    segments.push(Segment::copy(TimeSpan {
        start: copy_start,
        end: copy_end,
    }));
    if copy_end < span.end {
        segments.push(Segment::reencode(
            TimeSpan {
                start: copy_end,
                end: span.end,
            },
            copy_end,
        ));
    }

    debug!(
        "Edge split {}: {} piece(s), copy {}us..{}us",
        span,
        segments.len(),
        copy_start,
        copy_end
    );
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::CutMode;

    fn index() -> KeyframeIndex {
        KeyframeIndex::build(100, &[20, 40, 60, 80]).unwrap()
    }

    fn span(start: u64, end: u64) -> TimeSpan {
        TimeSpan::new(start, end).unwrap()
    }

    #[test]
    fn test_both_edges_misaligned() {
        let segments = edge_split(span(15, 65), &index());

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].span, span(15, 20));
        assert_eq!(segments[0].mode, CutMode::ReEncode);
        assert_eq!(segments[0].decode_from, 0);
        assert_eq!(segments[1].span, span(20, 60));
        assert_eq!(segments[1].mode, CutMode::StreamCopy);
        assert_eq!(segments[2].span, span(60, 65));
        assert_eq!(segments[2].mode, CutMode::ReEncode);
        assert_eq!(segments[2].decode_from, 60);
    }

    #[test]
    fn test_only_end_misaligned() {
        let segments = edge_split(span(20, 50), &index());

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0], Segment::copy(span(20, 40)));
        assert_eq!(segments[1].span, span(40, 50));
    }

    #[test]
    fn test_range_inside_one_gop_is_reencoded_whole() {
        let segments = edge_split(span(42, 58), &index());

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].mode, CutMode::ReEncode);
        assert_eq!(segments[0].span, span(42, 58));
        assert_eq!(segments[0].decode_from, 40);
    }

    #[test]
    fn test_file_end_counts_as_cut_point() {
        let segments = edge_split(span(85, 100), &index());
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].mode, CutMode::ReEncode);

        let segments = edge_split(span(70, 100), &index());
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1], Segment::copy(span(80, 100)));
    }

    #[test]
    fn test_copy_pieces_land_on_cut_points() {
        let index = index();
        for (start, end) in [(1, 99), (19, 21), (21, 79), (0, 33), (5, 100)] {
            for segment in edge_split(span(start, end), &index) {
                if segment.mode == CutMode::StreamCopy {
                    assert!(index.is_cut_point(segment.span.start));
                    assert!(index.is_cut_point(segment.span.end));
                }
            }
        }
    }
}
