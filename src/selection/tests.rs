// Unit tests for the selection set

use super::*;

fn spans(set: &SelectionSet) -> Vec<(Micros, Micros)> {
    set.spans().iter().map(|s| (s.start, s.end)).collect()
}

#[test]
fn test_overlapping_ranges_merge() {
    let mut set = SelectionSet::new(100);
    set.add_range(0, 10).unwrap();
    set.add_range(5, 20).unwrap();

    assert_eq!(spans(&set), vec![(0, 20)]);
}

#[test]
fn test_touching_ranges_merge() {
    let mut set = SelectionSet::new(100);
    set.add_range(10, 20).unwrap();
    set.add_range(0, 10).unwrap();

    assert_eq!(spans(&set), vec![(0, 20)]);
}

#[test]
fn test_out_of_order_ranges_are_sorted() {
    let mut set = SelectionSet::new(100);
    set.add_range(60, 70).unwrap();
    set.add_range(10, 20).unwrap();
    set.add_range(30, 40).unwrap();

    assert_eq!(spans(&set), vec![(10, 20), (30, 40), (60, 70)]);
}

#[test]
fn test_contained_range_keeps_outer_end() {
    let mut set = SelectionSet::new(100);
    set.add_range(0, 50).unwrap();
    let id = set.add_range(10, 20).unwrap();

    assert_eq!(spans(&set), vec![(0, 50)]);
    assert_eq!(set.ranges()[0].id, id);
}

#[test]
fn test_add_range_rejects_invalid_bounds() {
    let mut set = SelectionSet::new(100);
    assert!(matches!(
        set.add_range(10, 10),
        Err(CutError::InvalidRange { .. })
    ));
    assert!(matches!(
        set.add_range(20, 10),
        Err(CutError::InvalidRange { .. })
    ));
    assert!(matches!(
        set.add_range(90, 101),
        Err(CutError::InvalidRange { end_micros: 101, .. })
    ));
    assert!(set.is_empty());
}

#[test]
fn test_normalize_is_idempotent() {
    let mut set = SelectionSet::new(1_000);
    for (start, end) in [(500, 600), (0, 10), (5, 300), (550, 900), (950, 1_000)] {
        set.add_range(start, end).unwrap();
    }

    let once = set.normalized();
    let twice = once.normalized();
    assert_eq!(once, twice);
    assert_eq!(spans(&once), spans(&twice));
}

#[test]
fn test_remove_range_is_idempotent() {
    let mut set = SelectionSet::new(100);
    let id = set.add_range(10, 20).unwrap();

    assert!(set.remove_range(id));
    assert!(!set.remove_range(id));
    assert!(set.is_empty());
}

#[test]
fn test_remove_at_playhead() {
    let mut set = SelectionSet::new(100);
    set.add_range(10, 20).unwrap();
    set.add_range(40, 50).unwrap();

    let removed = set.remove_at(45).unwrap();
    assert_eq!((removed.span.start, removed.span.end), (40, 50));
    assert!(set.remove_at(30).is_none());
    assert_eq!(spans(&set), vec![(10, 20)]);
}

#[test]
fn test_tags_are_unique_and_sorted() {
    let mut set = SelectionSet::new(100);
    set.add_tag(70).unwrap();
    set.add_tag(30).unwrap();
    set.add_tag(70).unwrap();

    assert_eq!(set.tags().collect::<Vec<_>>(), vec![30, 70]);
    assert!(set.add_tag(101).is_err());
}

#[test]
fn test_toggle_tag() {
    let mut set = SelectionSet::new(100);
    assert!(set.toggle_tag(30).unwrap());
    assert!(!set.toggle_tag(30).unwrap());
    assert_eq!(set.tag_count(), 0);
}

#[test]
fn test_undo_restores_pre_merge_state() {
    let mut set = SelectionSet::new(100);
    set.add_range(0, 10).unwrap();
    set.add_range(5, 20).unwrap();
    assert_eq!(spans(&set), vec![(0, 20)]);

    assert!(set.undo_last());
    assert_eq!(spans(&set), vec![(0, 10)]);
    assert!(set.undo_last());
    assert!(set.is_empty());
    assert!(!set.undo_last());
}

#[test]
fn test_undo_history_is_bounded() {
    let extra = 50;
    let mut set = SelectionSet::new(1_000);
    for time in 0..(UNDO_LIMIT + extra) as Micros {
        set.add_tag(time).unwrap();
    }

    let mut undone = 0;
    while set.undo_last() {
        undone += 1;
    }
    assert_eq!(undone, UNDO_LIMIT);
    assert_eq!(set.tag_count(), extra);
}

#[test]
fn test_clear_is_undoable() {
    let mut set = SelectionSet::new(100);
    set.add_range(0, 10).unwrap();
    set.add_tag(50).unwrap();

    set.clear();
    assert!(set.is_empty());
    assert_eq!(set.tag_count(), 0);

    set.undo_last();
    assert_eq!(spans(&set), vec![(0, 10)]);
    assert_eq!(set.tag_count(), 1);
}

#[test]
fn test_equality_ignores_authoring_order() {
    let mut a = SelectionSet::new(100);
    a.add_range(0, 10).unwrap();
    a.add_range(50, 60).unwrap();

    let mut b = SelectionSet::new(100);
    b.add_range(50, 60).unwrap();
    b.add_range(0, 10).unwrap();

    assert_eq!(a, b);
}

#[test]
fn test_complement_of_empty_set_is_whole_source() {
    let set = SelectionSet::new(100);
    let gaps = set.complement(100).into_set().unwrap();
    assert_eq!(spans(&gaps), vec![(0, 100)]);
}

#[test]
fn test_complement_of_full_cover_is_empty() {
    let mut set = SelectionSet::new(100);
    set.add_range(0, 60).unwrap();
    set.add_range(40, 100).unwrap();

    assert!(set.complement(100).is_empty());
}

#[test]
fn test_complement_gaps() {
    let mut set = SelectionSet::new(100);
    set.add_range(60, 80).unwrap();
    set.add_range(10, 20).unwrap();
    set.add_range(15, 30).unwrap();

    let gaps = set.complement(100).into_set().unwrap();
    assert_eq!(spans(&gaps), vec![(0, 10), (30, 60), (80, 100)]);
    assert_eq!(gaps.tag_count(), 0);
}

#[test]
fn test_complement_at_file_edges() {
    let mut set = SelectionSet::new(100);
    set.add_range(0, 25).unwrap();
    set.add_range(75, 100).unwrap();

    let gaps = set.complement(100).into_set().unwrap();
    assert_eq!(spans(&gaps), vec![(25, 75)]);
}
