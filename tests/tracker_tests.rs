use memtrace_analyzer::decoder::Frame;
use memtrace_analyzer::tracker::{AllocationTracker, EventCounts, ProtocolAnomaly};
use pretty_assertions::assert_eq;

/// Sum of live sizes must match the running total, and the peak must cover it
fn assert_consistent(tracker: &AllocationTracker) {
    let snapshot = tracker.snapshot_leaks();
    assert_eq!(snapshot.total_size, tracker.total_size());
    assert_eq!(snapshot.allocations.len(), tracker.live_count());
    assert!(tracker.high_water_mark() >= tracker.total_size());
}

#[test]
fn test_totals_stay_consistent_over_mixed_sequence() {
    let mut tracker = AllocationTracker::new();
    let mut peak = 0;

    let steps: Vec<Box<dyn Fn(&mut AllocationTracker)>> = vec![
        Box::new(|t: &mut AllocationTracker| t.handle_malloc(0x100, 32, None)),
        Box::new(|t: &mut AllocationTracker| t.handle_malloc(0x200, 16, None)),
        Box::new(|t: &mut AllocationTracker| t.handle_realloc(0x100, 0x300, 64, None)),
        Box::new(|t: &mut AllocationTracker| t.handle_calloc(0x400, 8, 3, None)),
        Box::new(|t: &mut AllocationTracker| t.handle_free(0x200)),
        Box::new(|t: &mut AllocationTracker| t.handle_realloc(0x300, 0x300, 8, None)),
        Box::new(|t: &mut AllocationTracker| t.handle_free(0)),
        Box::new(|t: &mut AllocationTracker| t.handle_realloc(0, 0x500, 12, None)),
        Box::new(|t: &mut AllocationTracker| t.handle_realloc(0x400, 0, 0, None)),
    ];

    for step in &steps {
        step(&mut tracker);
        assert_consistent(&tracker);
        assert!(tracker.high_water_mark() >= peak);
        peak = tracker.high_water_mark();
    }

    assert!(tracker.anomalies().is_empty());
    assert_eq!(tracker.total_size(), 8 + 12);
    assert_eq!(tracker.high_water_mark(), 16 + 64 + 24);
}

#[test]
fn test_malloc_then_free_restores_total() {
    let mut tracker = AllocationTracker::new();
    tracker.handle_malloc(0x10, 100, None);
    let before = tracker.total_size();

    tracker.handle_malloc(0x20, 48, None);
    tracker.handle_free(0x20);

    assert!(!tracker.is_live(0x20));
    assert_eq!(tracker.total_size(), before);
    assert_consistent(&tracker);
}

#[test]
fn test_realloc_from_null_is_malloc() {
    let mut via_realloc = AllocationTracker::new();
    via_realloc.handle_realloc(0, 0x40, 24, None);

    let mut via_malloc = AllocationTracker::new();
    via_malloc.handle_malloc(0x40, 24, None);

    assert_eq!(via_realloc.snapshot_leaks(), via_malloc.snapshot_leaks());
    assert_eq!(via_realloc.histogram(), via_malloc.histogram());
    assert_eq!(via_realloc.high_water_mark(), via_malloc.high_water_mark());
}

#[test]
fn test_realloc_to_zero_is_free() {
    let mut via_realloc = AllocationTracker::new();
    via_realloc.handle_malloc(0x40, 24, None);
    via_realloc.handle_realloc(0x40, 0x80, 0, None);

    let mut via_free = AllocationTracker::new();
    via_free.handle_malloc(0x40, 24, None);
    via_free.handle_free(0x40);

    assert_eq!(via_realloc.snapshot_leaks(), via_free.snapshot_leaks());
    assert!(!via_realloc.is_live(0x80));
    assert!(via_realloc.anomalies().is_empty());
}

#[test]
fn test_realloc_zero_length_wins_over_null_oldptr() {
    let mut tracker = AllocationTracker::new();
    tracker.handle_realloc(0, 0x40, 0, None);

    // Treated as free(0): nothing becomes live and nothing is flagged
    assert_eq!(tracker.live_count(), 0);
    assert!(tracker.histogram().is_empty());
    assert!(tracker.anomalies().is_empty());
}

#[test]
fn test_realloc_in_place_updates_size() {
    let mut tracker = AllocationTracker::new();
    tracker.handle_malloc(0x40, 24, None);
    tracker.handle_malloc(0x80, 8, None);

    tracker.handle_realloc(0x40, 0x40, 100, None);

    assert_eq!(tracker.live_count(), 2);
    assert_eq!(tracker.live_size(0x40), Some(100));
    assert_eq!(tracker.total_size(), 108);
    assert!(tracker.anomalies().is_empty());
}

#[test]
fn test_calloc_matches_equivalent_malloc() {
    let trace = Some(vec![Frame::new(0x0800_0010, 0x0800_0400)]);

    let mut via_calloc = AllocationTracker::new();
    via_calloc.handle_calloc(0x60, 4, 10, trace.clone());

    let mut via_malloc = AllocationTracker::new();
    via_malloc.handle_malloc(0x60, 40, trace);

    assert_eq!(via_calloc.snapshot_leaks(), via_malloc.snapshot_leaks());
    assert_eq!(via_calloc.histogram(), via_malloc.histogram());
    assert_eq!(via_calloc.counts(), via_malloc.counts());
}

#[test]
fn test_calloc_product_does_not_overflow() {
    let mut tracker = AllocationTracker::new();
    tracker.handle_calloc(0x60, u32::MAX, 2, None);
    assert_eq!(tracker.live_size(0x60), Some(u64::from(u32::MAX) * 2));
}

#[test]
fn test_free_of_unknown_address_leaves_totals() {
    let mut tracker = AllocationTracker::new();
    tracker.handle_malloc(0x10, 20, None);
    let snapshot = tracker.snapshot_leaks();

    tracker.handle_free(0x30);

    assert_eq!(
        tracker.anomalies(),
        &[ProtocolAnomaly::FreeOfUnknownAddress { ptr: 0x30 }]
    );
    assert_eq!(tracker.snapshot_leaks(), snapshot);
    assert_eq!(tracker.high_water_mark(), 20);
}

#[test]
fn test_double_alloc_keeps_total_in_sync() {
    let mut tracker = AllocationTracker::new();
    tracker.handle_malloc(0x10, 20, None);
    tracker.handle_malloc(0x10, 8, None);

    assert_eq!(
        tracker.anomalies(),
        &[ProtocolAnomaly::DoubleAlloc {
            ptr: 0x10,
            previous_size: 20,
            size: 8
        }]
    );
    assert_eq!(tracker.live_size(0x10), Some(8));
    assert_eq!(tracker.total_size(), 8);
    assert_eq!(tracker.high_water_mark(), 20);
    assert_consistent(&tracker);
}

#[test]
fn test_counts_track_public_calls_only() {
    let mut tracker = AllocationTracker::new();
    tracker.handle_malloc(0x10, 4, None);
    tracker.handle_calloc(0x20, 2, 2, None);
    tracker.handle_realloc(0x10, 0x30, 16, None);
    tracker.handle_free(0x20);

    assert_eq!(
        tracker.counts(),
        EventCounts {
            mallocs: 2,
            frees: 1,
            reallocs: 1,
        }
    );
}

#[test]
fn test_histogram_counts_lifetime_allocations() {
    let mut tracker = AllocationTracker::new();
    for ptr in [0x10, 0x20, 0x30] {
        tracker.handle_malloc(ptr, 16, None);
        tracker.handle_free(ptr);
    }
    tracker.handle_malloc(0x40, 4, None);

    let bins: Vec<(u64, u64)> = tracker
        .histogram()
        .iter()
        .map(|(&size, &count)| (size, count))
        .collect();
    assert_eq!(bins, vec![(4, 1), (16, 3)]);
}

#[test]
fn test_snapshot_is_sorted_and_keeps_traces() {
    let mut tracker = AllocationTracker::new();
    let trace = vec![Frame::new(0x0800_0100, 0x0800_0200)];
    tracker.handle_malloc(0x30, 1, None);
    tracker.handle_malloc(0x10, 2, Some(trace.clone()));
    tracker.handle_malloc(0x20, 3, None);

    let snapshot = tracker.snapshot_leaks();
    let ptrs: Vec<u32> = snapshot.allocations.iter().map(|r| r.ptr).collect();
    assert_eq!(ptrs, vec![0x10, 0x20, 0x30]);
    assert_eq!(snapshot.allocations[0].trace, Some(trace));
    assert_eq!(snapshot.total_size, 6);
}
