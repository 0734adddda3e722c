//! Build reports from finished sessions.

use super::schema::{
    AnomalyEntry, HistogramBin, LeakEntry, LeakSummary, Report, ResolvedFrame, WatchEntry,
};
use crate::decoder::Frame;
use crate::session::Session;
use crate::symbols::SymbolResolver;
use crate::utils::config::SCHEMA_VERSION;
use log::debug;

/// Options for report construction
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Label of the analyzed input, usually the trace file path
    pub source: String,

    /// List the allocations still live at window end
    pub include_leaks: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            source: String::new(),
            include_leaks: true,
        }
    }
}

/// Resolve both ends of every frame of a captured trace
///
/// Frames keep their captured order (innermost first) and are numbered
/// from `trace.len()` down to 1.
pub fn resolve_trace(trace: &[Frame], resolver: &SymbolResolver) -> Vec<ResolvedFrame> {
    trace
        .iter()
        .enumerate()
        .map(|(position, frame)| {
            let callee = resolver.resolve(u64::from(frame.to));
            let (caller, caller_offset) = resolver.offset_in(u64::from(frame.from));
            ResolvedFrame {
                index: trace.len() - position,
                to: frame.to,
                function: callee.name.clone(),
                from: frame.from,
                caller: caller.name.clone(),
                caller_offset,
            }
        })
        .collect()
}

/// Convert a finished session to the report format
pub fn build_report(session: &Session, resolver: &SymbolResolver, options: &ReportOptions) -> Report {
    use chrono::Utc;

    let tracker = &session.tracker;

    let histogram = tracker
        .histogram()
        .iter()
        .map(|(&size, &count)| HistogramBin { size, count })
        .collect();

    let leaks = if options.include_leaks {
        let snapshot = tracker.snapshot_leaks();
        debug!(
            "Resolving traces of {} live allocations",
            snapshot.allocations.len()
        );
        Some(LeakSummary {
            leaked_bytes: snapshot.total_size,
            allocations: snapshot
                .allocations
                .iter()
                .map(|record| LeakEntry {
                    ptr: record.ptr,
                    size: record.size,
                    frames: resolve_trace(record.trace.as_deref().unwrap_or(&[]), resolver),
                })
                .collect(),
        })
    } else {
        None
    };

    let anomalies = session
        .diagnostics
        .iter()
        .map(|diagnostic| AnomalyEntry {
            event_index: diagnostic.event_index,
            offset: diagnostic.offset,
            anomaly: diagnostic.anomaly.clone(),
        })
        .collect();

    let watch_hits = session
        .watch_hits
        .iter()
        .map(|hit| WatchEntry {
            event_index: hit.event_index,
            ptr: hit.ptr,
            size: hit.len,
            frames: resolve_trace(hit.trace.as_deref().unwrap_or(&[]), resolver),
        })
        .collect();

    Report {
        version: SCHEMA_VERSION.to_string(),
        source: options.source.clone(),
        target_level: session.config.target_level,
        window: session.window.clone(),
        outcome: session.outcome,
        events_decoded: session.events_decoded,
        counts: tracker.counts(),
        total_size: tracker.total_size(),
        high_water_mark: tracker.high_water_mark(),
        histogram,
        leaks,
        anomalies,
        watch_hits,
        generated_at: Utc::now().to_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::FunctionRange;

    fn resolver() -> SymbolResolver {
        SymbolResolver::new(vec![
            FunctionRange::new("foo", 0x1000, 0x10),
            FunctionRange::new("bar", 0x2000, 0x20),
        ])
    }

    #[test]
    fn test_resolve_trace_numbers_frames_downwards() {
        let trace = [Frame::new(0x2010, 0x1004), Frame::new(0x5000, 0x2000)];
        let frames = resolve_trace(&trace, &resolver());

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].index, 2);
        assert_eq!(frames[0].function, "foo");
        assert_eq!(frames[0].caller, "bar");
        assert_eq!(frames[0].caller_offset, 0x10);
        assert_eq!(frames[1].index, 1);
        assert_eq!(frames[1].function, "bar");
        assert_eq!(frames[1].caller, "<0>");
        assert_eq!(frames[1].caller_offset, 0x5000);
    }

    #[test]
    fn test_resolved_frame_display() {
        let frames = resolve_trace(&[Frame::new(0x2010, 0x1004)], &resolver());
        assert_eq!(
            frames[0].to_string(),
            "[01] foo (00001004) [from bar + 0x10 (00002010)]"
        );
    }
}
