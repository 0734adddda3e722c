//! Plain-text rendering of reports and events.

use super::builder::resolve_trace;
use super::schema::{Report, ResolvedFrame};
use crate::decoder::Event;
use crate::session::SessionOutcome;
use crate::symbols::SymbolResolver;
use crate::utils::config::{HISTOGRAM_BAR_WIDTH, SUMMARY_HISTOGRAM_BINS};

/// Render frames one per line, keeping at most `max_frames`
pub fn format_frames(frames: &[ResolvedFrame], max_frames: usize) -> String {
    let mut lines: Vec<String> = frames
        .iter()
        .take(max_frames)
        .map(|frame| format!("  {}", frame))
        .collect();

    if frames.len() > max_frames {
        lines.push(format!("  ... {} more frames", frames.len() - max_frames));
    }
    lines.join("\n")
}

/// One-line description of a decoded event, followed by its resolved trace
pub fn format_event(event: &Event, resolver: &SymbolResolver) -> String {
    let mut out = format!(
        "#{:<6} @{:08X} L{:<3} {}",
        event.index, event.offset, event.level, event.op
    );
    let frames = resolve_trace(event.frames(), resolver);
    if !frames.is_empty() {
        out.push('\n');
        out.push_str(&format_frames(&frames, frames.len()));
    }
    out
}

/// Create the text summary printed after an analysis
pub fn format_summary(report: &Report, max_frames: usize) -> String {
    let mut lines = Vec::new();

    lines.push("=".repeat(80));
    lines.push("MEMORY TRACE REPORT".to_string());
    lines.push("=".repeat(80));
    lines.push(format!("Source:     {}", report.source));

    let outcome = match report.outcome {
        SessionOutcome::Completed => "completed",
        SessionOutcome::Unterminated => "unterminated",
        SessionOutcome::NotFound => "not found",
    };
    match &report.window {
        Some(label) => lines.push(format!(
            "Window:     '{}' (level {}, {})",
            label, report.target_level, outcome
        )),
        None => lines.push(format!(
            "Window:     none at level {}",
            report.target_level
        )),
    }
    lines.push(format!("Records:    {}", report.events_decoded));
    lines.push(format!("ALLOCS:     {}", report.counts.mallocs));
    lines.push(format!("FREES:      {}", report.counts.frees));
    lines.push(format!("REALLOCS:   {}", report.counts.reallocs));
    lines.push(format!("TOTSIZE:    {}", report.total_size));
    lines.push(format!("MAXSIZE:    {}", report.high_water_mark));

    if !report.histogram.is_empty() {
        lines.push(String::new());
        lines.extend(format_histogram(report));
    }

    if let Some(leaks) = &report.leaks {
        lines.push(String::new());
        lines.push(format!(
            "  LEAKS ({} allocations, {} bytes)",
            leaks.allocations.len(),
            leaks.leaked_bytes
        ));
        for leak in &leaks.allocations {
            lines.push(format!("  {:08X}  {} bytes", leak.ptr, leak.size));
            if !leak.frames.is_empty() {
                lines.push(format_frames(&leak.frames, max_frames));
            }
        }
    }

    if !report.watch_hits.is_empty() {
        lines.push(String::new());
        lines.push(format!("  WATCHED SIZES ({} hits)", report.watch_hits.len()));
        for hit in &report.watch_hits {
            lines.push(format!(
                "  {} byte trace (record {}, {:08X}):",
                hit.size, hit.event_index, hit.ptr
            ));
            if !hit.frames.is_empty() {
                lines.push(format_frames(&hit.frames, max_frames));
            }
        }
    }

    if !report.anomalies.is_empty() {
        lines.push(String::new());
        lines.push(format!("  ANOMALIES ({})", report.anomalies.len()));
        for entry in &report.anomalies {
            lines.push(format!(
                "  record {} @{:08X}: {}",
                entry.event_index, entry.offset, entry.anomaly
            ));
        }
    }

    lines.push("=".repeat(80));
    lines.join("\n")
}

/// Bar chart of the most frequent allocation sizes, listed by size
fn format_histogram(report: &Report) -> Vec<String> {
    let mut bins = report.histogram.clone();
    if bins.len() > SUMMARY_HISTOGRAM_BINS {
        bins.sort_by(|a, b| b.count.cmp(&a.count).then(a.size.cmp(&b.size)));
        bins.truncate(SUMMARY_HISTOGRAM_BINS);
        bins.sort_by_key(|bin| bin.size);
    }

    let max_count = bins.iter().map(|bin| bin.count).max().unwrap_or(1).max(1);

    let mut lines = vec![format!("  ALLOCATION SIZES ({} distinct)", report.histogram.len())];
    for bin in &bins {
        let width = ((bin.count as f64 / max_count as f64) * HISTOGRAM_BAR_WIDTH as f64).ceil() as usize;
        lines.push(format!(
            "  {:>10} {:<bar$} {}",
            bin.size,
            "█".repeat(width),
            bin.count,
            bar = HISTOGRAM_BAR_WIDTH
        ));
    }

    if report.histogram.len() > bins.len() {
        lines.push(format!(
            "   (Showing top {} of {} sizes)",
            bins.len(),
            report.histogram.len()
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{Frame, Operation};
    use crate::symbols::FunctionRange;

    #[test]
    fn test_format_frames_truncates() {
        let resolver = SymbolResolver::empty();
        let trace = vec![Frame::new(1, 2); 5];
        let frames = resolve_trace(&trace, &resolver);

        let text = format_frames(&frames, 2);
        assert_eq!(text.lines().count(), 3);
        assert!(text.ends_with("... 3 more frames"));
    }

    #[test]
    fn test_format_event_with_trace() {
        let resolver = SymbolResolver::new(vec![FunctionRange::new("foo", 0x1000, 0x10)]);
        let event = Event {
            index: 3,
            offset: 0x20,
            level: 2,
            trace: Some(vec![Frame::new(0x1008, 0x1000)]),
            op: Operation::Free { ptr: 0 },
        };

        let text = format_event(&event, &resolver);
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("#3      @00000020 L2   FREE ptr=00000000"));
        assert_eq!(
            lines.next(),
            Some("  [01] foo (00001000) [from foo + 0x8 (00001008)]")
        );
    }
}
