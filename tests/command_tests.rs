use memtrace_analyzer::commands::{
    execute_analyze, execute_dump, validate_args, validate_report_file, AnalyzeArgs, DumpArgs,
};
use memtrace_analyzer::decoder::TraceWriter;
use memtrace_analyzer::report::read_report;
use memtrace_analyzer::session::SessionOutcome;
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_trace(dir: &TempDir) -> PathBuf {
    let mut writer = TraceWriter::new();
    writer
        .start(2, "first")
        .malloc(2, 0x10, 20)
        .malloc(2, 0x20, 4)
        .free(2, 0x10)
        .stop(2)
        .start(2, "second")
        .calloc(2, 0x30, 8, 8)
        .stop(2);

    let path = dir.path().join("capture.bin");
    std::fs::write(&path, writer.as_bytes()).unwrap();
    path
}

#[test]
fn test_analyze_writes_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let trace_path = write_trace(&dir);
    let json_path = dir.path().join("out/report.json");
    let histogram_path = dir.path().join("out/sizes.dat");

    let args = AnalyzeArgs {
        trace_path,
        output_json: Some(json_path.clone()),
        output_histogram: Some(histogram_path.clone()),
        print_summary: false,
        ..Default::default()
    };
    validate_args(&args).unwrap();
    let report = execute_analyze(args).unwrap();

    assert_eq!(report.outcome, SessionOutcome::Completed);
    assert_eq!(report.total_size, 4);
    assert_eq!(report.high_water_mark, 24);

    let loaded = read_report(&json_path).unwrap();
    assert_eq!(loaded, report);
    assert_eq!(
        std::fs::read_to_string(&histogram_path).unwrap(),
        "# size count\n4 1\n20 1\n"
    );

    validate_report_file(json_path).unwrap();
}

#[test]
fn test_analyze_second_window() {
    let dir = tempfile::tempdir().unwrap();
    let args = AnalyzeArgs {
        trace_path: write_trace(&dir),
        window: 2,
        print_summary: false,
        ..Default::default()
    };

    let report = execute_analyze(args).unwrap();
    assert_eq!(report.window.as_deref(), Some("second"));
    assert_eq!(report.total_size, 64);
    assert_eq!(report.counts.mallocs, 1);
}

#[test]
fn test_analyze_rejects_corrupt_trace() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corrupt.bin");
    std::fs::write(&path, [0x01, 0x02, 0x00]).unwrap();

    let args = AnalyzeArgs {
        trace_path: path,
        print_summary: false,
        ..Default::default()
    };
    assert!(execute_analyze(args).is_err());
}

#[test]
fn test_analyze_rejects_bad_elf() {
    let dir = tempfile::tempdir().unwrap();
    let elf_path = dir.path().join("firmware.elf");
    std::fs::write(&elf_path, b"not an elf").unwrap();

    let args = AnalyzeArgs {
        trace_path: write_trace(&dir),
        elf_path: Some(elf_path),
        print_summary: false,
        ..Default::default()
    };
    assert!(execute_analyze(args).is_err());
}

#[test]
fn test_validate_args_rejects_zero_frames() {
    let args = AnalyzeArgs {
        trace_path: PathBuf::from("capture.bin"),
        max_frames: 0,
        ..Default::default()
    };
    assert!(validate_args(&args).is_err());
}

#[test]
fn test_dump_counts_records() {
    let dir = tempfile::tempdir().unwrap();
    let args = DumpArgs {
        trace_path: write_trace(&dir),
        ..Default::default()
    };
    assert_eq!(execute_dump(args).unwrap(), 8);
}

#[test]
fn test_validate_report_rejects_other_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("other.json");
    std::fs::write(&path, r#"{"version": "1.0.0"}"#).unwrap();

    assert!(validate_report_file(path).is_err());
}
