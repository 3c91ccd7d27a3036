use std::fs;
use std::path::Path;

use data_ingester::config::IngesterFlags;
use data_ingester::ingester::{DataIngester, FileIngester, LogdirIngester};
use data_ingester::types::Value;
use data_ingester::IngesterError;

const SCHEMA: &str = "step:int64,loss:float64";

fn write_metrics(path: &Path, rows: &[(i64, f64)]) {
    let mut text = String::from("step,loss\n");
    for (step, loss) in rows {
        text.push_str(&format!("{step},{loss}\n"));
    }
    fs::write(path, text).unwrap();
}

fn file_flags(path: &Path) -> IngesterFlags {
    IngesterFlags::new()
        .with("path", path.display().to_string())
        .with("schema", SCHEMA)
}

fn logdir_flags(dir: &Path) -> IngesterFlags {
    IngesterFlags::new()
        .with("logdir", dir.display().to_string())
        .with("schema", SCHEMA)
        .with("reload_interval", "0")
}

#[test]
fn file_ingester_is_constructed_but_not_started() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("train.csv");
    write_metrics(&path, &[(1, 0.5)]);

    let ingester = FileIngester::from_flags(&file_flags(&path)).unwrap();
    assert_eq!(ingester.kind(), "file");
    assert!(!ingester.is_started());
    assert_eq!(ingester.run_name(), "train");
}

#[test]
fn accessors_before_start_are_usage_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("train.csv");
    write_metrics(&path, &[(1, 0.5)]);

    let file = FileIngester::from_flags(&file_flags(&path)).unwrap();
    assert!(matches!(file.data_provider(), Err(IngesterError::NotStarted { kind: "file" })));
    assert!(matches!(file.deprecated_multiplexer(), Err(IngesterError::NotStarted { .. })));

    let logdir = LogdirIngester::from_flags(&logdir_flags(dir.path())).unwrap();
    assert!(matches!(logdir.data_provider(), Err(IngesterError::NotStarted { kind: "logdir" })));
    assert!(matches!(logdir.deprecated_multiplexer(), Err(IngesterError::NotStarted { .. })));
}

#[test]
fn file_ingester_serves_its_run_after_start_without_legacy_view() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("train.csv");
    write_metrics(&path, &[(1, 0.5), (2, 0.25)]);

    let mut ingester = FileIngester::from_flags(&file_flags(&path)).unwrap();
    ingester.start().unwrap();
    assert!(ingester.is_started());

    let provider = ingester.data_provider().unwrap();
    let runs = provider.list_runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].name, "train");
    assert_eq!(runs[0].row_count, 2);

    let ds = provider.read_dataset("train").unwrap();
    assert_eq!(ds.rows[1], vec![Value::Int64(2), Value::Float64(0.25)]);

    assert!(ingester.deprecated_multiplexer().unwrap().is_none());
}

#[test]
fn second_start_fails_fast_without_reloading() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("train.csv");
    write_metrics(&path, &[(1, 0.5)]);

    let mut ingester = FileIngester::from_flags(&file_flags(&path)).unwrap();
    ingester.start().unwrap();

    // If start ran again it would pick up the new row.
    write_metrics(&path, &[(1, 0.5), (2, 0.4)]);
    let err = ingester.start().unwrap_err();
    assert!(matches!(err, IngesterError::AlreadyStarted { kind: "file" }));
    assert_eq!(ingester.data_provider().unwrap().row_count("train"), Some(1));
}

#[test]
fn logdir_second_start_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_metrics(&dir.path().join("a.csv"), &[(1, 1.0)]);

    let mut ingester = LogdirIngester::from_flags(&logdir_flags(dir.path())).unwrap();
    ingester.start().unwrap();
    let mux = ingester.deprecated_multiplexer().unwrap().unwrap();
    let generation = mux.generation();

    assert!(matches!(ingester.start(), Err(IngesterError::AlreadyStarted { kind: "logdir" })));
    assert_eq!(mux.generation(), generation);
}

#[test]
fn logdir_exposes_provider_and_legacy_view_after_start() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("train")).unwrap();
    write_metrics(&dir.path().join("train").join("metrics.csv"), &[(1, 1.0), (2, 0.5)]);
    write_metrics(&dir.path().join("eval.csv"), &[(1, 2.0)]);

    let mut ingester = LogdirIngester::from_flags(&logdir_flags(dir.path())).unwrap();
    ingester.start().unwrap();
    assert!(!ingester.is_reloading());

    let provider = ingester.data_provider().unwrap();
    let names: Vec<String> = provider.list_runs().into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["eval.csv".to_string(), "train/metrics.csv".to_string()]);
    assert_eq!(provider.data_location(), dir.path().display().to_string());

    let mux = ingester.deprecated_multiplexer().unwrap().expect("logdir has a legacy view");
    assert_eq!(mux.runs(), names);
    assert_eq!(mux.dataset("train/metrics.csv").unwrap().row_count(), 2);
    assert_eq!(mux.run_paths().get("."), Some(&dir.path().to_path_buf()));
}

#[test]
fn failed_file_load_still_counts_as_started() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.csv");
    fs::write(&path, "step,loss\nnot_a_number,0.1\n").unwrap();

    let mut ingester = FileIngester::from_flags(&file_flags(&path)).unwrap();
    let err = ingester.start().unwrap_err();
    assert!(matches!(err, IngesterError::Load { .. }));
    assert!(err.to_string().contains("column 'step'"));

    assert!(ingester.is_started());
    assert!(ingester.data_provider().unwrap().list_runs().is_empty());
    assert!(matches!(ingester.start(), Err(IngesterError::AlreadyStarted { .. })));
}
