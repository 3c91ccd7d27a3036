use std::fs;

use data_ingester::config::IngesterFlags;
use data_ingester::ingester::{DataIngester, FileIngester, IngesterRegistry, LogdirIngester};
use data_ingester::types::{DataType, Schema};
use data_ingester::IngesterError;

#[test]
fn schema_spec_parsing() {
    let schema = Schema::parse_spec(" step:INT, loss: double ,tag:string,").unwrap();
    let types: Vec<DataType> = schema.fields.iter().map(|f| f.data_type).collect();
    assert_eq!(types, vec![DataType::Int64, DataType::Float64, DataType::Utf8]);
    assert_eq!(schema.field_names().collect::<Vec<_>>(), vec!["step", "loss", "tag"]);

    for bad in ["", "step", ":int64", "step:uuid", "a:int64,a:utf8"] {
        let err = Schema::parse_spec(bad).unwrap_err();
        assert!(matches!(err, IngesterError::InvalidFlag { ref flag, .. } if flag == "schema"), "{bad}");
    }
}

#[test]
fn flags_load_from_a_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("metrics.csv");
    fs::write(&data, "step,loss\n1,0.5\n").unwrap();

    let config = dir.path().join("ingest.json");
    let doc = serde_json::json!({
        "path": data.display().to_string(),
        "schema": "step:int64,loss:float64",
        "run_name": "baseline",
    });
    fs::write(&config, doc.to_string()).unwrap();

    let flags = IngesterFlags::from_json_file(&config).unwrap();
    let ingester = IngesterRegistry::with_default_kinds()
        .select_and_start(&flags)
        .unwrap();
    let runs = ingester.data_provider().unwrap().list_runs();
    assert_eq!(runs[0].name, "baseline");
    assert_eq!(runs[0].location, data.display().to_string());
}

#[test]
fn malformed_json_config_is_a_config_error() {
    let err = IngesterFlags::from_json_str("{not json").unwrap_err();
    assert!(matches!(err, IngesterError::Config(_)));
}

#[test]
fn invalid_values_are_fatal_not_inapplicable() {
    let bad_interval = IngesterFlags::new()
        .with("logdir", "/tmp")
        .with("schema", "step:int64")
        .with("reload_interval", "soon");
    let err = LogdirIngester::from_flags(&bad_interval).unwrap_err();
    assert!(!err.is_not_applicable());
    assert!(err.to_string().contains("invalid flag 'reload_interval'"));

    let bad_threads = IngesterFlags::new()
        .with("logdir", "/tmp")
        .with("schema", "step:int64")
        .with("max_reload_threads", "0");
    assert!(LogdirIngester::from_flags(&bad_threads).is_err());

    let bad_pattern = IngesterFlags::new()
        .with("logdir", "/tmp")
        .with("schema", "step:int64")
        .with("pattern", "[");
    let err = LogdirIngester::from_flags(&bad_pattern).unwrap_err();
    assert!(err.to_string().contains("invalid flag 'pattern'"));

    let bad_format = IngesterFlags::new()
        .with("path", "/tmp/data.csv")
        .with("schema", "step:int64")
        .with("format", "xlsx");
    let err = FileIngester::from_flags(&bad_format).unwrap_err();
    assert!(err.to_string().contains("unknown format 'xlsx'"));
}

#[test]
fn file_without_extension_needs_format_flag() {
    let flags = IngesterFlags::new()
        .with("path", "/tmp/metrics")
        .with("schema", "step:int64");
    let err = FileIngester::from_flags(&flags).unwrap_err();
    assert!(matches!(err, IngesterError::InvalidFlag { ref flag, .. } if flag == "path"));

    let ingester = FileIngester::from_flags(&flags.with("format", "csv")).unwrap();
    assert_eq!(ingester.run_name(), "metrics");
    assert!(!ingester.is_started());
}

#[test]
fn blank_source_flags_are_not_applicable() {
    let flags = IngesterFlags::new()
        .with("path", "")
        .with("logdir", "  ")
        .with("schema", "step:int64");
    let err = IngesterRegistry::with_default_kinds().select(&flags).unwrap_err();
    assert!(matches!(err, IngesterError::NoApplicableIngester { .. }));
}
