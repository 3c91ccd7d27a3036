use std::fs;
use std::sync::Arc;

use data_ingester::config::IngesterFlags;
use data_ingester::ingester::{DataIngester, FileIngester, IngesterRegistry, LogdirIngester};
use data_ingester::multiplexer::RunMultiplexer;
use data_ingester::provider::{DataProvider, RunStore, StoreDataProvider};
use data_ingester::{IngesterError, IngesterResult, NotApplicableError};

#[test]
fn unknown_source_is_not_applicable_for_every_kind() {
    let flags = IngesterFlags::new().with("source", "none-of-the-known-kinds");

    let file = FileIngester::from_flags(&flags).unwrap_err();
    assert!(file.is_not_applicable());
    let logdir = LogdirIngester::from_flags(&flags).unwrap_err();
    assert!(logdir.is_not_applicable());

    let err = IngesterRegistry::with_default_kinds().select(&flags).unwrap_err();
    match err {
        IngesterError::NoApplicableIngester { tried } => {
            let kinds: Vec<&str> = tried.iter().map(|t| t.kind.as_str()).collect();
            assert_eq!(kinds, vec!["file", "logdir"]);
        }
        other => panic!("expected NoApplicableIngester, got {other:?}"),
    }
}

#[test]
fn no_applicable_message_lists_reasons() {
    let err = IngesterRegistry::with_default_kinds()
        .select(&IngesterFlags::new())
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("no ingester applicable"));
    assert!(msg.contains("file ('path' is not set)"));
    assert!(msg.contains("logdir (neither 'logdir' nor 'logdir_spec' is set)"));
}

#[test]
fn empty_registry_reports_no_applicable() {
    let err = IngesterRegistry::new().select(&IngesterFlags::new()).unwrap_err();
    assert!(matches!(err, IngesterError::NoApplicableIngester { ref tried } if tried.is_empty()));
}

#[test]
fn default_kinds_are_in_priority_order() {
    let registry = IngesterRegistry::with_default_kinds();
    assert_eq!(registry.kinds().collect::<Vec<_>>(), vec!["file", "logdir"]);
}

#[test]
fn selects_logdir_when_only_logdir_is_set() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.csv"), "step\n1\n").unwrap();
    let flags = IngesterFlags::new()
        .with("logdir", dir.path().display().to_string())
        .with("schema", "step:int64")
        .with("reload_interval", "0");

    let ingester = IngesterRegistry::with_default_kinds().select(&flags).unwrap();
    assert_eq!(ingester.kind(), "logdir");
    assert!(!ingester.is_started());
}

#[test]
fn higher_priority_kind_wins_when_several_apply() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.csv");
    fs::write(&file, "step\n1\n").unwrap();
    let flags = IngesterFlags::new()
        .with("path", file.display().to_string())
        .with("logdir", dir.path().display().to_string())
        .with("schema", "step:int64");

    let ingester = IngesterRegistry::with_default_kinds()
        .select_and_start(&flags)
        .unwrap();
    assert_eq!(ingester.kind(), "file");
    assert!(ingester.is_started());
    assert_eq!(ingester.data_provider().unwrap().row_count("a"), Some(1));
}

#[test]
fn misconfiguration_stops_selection() {
    let dir = tempfile::tempdir().unwrap();
    // logdir applies, but the required schema is missing: that is fatal, not "try next".
    let flags = IngesterFlags::new().with("logdir", dir.path().display().to_string());
    let err = IngesterRegistry::with_default_kinds().select(&flags).unwrap_err();
    assert!(matches!(err, IngesterError::InvalidFlag { ref flag, .. } if flag == "schema"));

    let both = IngesterFlags::new()
        .with("logdir", "/a")
        .with("logdir_spec", "x:/b")
        .with("schema", "step:int64");
    let err = IngesterRegistry::with_default_kinds().select(&both).unwrap_err();
    assert!(err.to_string().contains("may not both be specified"));
}

#[derive(Debug)]
struct StaticIngester {
    started: bool,
    store: Arc<RunStore>,
}

impl DataIngester for StaticIngester {
    fn kind(&self) -> &'static str {
        "static"
    }

    fn data_provider(&self) -> IngesterResult<Arc<dyn DataProvider>> {
        if !self.started {
            return Err(IngesterError::NotStarted { kind: "static" });
        }
        Ok(Arc::new(StoreDataProvider::new("memory", Arc::clone(&self.store))))
    }

    fn deprecated_multiplexer(&self) -> IngesterResult<Option<Arc<RunMultiplexer>>> {
        Ok(None)
    }

    fn start(&mut self) -> IngesterResult<()> {
        if self.started {
            return Err(IngesterError::AlreadyStarted { kind: "static" });
        }
        self.started = true;
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.started
    }
}

fn static_factory(flags: &IngesterFlags) -> IngesterResult<Box<dyn DataIngester>> {
    if flags.get("source") != Some("memory") {
        return Err(NotApplicableError::new("static", "source is not 'memory'").into());
    }
    Ok(Box::new(StaticIngester {
        started: false,
        store: Arc::new(RunStore::new()),
    }))
}

#[test]
fn custom_kinds_can_be_registered_after_defaults() {
    let mut registry = IngesterRegistry::with_default_kinds();
    registry.register("static", static_factory);

    let ingester = registry
        .select_and_start(&IngesterFlags::new().with("source", "memory"))
        .unwrap();
    assert_eq!(ingester.kind(), "static");
    assert_eq!(ingester.data_provider().unwrap().data_location(), "memory");

    let err = registry
        .select(&IngesterFlags::new().with("source", "none-of-the-known-kinds"))
        .unwrap_err();
    assert!(matches!(err, IngesterError::NoApplicableIngester { ref tried } if tried.len() == 3));
}
