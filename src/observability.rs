//! Observer hooks for load and reload outcomes.
//!
//! Ingesters report every file they load (or fail to load) to an optional
//! [`ReloadObserver`]. Failures are classified by [`Severity`]; failures at or above the
//! configured threshold are additionally reported through [`ReloadObserver::on_alert`].

use std::error::Error as StdError;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::error::IngestionError;
use crate::reader::DataFormat;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    /// The file could not be loaded.
    Error,
    /// I/O or other infrastructure failure.
    Critical,
}

impl Severity {
    /// Classify a load error. I/O failures anywhere in the chain are critical.
    pub fn for_error(error: &IngestionError) -> Self {
        match error {
            IngestionError::Io(_) => Self::Critical,
            IngestionError::Csv(err) if matches!(err.kind(), ::csv::ErrorKind::Io(_)) => Self::Critical,
            IngestionError::Parquet(err) if chain_contains_io(err) => Self::Critical,
            IngestionError::UnsupportedFormat { .. } => Self::Warning,
            _ => Self::Error,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "info" => Some(Self::Info),
            "warning" | "warn" => Some(Self::Warning),
            "error" => Some(Self::Error),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

fn chain_contains_io(e: &(dyn StdError + 'static)) -> bool {
    let mut cur: Option<&(dyn StdError + 'static)> = Some(e);
    while let Some(err) = cur {
        if err.is::<std::io::Error>() {
            return true;
        }
        cur = err.source();
    }
    false
}

/// The file a load event refers to.
#[derive(Debug, Clone)]
pub struct LoadContext {
    /// Run name the file is published under.
    pub run: String,
    pub path: PathBuf,
    pub format: Option<DataFormat>,
}

/// Outcome of a single reload pass over a data source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReloadSummary {
    /// Runs read (new or changed) in this pass.
    pub loaded: usize,
    /// Runs skipped because their file did not change.
    pub unchanged: usize,
    /// Files that failed to load.
    pub failed: usize,
    /// Runs dropped because their file disappeared.
    pub removed: usize,
}

/// Observer interface for load outcomes. All methods default to no-ops.
///
/// Callbacks for a reload pass are delivered after the pass completes, outside its lock.
pub trait ReloadObserver: Send + Sync {
    fn on_loaded(&self, _ctx: &LoadContext, _rows: usize) {}

    fn on_failed(&self, _ctx: &LoadContext, _severity: Severity, _error: &IngestionError) {}

    /// Called when a failure meets the alert threshold. Defaults to [`Self::on_failed`].
    fn on_alert(&self, ctx: &LoadContext, severity: Severity, error: &IngestionError) {
        self.on_failed(ctx, severity, error)
    }

    /// Called after each complete pass over the source.
    fn on_pass_finished(&self, _source: &str, _summary: &ReloadSummary) {}
}

/// Reports a failure, escalating to `on_alert` when `severity >= alert_at_or_above`.
pub(crate) fn report_failure(
    observer: &dyn ReloadObserver,
    ctx: &LoadContext,
    error: &IngestionError,
    alert_at_or_above: Severity,
) {
    let severity = Severity::for_error(error);
    observer.on_failed(ctx, severity, error);
    if severity >= alert_at_or_above {
        observer.on_alert(ctx, severity, error);
    }
}

/// Fans callbacks out to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn ReloadObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn ReloadObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl ReloadObserver for CompositeObserver {
    fn on_loaded(&self, ctx: &LoadContext, rows: usize) {
        self.observers.iter().for_each(|o| o.on_loaded(ctx, rows));
    }

    fn on_failed(&self, ctx: &LoadContext, severity: Severity, error: &IngestionError) {
        self.observers.iter().for_each(|o| o.on_failed(ctx, severity, error));
    }

    fn on_alert(&self, ctx: &LoadContext, severity: Severity, error: &IngestionError) {
        self.observers.iter().for_each(|o| o.on_alert(ctx, severity, error));
    }

    fn on_pass_finished(&self, source: &str, summary: &ReloadSummary) {
        self.observers.iter().for_each(|o| o.on_pass_finished(source, summary));
    }
}

/// Logs load events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl ReloadObserver for StdErrObserver {
    fn on_loaded(&self, ctx: &LoadContext, rows: usize) {
        eprintln!("[ingest][ok] run={} path={} rows={rows}", ctx.run, ctx.path.display());
    }

    fn on_failed(&self, ctx: &LoadContext, severity: Severity, error: &IngestionError) {
        eprintln!(
            "[ingest][{severity:?}] run={} path={} err={error}",
            ctx.run,
            ctx.path.display()
        );
    }

    fn on_alert(&self, ctx: &LoadContext, severity: Severity, error: &IngestionError) {
        eprintln!(
            "[ALERT][ingest][{severity:?}] run={} path={} err={error}",
            ctx.run,
            ctx.path.display()
        );
    }
}

/// Appends load events to a local log file, one line per event.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Writes are best-effort; failures to open or write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{} {line}", unix_ts());
        }
    }
}

impl ReloadObserver for FileObserver {
    fn on_loaded(&self, ctx: &LoadContext, rows: usize) {
        self.append_line(&format!("ok run={} path={} rows={rows}", ctx.run, ctx.path.display()));
    }

    fn on_failed(&self, ctx: &LoadContext, severity: Severity, error: &IngestionError) {
        self.append_line(&format!(
            "fail severity={severity:?} run={} path={} err={error}",
            ctx.run,
            ctx.path.display()
        ));
    }

    fn on_alert(&self, ctx: &LoadContext, severity: Severity, error: &IngestionError) {
        self.append_line(&format!(
            "ALERT severity={severity:?} run={} path={} err={error}",
            ctx.run,
            ctx.path.display()
        ));
    }

    fn on_pass_finished(&self, source: &str, summary: &ReloadSummary) {
        self.append_line(&format!(
            "pass source={source} loaded={} unchanged={} failed={} removed={}",
            summary.loaded, summary.unchanged, summary.failed, summary.removed
        ));
    }
}

pub(crate) fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
