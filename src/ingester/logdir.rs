//! Directory ingester: every data file under one or more root directories becomes a run,
//! and the tree is re-scanned periodically.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use glob::{MatchOptions, Pattern};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::IngesterFlags;
use crate::error::{IngesterError, IngesterResult, IngestionError, NotApplicableError};
use crate::multiplexer::RunMultiplexer;
use crate::observability::{self, LoadContext, ReloadObserver, ReloadSummary, Severity};
use crate::provider::{DataProvider, RunStore, StoreDataProvider};
use crate::reader::{self, DataFormat};
use crate::types::{RunInfo, Schema};

use super::reload::ReloadWorker;
use super::{DataIngester, Lifecycle};

const DEFAULT_RELOAD_INTERVAL: Duration = Duration::from_secs(5);

/// One root directory scanned by a [`LogdirIngester`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogdirSource {
    /// Prefix for run names from this root (`logdir_spec` entries); `None` for `logdir`.
    pub group: Option<String>,
    pub root: PathBuf,
}

impl LogdirSource {
    /// Parse a `logdir_spec` value: `name:path[,name:path...]`.
    ///
    /// An entry without a name uses the path itself as the group name. URIs
    /// (`scheme://...`) and, on Windows, drive-letter paths are never split.
    pub fn parse_spec(spec: &str) -> IngesterResult<Vec<Self>> {
        let mut sources: Vec<Self> = Vec::new();
        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (group, path) = match split_group(entry) {
                Some((name, rest)) => (name.to_string(), rest),
                None => (entry.to_string(), entry),
            };
            if path.is_empty() {
                return Err(IngesterError::invalid_flag("logdir_spec", format!("empty path for run group '{group}'")));
            }
            if sources.iter().any(|s| s.group.as_deref() == Some(group.as_str())) {
                return Err(IngesterError::invalid_flag("logdir_spec", format!("duplicate run group '{group}'")));
            }
            sources.push(Self {
                group: Some(group),
                root: PathBuf::from(path),
            });
        }
        if sources.is_empty() {
            return Err(IngesterError::invalid_flag("logdir_spec", "no directories given"));
        }
        Ok(sources)
    }
}

/// Splits `name:path`, or `None` when the entry is a bare path.
fn split_group(entry: &str) -> Option<(&str, &str)> {
    if is_uri(entry) {
        return None;
    }
    let (name, rest) = entry.split_once(':')?;
    let name = name.trim();
    if name.is_empty() || name.contains(['/', '\\']) || is_drive_letter(name) {
        return None;
    }
    Some((name, rest.trim()))
}

fn is_uri(entry: &str) -> bool {
    entry.split_once("://").is_some_and(|(scheme, _)| {
        !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

#[cfg(windows)]
fn is_drive_letter(name: &str) -> bool {
    name.len() == 1 && name.chars().all(|c| c.is_ascii_alphabetic())
}

#[cfg(not(windows))]
fn is_drive_letter(_name: &str) -> bool {
    false
}

const PATTERN_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone)]
struct LogdirConfig {
    sources: Vec<LogdirSource>,
    location: String,
    schema: Schema,
    format: Option<DataFormat>,
    pattern: Option<Pattern>,
    reload_interval: Duration,
    max_reload_threads: usize,
    alert_at_or_above: Severity,
}

impl LogdirConfig {
    fn from_flags(flags: &IngesterFlags) -> IngesterResult<Self> {
        let (sources, location) = match (flags.get_nonempty("logdir"), flags.get_nonempty("logdir_spec")) {
            (None, None) => {
                return Err(NotApplicableError::new(LogdirIngester::KIND, "neither 'logdir' nor 'logdir_spec' is set").into());
            }
            (Some(_), Some(_)) => {
                return Err(IngesterError::invalid_flag(
                    "logdir_spec",
                    "'logdir' and 'logdir_spec' may not both be specified",
                ));
            }
            (Some(dir), None) => (
                vec![LogdirSource {
                    group: None,
                    root: PathBuf::from(dir),
                }],
                dir.to_string(),
            ),
            (None, Some(spec)) => (LogdirSource::parse_spec(spec)?, spec.to_string()),
        };

        let format = flags
            .get_nonempty("format")
            .map(|name| {
                DataFormat::from_name(name)
                    .ok_or_else(|| IngesterError::invalid_flag("format", format!("unknown format '{name}'")))
            })
            .transpose()?;
        let pattern = flags
            .get_nonempty("pattern")
            .map(|p| Pattern::new(p).map_err(|e| IngesterError::invalid_flag("pattern", e.to_string())))
            .transpose()?;
        let max_reload_threads = flags.get_u64("max_reload_threads", 1)?;
        if max_reload_threads == 0 {
            return Err(IngesterError::invalid_flag("max_reload_threads", "must be at least 1"));
        }
        let alert_at_or_above = match flags.get_nonempty("alert_at_or_above") {
            None => Severity::Critical,
            Some(name) => Severity::from_name(name)
                .ok_or_else(|| IngesterError::invalid_flag("alert_at_or_above", format!("unknown severity '{name}'")))?,
        };

        Ok(Self {
            sources,
            location,
            schema: flags.get_schema()?,
            format,
            pattern,
            reload_interval: flags.get_duration_secs("reload_interval", DEFAULT_RELOAD_INTERVAL)?,
            max_reload_threads: usize::try_from(max_reload_threads).unwrap_or(usize::MAX),
            alert_at_or_above,
        })
    }
}

/// Modification stamp used to skip unchanged files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
}

#[derive(Debug, Clone)]
struct Candidate {
    run: String,
    path: PathBuf,
    format: DataFormat,
    stamp: FileStamp,
}

/// Observer notification recorded during a pass.
enum PassEvent {
    Loaded(LoadContext, usize),
    Failed(LoadContext, IngestionError),
}

/// Performs reload passes over the configured roots into a shared [`RunStore`].
pub(crate) struct DirectoryReloader {
    config: LogdirConfig,
    store: Arc<RunStore>,
    observer: Option<Arc<dyn ReloadObserver>>,
    pool: Arc<ThreadPool>,
    stamps: Mutex<HashMap<String, FileStamp>>,
    // Serializes background and manual (multiplexer) passes.
    pass_lock: Mutex<()>,
}

impl DirectoryReloader {
    fn new(
        config: LogdirConfig,
        store: Arc<RunStore>,
        observer: Option<Arc<dyn ReloadObserver>>,
        pool: Arc<ThreadPool>,
    ) -> Self {
        Self {
            config,
            store,
            observer,
            pool,
            stamps: Mutex::new(HashMap::new()),
            pass_lock: Mutex::new(()),
        }
    }

    pub(crate) fn location(&self) -> &str {
        &self.config.location
    }

    pub(crate) fn store(&self) -> &Arc<RunStore> {
        &self.store
    }

    /// Root directory per run group. The single `logdir` root is keyed by `"."`.
    pub(crate) fn run_paths(&self) -> BTreeMap<String, PathBuf> {
        self.config
            .sources
            .iter()
            .map(|s| (s.group.clone().unwrap_or_else(|| ".".to_string()), s.root.clone()))
            .collect()
    }

    /// One full pass: load new or changed files, drop runs whose file disappeared.
    ///
    /// Per-file failures are reported to the observer and leave any previously loaded
    /// version of the run in place. Observer callbacks run after the pass has released its
    /// lock, so an observer may itself trigger a reload.
    pub(crate) fn reload(&self) -> ReloadSummary {
        let (summary, events) = self.run_pass();
        if let Some(obs) = &self.observer {
            for event in &events {
                match event {
                    PassEvent::Loaded(ctx, rows) => obs.on_loaded(ctx, *rows),
                    PassEvent::Failed(ctx, err) => {
                        observability::report_failure(obs.as_ref(), ctx, err, self.config.alert_at_or_above)
                    }
                }
            }
            obs.on_pass_finished(&self.config.location, &summary);
        }
        summary
    }

    fn run_pass(&self) -> (ReloadSummary, Vec<PassEvent>) {
        let _pass = self.pass_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let candidates = self.scan();
        let seen: HashSet<String> = candidates.iter().map(|c| c.run.clone()).collect();
        let mut summary = ReloadSummary::default();
        let mut events = Vec::new();

        let to_load: Vec<Candidate> = {
            let stamps = self.stamps.lock().unwrap_or_else(PoisonError::into_inner);
            candidates
                .into_iter()
                .filter(|c| {
                    let unchanged = stamps.get(&c.run) == Some(&c.stamp) && self.store.info(&c.run).is_some();
                    if unchanged {
                        summary.unchanged += 1;
                    }
                    !unchanged
                })
                .collect()
        };

        let schema = &self.config.schema;
        let results: Vec<_> = self.pool.install(|| {
            to_load
                .into_par_iter()
                .map(|c| {
                    let loaded = reader::read_path(&c.path, schema, Some(c.format));
                    (c, loaded)
                })
                .collect()
        });

        for (candidate, loaded) in results {
            let ctx = LoadContext {
                run: candidate.run.clone(),
                path: candidate.path.clone(),
                format: Some(candidate.format),
            };
            match loaded {
                Ok(data) => {
                    let info = RunInfo {
                        name: candidate.run.clone(),
                        location: candidate.path.display().to_string(),
                        row_count: data.row_count(),
                        loaded_at: observability::unix_ts(),
                    };
                    events.push(PassEvent::Loaded(ctx, info.row_count));
                    self.store.upsert(info, data);
                    self.lock_stamps().insert(candidate.run, candidate.stamp);
                    summary.loaded += 1;
                }
                Err(err) => {
                    warn!(run = %candidate.run, path = %candidate.path.display(), error = %err, "failed to load run");
                    self.lock_stamps().remove(&candidate.run);
                    events.push(PassEvent::Failed(ctx, err));
                    summary.failed += 1;
                }
            }
        }

        let removed = self.store.retain(|run| seen.contains(run));
        self.lock_stamps().retain(|run, _| seen.contains(run));
        for run in &removed {
            debug!(run = %run, "run removed; file no longer present");
        }
        summary.removed = removed.len();

        let generation = self.store.bump_generation();
        info!(
            source = %self.config.location,
            generation,
            loaded = summary.loaded,
            unchanged = summary.unchanged,
            failed = summary.failed,
            removed = summary.removed,
            "reload pass finished"
        );
        (summary, events)
    }

    fn lock_stamps(&self) -> std::sync::MutexGuard<'_, HashMap<String, FileStamp>> {
        self.stamps.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn scan(&self) -> Vec<Candidate> {
        let mut out = Vec::new();
        for source in &self.config.sources {
            if !source.root.is_dir() {
                warn!(root = %source.root.display(), "log directory does not exist or is not a directory");
                continue;
            }
            for entry in WalkDir::new(&source.root).sort_by_file_name() {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        warn!(root = %source.root.display(), error = %err, "skipping unreadable entry");
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }
                if let Some(candidate) = self.candidate(source, entry.path()) {
                    out.push(candidate);
                }
            }
        }
        out
    }

    fn candidate(&self, source: &LogdirSource, path: &Path) -> Option<Candidate> {
        let rel = relative_run_path(&source.root, path)?;
        if let Some(pattern) = &self.config.pattern {
            if !pattern.matches_with(&rel, PATTERN_OPTIONS) {
                return None;
            }
        }
        let format = self.config.format.or_else(|| DataFormat::for_path(path))?;
        let meta = match path.metadata() {
            Ok(meta) => meta,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cannot stat file");
                return None;
            }
        };
        let run = match &source.group {
            Some(group) => format!("{group}/{rel}"),
            None => rel,
        };
        Some(Candidate {
            run,
            path: path.to_path_buf(),
            format,
            stamp: FileStamp {
                modified: meta.modified().ok(),
                len: meta.len(),
            },
        })
    }
}

impl fmt::Debug for DirectoryReloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryReloader")
            .field("location", &self.config.location)
            .field("observer_set", &self.observer.is_some())
            .field("store", &self.store)
            .finish()
    }
}

/// `path` relative to `root`, joined with `/` regardless of platform.
fn relative_run_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Ingests every data file below `logdir` (or each root in `logdir_spec`).
///
/// Flags:
///
/// - `logdir` or `logdir_spec` (one of them; both is an error): the roots to scan.
/// - `schema` (required): `name:type,...` applied to every file.
/// - `reload_interval` (seconds, default 5): `0` loads once and never reloads.
/// - `max_reload_threads` (default 1): files loaded in parallel per pass.
/// - `format`: force a reader; otherwise chosen by extension and unknown files are skipped.
/// - `pattern`: glob matched against each file's `/`-separated path relative to its root;
///   `*` does not cross `/`, use `**` for that.
/// - `alert_at_or_above` (default `critical`): observer alert threshold.
///
/// [`DataIngester::start`] runs the first pass synchronously and then hands the reloader
/// to a background thread, which is stopped when the ingester is dropped.
pub struct LogdirIngester {
    lifecycle: Lifecycle,
    config: LogdirConfig,
    store: Arc<RunStore>,
    pool: Arc<ThreadPool>,
    observer: Option<Arc<dyn ReloadObserver>>,
    provider: Option<Arc<dyn DataProvider>>,
    multiplexer: Option<Arc<RunMultiplexer>>,
    worker: Option<ReloadWorker>,
}

impl LogdirIngester {
    pub const KIND: &'static str = "logdir";

    pub fn from_flags(flags: &IngesterFlags) -> IngesterResult<Self> {
        let config = LogdirConfig::from_flags(flags)?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.max_reload_threads)
            .thread_name(|i| format!("logdir-load-{i}"))
            .build()
            .map_err(|e| IngesterError::invalid_flag("max_reload_threads", e.to_string()))?;
        debug!(location = %config.location, roots = config.sources.len(), "constructed logdir ingester");
        Ok(Self {
            lifecycle: Lifecycle::new(Self::KIND),
            config,
            store: Arc::new(RunStore::new()),
            pool: Arc::new(pool),
            observer: None,
            provider: None,
            multiplexer: None,
            worker: None,
        })
    }

    /// Attach an observer for load events. Only takes effect if set before `start`.
    pub fn with_observer(mut self, observer: Arc<dyn ReloadObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn sources(&self) -> &[LogdirSource] {
        &self.config.sources
    }

    pub fn reload_interval(&self) -> Duration {
        self.config.reload_interval
    }

    /// Whether a background reload thread is running.
    pub fn is_reloading(&self) -> bool {
        self.worker.is_some()
    }
}

impl DataIngester for LogdirIngester {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn data_provider(&self) -> IngesterResult<Arc<dyn DataProvider>> {
        self.lifecycle.ensure_started()?;
        self.provider
            .clone()
            .ok_or(IngesterError::NotStarted { kind: Self::KIND })
    }

    fn deprecated_multiplexer(&self) -> IngesterResult<Option<Arc<RunMultiplexer>>> {
        self.lifecycle.ensure_started()?;
        Ok(self.multiplexer.clone())
    }

    fn start(&mut self) -> IngesterResult<()> {
        self.lifecycle.begin_start()?;

        let reloader = Arc::new(DirectoryReloader::new(
            self.config.clone(),
            Arc::clone(&self.store),
            self.observer.clone(),
            Arc::clone(&self.pool),
        ));
        self.provider = Some(Arc::new(StoreDataProvider::new(
            self.config.location.clone(),
            Arc::clone(&self.store),
        )));
        self.multiplexer = Some(Arc::new(RunMultiplexer::new(Arc::clone(&reloader))));

        let summary = reloader.reload();
        info!(
            location = %self.config.location,
            runs = self.store.len(),
            failed = summary.failed,
            "initial load finished"
        );

        if !self.config.reload_interval.is_zero() {
            let worker_reloader = Arc::clone(&reloader);
            self.worker = Some(ReloadWorker::spawn("logdir-reload", self.config.reload_interval, move || {
                worker_reloader.reload();
            })?);
        }
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.lifecycle.is_started()
    }
}

impl fmt::Debug for LogdirIngester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogdirIngester")
            .field("location", &self.config.location)
            .field("started", &self.lifecycle.is_started())
            .field("reloading", &self.worker.is_some())
            .finish()
    }
}
