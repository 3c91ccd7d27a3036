use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::IngesterFlags;
use crate::error::{IngesterError, IngesterResult, NotApplicableError};
use crate::multiplexer::RunMultiplexer;
use crate::observability::{self, LoadContext, ReloadObserver, Severity};
use crate::provider::{DataProvider, RunStore, StoreDataProvider};
use crate::reader::{self, DataFormat};
use crate::types::{RunInfo, Schema};

use super::{DataIngester, Lifecycle};

/// Ingests a single data file as one run.
///
/// Applicable when the `path` flag is set. Also reads `schema` (required), `format`
/// (otherwise inferred from the extension) and `run_name` (defaults to the file stem).
/// The file is loaded once, synchronously, during [`DataIngester::start`]; there is no
/// background reload and no legacy multiplexer view.
pub struct FileIngester {
    lifecycle: Lifecycle,
    path: PathBuf,
    run_name: String,
    schema: Schema,
    format: Option<DataFormat>,
    store: Arc<RunStore>,
    observer: Option<Arc<dyn ReloadObserver>>,
}

impl FileIngester {
    pub const KIND: &'static str = "file";

    pub fn from_flags(flags: &IngesterFlags) -> IngesterResult<Self> {
        let path = flags
            .get_nonempty("path")
            .map(PathBuf::from)
            .ok_or_else(|| NotApplicableError::new(Self::KIND, "'path' is not set"))?;

        let schema = flags.get_schema()?;
        let format = match flags.get_nonempty("format") {
            Some(name) => Some(
                DataFormat::from_name(name)
                    .ok_or_else(|| IngesterError::invalid_flag("format", format!("unknown format '{name}'")))?,
            ),
            None if DataFormat::for_path(&path).is_none() => {
                return Err(IngesterError::invalid_flag(
                    "path",
                    format!("cannot infer format of '{}'; set 'format'", path.display()),
                ));
            }
            None => None,
        };
        let run_name = match flags.get_nonempty("run_name") {
            Some(name) => name.to_string(),
            None => default_run_name(&path),
        };

        Ok(Self {
            lifecycle: Lifecycle::new(Self::KIND),
            path,
            run_name,
            schema,
            format,
            store: Arc::new(RunStore::new()),
            observer: None,
        })
    }

    /// Attach an observer for the load event.
    pub fn with_observer(mut self, observer: Arc<dyn ReloadObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn run_name(&self) -> &str {
        &self.run_name
    }
}

fn default_run_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl DataIngester for FileIngester {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn data_provider(&self) -> IngesterResult<Arc<dyn DataProvider>> {
        self.lifecycle.ensure_started()?;
        Ok(Arc::new(StoreDataProvider::new(
            self.path.display().to_string(),
            Arc::clone(&self.store),
        )))
    }

    fn deprecated_multiplexer(&self) -> IngesterResult<Option<Arc<RunMultiplexer>>> {
        self.lifecycle.ensure_started()?;
        Ok(None)
    }

    /// Loads the file. On failure the error is returned, the ingester still counts as
    /// started, and its provider serves no runs.
    fn start(&mut self) -> IngesterResult<()> {
        self.lifecycle.begin_start()?;

        let ctx = LoadContext {
            run: self.run_name.clone(),
            path: self.path.clone(),
            format: self.format.or_else(|| DataFormat::for_path(&self.path)),
        };
        match reader::read_path(&self.path, &self.schema, self.format) {
            Ok(data) => {
                let info = RunInfo {
                    name: self.run_name.clone(),
                    location: self.path.display().to_string(),
                    row_count: data.row_count(),
                    loaded_at: observability::unix_ts(),
                };
                info!(run = %info.name, rows = info.row_count, "file ingested");
                if let Some(obs) = &self.observer {
                    obs.on_loaded(&ctx, info.row_count);
                }
                self.store.upsert(info, data);
                self.store.bump_generation();
                Ok(())
            }
            Err(source) => {
                warn!(path = %self.path.display(), error = %source, "file ingestion failed");
                if let Some(obs) = &self.observer {
                    // A single-file source has nothing to fall back on.
                    observability::report_failure(obs.as_ref(), &ctx, &source, Severity::Error);
                }
                Err(IngesterError::Load {
                    location: self.path.display().to_string(),
                    source,
                })
            }
        }
    }

    fn is_started(&self) -> bool {
        self.lifecycle.is_started()
    }
}

impl fmt::Debug for FileIngester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileIngester")
            .field("path", &self.path)
            .field("run_name", &self.run_name)
            .field("format", &self.format)
            .field("started", &self.lifecycle.is_started())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_name_defaults_to_file_stem() {
        assert_eq!(default_run_name(Path::new("/data/train.metrics.csv")), "train.metrics");
        assert_eq!(default_run_name(Path::new("eval.json")), "eval");
    }
}
