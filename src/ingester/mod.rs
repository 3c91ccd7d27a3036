//! The data ingester interface.
//!
//! A [`DataIngester`] links a data source to a [`DataProvider`] view. Ingesters are built
//! by factory functions registered in an [`IngesterRegistry`]; a factory either returns a
//! constructed ingester or declines with [`NotApplicableError`], in which case the
//! registry moves on to the next kind.
//!
//! Every ingester has two lifecycle states, *constructed* and *started*:
//!
//! - [`DataIngester::start`] may be called exactly once. A second call fails with
//!   [`IngesterError::AlreadyStarted`] and performs no work.
//! - [`DataIngester::data_provider`] and [`DataIngester::deprecated_multiplexer`] fail
//!   with [`IngesterError::NotStarted`] until `start` has been called.
//! - `start` returns once the initial load is complete; directory ingesters keep
//!   reloading in the background afterwards.
//!
//! ```no_run
//! use data_ingester::config::IngesterFlags;
//! use data_ingester::ingester::IngesterRegistry;
//!
//! # fn main() -> Result<(), data_ingester::IngesterError> {
//! let flags = IngesterFlags::new()
//!     .with("logdir", "/var/log/runs")
//!     .with("schema", "step:int64,loss:float64");
//!
//! let ingester = IngesterRegistry::with_default_kinds().select_and_start(&flags)?;
//! for run in ingester.data_provider()?.list_runs() {
//!     println!("{} rows={}", run.name, run.row_count);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`NotApplicableError`]: crate::error::NotApplicableError

mod file;
mod logdir;
mod registry;
mod reload;

use std::fmt;
use std::sync::Arc;

use crate::error::{IngesterError, IngesterResult};
use crate::multiplexer::RunMultiplexer;
use crate::provider::DataProvider;

pub use file::FileIngester;
pub use logdir::{LogdirIngester, LogdirSource};
pub(crate) use logdir::DirectoryReloader;
pub use registry::{IngesterFactory, IngesterRegistry};

/// Link between a data source and a data provider.
pub trait DataIngester: Send + fmt::Debug {
    /// Registered kind name (e.g. `"logdir"`).
    fn kind(&self) -> &'static str;

    /// Read-side view of the ingested data. Errors with [`IngesterError::NotStarted`]
    /// before [`Self::start`].
    fn data_provider(&self) -> IngesterResult<Arc<dyn DataProvider>>;

    /// Backward-compatible multiplexer view, or `None` if this kind has none. Errors with
    /// [`IngesterError::NotStarted`] before [`Self::start`].
    fn deprecated_multiplexer(&self) -> IngesterResult<Option<Arc<RunMultiplexer>>>;

    /// Starts ingesting data. Must only be called once.
    fn start(&mut self) -> IngesterResult<()>;

    fn is_started(&self) -> bool;
}

/// One-shot constructed -> started state flag shared by the concrete ingesters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifecycle {
    kind: &'static str,
    started: bool,
}

impl Lifecycle {
    pub fn new(kind: &'static str) -> Self {
        Self { kind, started: false }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Guard for accessors that are only valid after start.
    pub fn ensure_started(&self) -> IngesterResult<()> {
        if self.started {
            Ok(())
        } else {
            Err(IngesterError::NotStarted { kind: self.kind })
        }
    }

    /// Marks the transition to started, failing fast if it already happened.
    ///
    /// The state is flipped before any start work runs, so a start that later fails
    /// still counts as the one allowed call.
    pub fn begin_start(&mut self) -> IngesterResult<()> {
        if self.started {
            return Err(IngesterError::AlreadyStarted { kind: self.kind });
        }
        self.started = true;
        Ok(())
    }
}
