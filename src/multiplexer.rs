//! Legacy multiplexer view.
//!
//! Older consumers address runs through a multiplexer that knows which directories it
//! watches and can be asked to reload on demand. [`RunMultiplexer`] provides that surface on
//! top of the same store a directory ingester's [`crate::provider::DataProvider`] reads.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::ingester::DirectoryReloader;
use crate::observability::ReloadSummary;
use crate::types::{DataSet, RunInfo};

/// Backward-compatible run multiplexer, handed out by
/// [`crate::ingester::DataIngester::deprecated_multiplexer`].
pub struct RunMultiplexer {
    reloader: Arc<DirectoryReloader>,
}

impl RunMultiplexer {
    pub(crate) fn new(reloader: Arc<DirectoryReloader>) -> Self {
        Self { reloader }
    }

    /// Watched root directory per run group.
    pub fn run_paths(&self) -> BTreeMap<String, PathBuf> {
        self.reloader.run_paths()
    }

    /// Names of all loaded runs.
    pub fn runs(&self) -> Vec<String> {
        self.reloader.store().names()
    }

    pub fn run_info(&self, run: &str) -> Option<RunInfo> {
        self.reloader.store().info(run)
    }

    pub fn dataset(&self, run: &str) -> Option<Arc<DataSet>> {
        self.reloader.store().dataset(run)
    }

    /// Synchronously re-scan all roots. Serialized with the background reload.
    pub fn reload(&self) -> ReloadSummary {
        self.reloader.reload()
    }

    /// Number of reload passes completed so far.
    pub fn generation(&self) -> u64 {
        self.reloader.store().generation()
    }
}

impl fmt::Debug for RunMultiplexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunMultiplexer")
            .field("location", &self.reloader.location())
            .field("runs", &self.runs().len())
            .finish()
    }
}
