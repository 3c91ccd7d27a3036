//! Read-side views of ingested data.
//!
//! Ingesters write loaded runs into a shared [`RunStore`]; consumers read them through the
//! [`DataProvider`] trait. The provider is a window onto the store owned by its ingester,
//! so runs added or removed by a background reload are visible without re-fetching it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::types::{DataSet, RunInfo};

/// Queryable view of ingested runs.
pub trait DataProvider: Send + Sync {
    /// Human-readable description of where the data comes from (a path or path list).
    fn data_location(&self) -> String;

    /// All runs currently available, ordered by name.
    fn list_runs(&self) -> Vec<RunInfo>;

    /// The dataset for `run`, if loaded.
    fn read_dataset(&self, run: &str) -> Option<Arc<DataSet>>;

    /// Row count for `run`, if loaded.
    fn row_count(&self, run: &str) -> Option<usize> {
        self.read_dataset(run).map(|ds| ds.row_count())
    }
}

#[derive(Debug, Clone)]
struct StoredRun {
    info: RunInfo,
    data: Arc<DataSet>,
}

/// Thread-safe map of run name to loaded data.
#[derive(Default)]
pub struct RunStore {
    runs: RwLock<BTreeMap<String, StoredRun>>,
    generation: AtomicU64,
}

impl RunStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a run.
    pub fn upsert(&self, info: RunInfo, data: DataSet) {
        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        runs.insert(
            info.name.clone(),
            StoredRun {
                info,
                data: Arc::new(data),
            },
        );
    }

    /// Remove a run; returns whether it existed.
    pub fn remove(&self, name: &str) -> bool {
        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        runs.remove(name).is_some()
    }

    /// Keep only runs for which `keep` returns `true`. Returns the removed run names.
    pub fn retain(&self, mut keep: impl FnMut(&str) -> bool) -> Vec<String> {
        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        let removed: Vec<String> = runs.keys().filter(|k| !keep(k.as_str())).cloned().collect();
        for name in &removed {
            runs.remove(name);
        }
        removed
    }

    pub fn names(&self) -> Vec<String> {
        let runs = self.runs.read().unwrap_or_else(PoisonError::into_inner);
        runs.keys().cloned().collect()
    }

    pub fn info(&self, name: &str) -> Option<RunInfo> {
        let runs = self.runs.read().unwrap_or_else(PoisonError::into_inner);
        runs.get(name).map(|r| r.info.clone())
    }

    pub fn infos(&self) -> Vec<RunInfo> {
        let runs = self.runs.read().unwrap_or_else(PoisonError::into_inner);
        runs.values().map(|r| r.info.clone()).collect()
    }

    pub fn dataset(&self, name: &str) -> Option<Arc<DataSet>> {
        let runs = self.runs.read().unwrap_or_else(PoisonError::into_inner);
        runs.get(name).map(|r| Arc::clone(&r.data))
    }

    pub fn len(&self) -> usize {
        self.runs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of completed load passes.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub(crate) fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl fmt::Debug for RunStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunStore")
            .field("runs", &self.names())
            .field("generation", &self.generation())
            .finish()
    }
}

/// [`DataProvider`] backed by a shared [`RunStore`].
#[derive(Debug, Clone)]
pub struct StoreDataProvider {
    location: String,
    store: Arc<RunStore>,
}

impl StoreDataProvider {
    pub fn new(location: impl Into<String>, store: Arc<RunStore>) -> Self {
        Self {
            location: location.into(),
            store,
        }
    }
}

impl DataProvider for StoreDataProvider {
    fn data_location(&self) -> String {
        self.location.clone()
    }

    fn list_runs(&self) -> Vec<RunInfo> {
        self.store.infos()
    }

    fn read_dataset(&self, run: &str) -> Option<Arc<DataSet>> {
        self.store.dataset(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, Field, Schema, Value};

    fn run(name: &str, rows: usize) -> (RunInfo, DataSet) {
        let schema = Schema::new(vec![Field::new("step", DataType::Int64)]);
        let data = DataSet::new(schema, (0..rows as i64).map(|i| vec![Value::Int64(i)]).collect());
        let info = RunInfo {
            name: name.to_string(),
            location: format!("/data/{name}.csv"),
            row_count: rows,
            loaded_at: 0,
        };
        (info, data)
    }

    #[test]
    fn provider_sees_later_store_updates() {
        let store = Arc::new(RunStore::new());
        let provider = StoreDataProvider::new("/data", Arc::clone(&store));
        assert!(provider.list_runs().is_empty());

        let (info, data) = run("train", 3);
        store.upsert(info, data);
        assert_eq!(provider.row_count("train"), Some(3));
        assert_eq!(provider.list_runs()[0].name, "train");

        assert!(store.remove("train"));
        assert!(provider.read_dataset("train").is_none());
    }

    #[test]
    fn retain_reports_removed_runs_in_order() {
        let store = RunStore::new();
        for name in ["b", "a", "c"] {
            let (info, data) = run(name, 1);
            store.upsert(info, data);
        }
        let removed = store.retain(|name| name == "b");
        assert_eq!(removed, vec!["a".to_string(), "c".to_string()]);
        assert_eq!(store.names(), vec!["b".to_string()]);
    }
}
