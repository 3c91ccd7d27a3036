//! `data-ingester` links data sources to queryable, run-oriented views.
//!
//! A frontend that wants to serve ingested data does not pick a loading strategy itself.
//! It hands its configuration ([`config::IngesterFlags`]) to an
//! [`ingester::IngesterRegistry`], which tries each registered ingester kind in priority
//! order until one accepts the flags, then starts it and reads its views:
//!
//! - [`ingester::DataIngester::data_provider`]: a [`provider::DataProvider`] listing runs
//!   and serving their [`types::DataSet`]s;
//! - [`ingester::DataIngester::deprecated_multiplexer`]: an optional legacy
//!   [`multiplexer::RunMultiplexer`] view.
//!
//! ## Built-in ingester kinds
//!
//! - `file` ([`ingester::FileIngester`]): one CSV/JSON/Parquet file, selected by `path`.
//! - `logdir` ([`ingester::LogdirIngester`]): every data file under `logdir` (or each root
//!   in `logdir_spec`), reloaded in the background every `reload_interval` seconds.
//!
//! A kind that does not apply declines with [`error::NotApplicableError`]; if every kind
//! declines, selection fails with [`IngesterError::NoApplicableIngester`].
//!
//! ## Example
//!
//! ```no_run
//! use data_ingester::config::IngesterFlags;
//! use data_ingester::ingester::IngesterRegistry;
//!
//! # fn main() -> Result<(), data_ingester::IngesterError> {
//! let flags = IngesterFlags::from_json_file("ingest.json")?;
//! let ingester = IngesterRegistry::with_default_kinds().select_and_start(&flags)?;
//!
//! let provider = ingester.data_provider()?;
//! println!("serving {}", provider.data_location());
//! for run in provider.list_runs() {
//!     println!("{} rows={}", run.name, run.row_count);
//! }
//! if let Some(mux) = ingester.deprecated_multiplexer()? {
//!     println!("legacy view watching {:?}", mux.run_paths());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`ingester`]: the ingester interface, lifecycle, registry and built-in kinds
//! - [`provider`]: the data provider trait and its run store
//! - [`multiplexer`]: the legacy multiplexer view
//! - [`reader`]: CSV/JSON/Parquet file readers
//! - [`config`]: ingester flags
//! - [`observability`]: load/reload observer hooks
//! - [`types`]: schema and dataset types
//! - [`error`]: error types

pub mod config;
pub mod error;
pub mod ingester;
pub mod multiplexer;
pub mod observability;
pub mod provider;
pub mod reader;
pub mod types;

pub use error::{IngesterError, IngesterResult, IngestionError, IngestionResult, NotApplicableError};
