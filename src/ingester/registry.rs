use std::fmt;

use tracing::{debug, info};

use crate::config::IngesterFlags;
use crate::error::{IngesterError, IngesterResult};

use super::{DataIngester, FileIngester, LogdirIngester};

/// Builds an ingester from flags, or declines with [`IngesterError::NotApplicable`].
pub type IngesterFactory =
    Box<dyn Fn(&IngesterFlags) -> IngesterResult<Box<dyn DataIngester>> + Send + Sync>;

/// Priority-ordered list of ingester kinds.
///
/// [`Self::select`] tries each factory in registration order and returns the first
/// ingester that accepts the flags.
#[derive(Default)]
pub struct IngesterRegistry {
    kinds: Vec<(String, IngesterFactory)>,
}

impl IngesterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in kinds: `file` first, then `logdir`.
    pub fn with_default_kinds() -> Self {
        let mut registry = Self::new();
        registry.register(FileIngester::KIND, |flags: &IngesterFlags| {
            FileIngester::from_flags(flags).map(|i| Box::new(i) as Box<dyn DataIngester>)
        });
        registry.register(LogdirIngester::KIND, |flags: &IngesterFlags| {
            LogdirIngester::from_flags(flags).map(|i| Box::new(i) as Box<dyn DataIngester>)
        });
        registry
    }

    /// Append a kind at the lowest priority.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&IngesterFlags) -> IngesterResult<Box<dyn DataIngester>> + Send + Sync + 'static,
    {
        self.kinds.push((name.into(), Box::new(factory)));
    }

    /// Registered kind names, in priority order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.kinds.iter().map(|(name, _)| name.as_str())
    }

    /// Construct the first applicable ingester (not yet started).
    ///
    /// Kinds that decline are skipped. Any other construction error is a real
    /// misconfiguration and is returned immediately. If every kind declines, the result
    /// is [`IngesterError::NoApplicableIngester`] listing each kind's reason.
    pub fn select(&self, flags: &IngesterFlags) -> IngesterResult<Box<dyn DataIngester>> {
        let mut tried = Vec::with_capacity(self.kinds.len());
        for (name, factory) in &self.kinds {
            match factory(flags) {
                Ok(ingester) => {
                    info!(kind = %name, "selected data ingester");
                    return Ok(ingester);
                }
                Err(IngesterError::NotApplicable(mut reason)) => {
                    debug!(kind = %name, reason = %reason.reason, "data ingester not applicable");
                    reason.kind = name.clone();
                    tried.push(reason);
                }
                Err(other) => return Err(other),
            }
        }
        Err(IngesterError::NoApplicableIngester { tried })
    }

    /// [`Self::select`] followed by [`DataIngester::start`].
    pub fn select_and_start(&self, flags: &IngesterFlags) -> IngesterResult<Box<dyn DataIngester>> {
        let mut ingester = self.select(flags)?;
        ingester.start()?;
        Ok(ingester)
    }
}

impl fmt::Debug for IngesterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngesterRegistry")
            .field("kinds", &self.kinds().collect::<Vec<_>>())
            .finish()
    }
}
