//! Sync loop configuration

use std::time::Duration;

use crate::sink::IndexingOptions;

/// Tuning knobs for the sync loop.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Documents buffered before a bulk flush is forced
    pub bulk_size: usize,
    /// Periodic flush interval
    pub flush_interval: Duration,
    /// Minimum spacing between non-forced position saves
    pub position_debounce: Duration,
    /// Options for every batched index call
    pub indexing: IndexingOptions,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            bulk_size: 128,
            flush_interval: Duration::from_millis(200),
            position_debounce: Duration::from_secs(3),
            indexing: IndexingOptions::default(),
        }
    }
}

impl SyncConfig {
    /// Create a new builder.
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }
}

/// Builder for [`SyncConfig`].
#[derive(Default)]
pub struct SyncConfigBuilder {
    bulk_size: Option<usize>,
    flush_interval: Option<Duration>,
    position_debounce: Option<Duration>,
    indexing: Option<IndexingOptions>,
}

impl SyncConfigBuilder {
    pub fn bulk_size(mut self, n: usize) -> Self {
        self.bulk_size = Some(n);
        self
    }

    pub fn flush_interval(mut self, d: Duration) -> Self {
        self.flush_interval = Some(d);
        self
    }

    pub fn position_debounce(mut self, d: Duration) -> Self {
        self.position_debounce = Some(d);
        self
    }

    pub fn indexing(mut self, options: IndexingOptions) -> Self {
        self.indexing = Some(options);
        self
    }

    pub fn build(self) -> SyncConfig {
        let default = SyncConfig::default();
        SyncConfig {
            bulk_size: self.bulk_size.unwrap_or(default.bulk_size),
            flush_interval: self.flush_interval.unwrap_or(default.flush_interval),
            position_debounce: self.position_debounce.unwrap_or(default.position_debounce),
            indexing: self.indexing.unwrap_or(default.indexing),
        }
    }
}
