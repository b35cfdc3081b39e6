//! Pipeline configuration.

use crate::progress::DEFAULT_PROGRESS_INTERVAL;
use crate::surface::DEFAULT_KEY_PRECISION;
use std::time::Duration;

/// Default bound on concurrently running ingestion tasks.
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 8;

/// Tunable settings for an [`IngestPipeline`](crate::pipeline::IngestPipeline).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Interval between streamed progress emissions
    pub progress_interval: Duration,
    /// Maximum number of ingestion jobs processed concurrently; further
    /// jobs stay `Pending` until a slot frees up
    pub max_concurrent_jobs: usize,
    /// Decimal places kept when bucketing surface-cache keys
    /// (`None` = exact float keys)
    pub cache_precision: Option<u32>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
            cache_precision: Some(DEFAULT_KEY_PRECISION),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the interval between streamed progress emissions.
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Sets the bound on concurrently running ingestion tasks.
    ///
    /// A bound of zero would stall every job, so it is raised to one.
    pub fn with_max_concurrent_jobs(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = max.max(1);
        self
    }

    /// Sets the surface-cache key precision.
    pub fn with_cache_precision(mut self, precision: Option<u32>) -> Self {
        self.cache_precision = precision;
        self
    }
}
