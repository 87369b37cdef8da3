//! Application state management

use sauce_core::AppConfig;
use sauce_rag::RagPipeline;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers.
///
/// The pipeline is constructed once at startup and injected here; it is
/// read-only for the lifetime of the process. `None` means the process
/// started in degraded mode (e.g. missing provider credential) and only
/// health reporting is available.
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// RAG pipeline, absent in degraded startup mode
    pipeline: Option<Arc<RagPipeline>>,
}

impl AppState {
    /// Create new application state with an injected pipeline
    pub fn new(config: AppConfig, pipeline: Option<Arc<RagPipeline>>) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            pipeline,
        }
    }

    /// Get the pipeline if the process started fully initialized
    pub fn pipeline(&self) -> Option<Arc<RagPipeline>> {
        self.pipeline.clone()
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(AppConfig::default(), None)
    }
}
