//! Observability: trait-based event and metric recording.
//!
//! | Backend | Description |
//! |---------|-------------|
//! | `noop`  | Discards everything (default) |
//! | `log`   | Emits structured events via `tracing` |
//!
//! [`create_observer`] builds the backend named by [`ObservabilityConfig`].
mod log;
mod noop;
pub mod traits;

use std::sync::Arc;

pub use self::log::LogObserver;
pub use self::noop::NoopObserver;
pub use self::traits::{Observer, ObserverEvent, ObserverMetric};

/// Configuration for the observability backend.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Backend name: "none", "noop", "log".
    pub backend: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            backend: "none".into(),
        }
    }
}

/// Create an observer from configuration.
///
/// Returns a [`LogObserver`] for "log" and a [`NoopObserver`] for anything
/// else, including unknown names.
pub fn create_observer(config: &ObservabilityConfig) -> Arc<dyn Observer> {
    match config.backend.as_str() {
        "log" => Arc::new(LogObserver),
        "none" | "noop" | "" => Arc::new(NoopObserver),
        other => {
            tracing::warn!(backend = other, "Unknown observability backend, using noop");
            Arc::new(NoopObserver)
        }
    }
}
