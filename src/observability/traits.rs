//! Core observer trait and event/metric types.
use std::time::Duration;

/// Provider-agnostic observer for assistant lifecycle events and metrics.
///
/// The agent, conversation session and dashboard record events at key
/// points and the observer decides what to do with them.
///
/// Thread-safe and cheaply cloneable behind `Arc<dyn Observer>`.
pub trait Observer: Send + Sync {
    /// Record a discrete lifecycle event.
    fn record_event(&self, event: &ObserverEvent);

    /// Record a numeric metric sample.
    fn record_metric(&self, metric: &ObserverMetric);

    /// Flush any buffered data. No-op by default.
    fn flush(&self) {}

    /// Human-readable backend name (e.g. "noop", "log").
    fn name(&self) -> &str;
}

/// Discrete lifecycle events.
#[derive(Debug, Clone)]
pub enum ObserverEvent {
    /// A request was sent to the hosted model.
    LlmRequest {
        provider: String,
        model: String,
        message_count: usize,
    },

    /// The hosted model answered (or failed).
    LlmResponse {
        provider: String,
        model: String,
        duration: Duration,
        success: bool,
        error_message: Option<String>,
    },

    /// A vault tool call is about to start.
    ToolCallStart { tool: String },

    /// A vault tool call finished.
    ToolCallEnd {
        tool: String,
        duration: Duration,
        success: bool,
    },

    /// One user utterance was fully answered.
    TurnComplete,

    /// A dashboard session was opened or closed.
    SessionChange { session_id: String, opened: bool },

    /// An error occurred in a component.
    Error { component: String, message: String },
}

/// Numeric metric samples.
#[derive(Debug, Clone)]
pub enum ObserverMetric {
    /// Wall time to answer one utterance.
    RequestLatency(Duration),

    /// Tokens consumed by one model call.
    TokensUsed(u64),

    /// Current number of open dashboard sessions (gauge).
    ActiveSessions(u64),
}

/// Observer that keeps every event and metric, for assertions in tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingObserver {
    events: std::sync::Mutex<Vec<ObserverEvent>>,
    metrics: std::sync::Mutex<Vec<ObserverMetric>>,
}

#[cfg(test)]
impl RecordingObserver {
    pub(crate) fn events(&self) -> Vec<ObserverEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn metrics(&self) -> Vec<ObserverMetric> {
        self.metrics.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Observer for RecordingObserver {
    fn record_event(&self, event: &ObserverEvent) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn record_metric(&self, metric: &ObserverMetric) {
        self.metrics.lock().unwrap().push(metric.clone());
    }

    fn name(&self) -> &str {
        "recording"
    }
}
