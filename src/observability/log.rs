//! Tracing-based observer that emits structured log events.
//!
//! Uses the existing `tracing` infrastructure so events appear alongside
//! normal application logs.
use crate::observability::traits::{Observer, ObserverEvent, ObserverMetric};

/// Observer that logs events and metrics via `tracing`.
pub struct LogObserver;

impl Observer for LogObserver {
    fn record_event(&self, event: &ObserverEvent) {
        match event {
            ObserverEvent::LlmRequest {
                provider,
                model,
                message_count,
            } => {
                tracing::info!(provider, model, message_count, "observer: llm.request");
            }
            ObserverEvent::LlmResponse {
                provider,
                model,
                duration,
                success,
                error_message,
            } => {
                tracing::info!(
                    provider,
                    model,
                    duration_ms = duration.as_millis() as u64,
                    success,
                    error = error_message.as_deref().unwrap_or(""),
                    "observer: llm.response"
                );
            }
            ObserverEvent::ToolCallStart { tool } => {
                tracing::info!(tool, "observer: tool.start");
            }
            ObserverEvent::ToolCallEnd {
                tool,
                duration,
                success,
            } => {
                tracing::info!(
                    tool,
                    duration_ms = duration.as_millis() as u64,
                    success,
                    "observer: tool.end"
                );
            }
            ObserverEvent::TurnComplete => {
                tracing::info!("observer: turn.complete");
            }
            ObserverEvent::SessionChange { session_id, opened } => {
                tracing::info!(session_id, opened, "observer: session.change");
            }
            ObserverEvent::Error { component, message } => {
                tracing::warn!(component, error = message.as_str(), "observer: error");
            }
        }
    }

    fn record_metric(&self, metric: &ObserverMetric) {
        match metric {
            ObserverMetric::RequestLatency(d) => {
                tracing::debug!(
                    latency_ms = d.as_millis() as u64,
                    "observer: metric.request_latency"
                );
            }
            ObserverMetric::TokensUsed(n) => {
                tracing::debug!(tokens = n, "observer: metric.tokens_used");
            }
            ObserverMetric::ActiveSessions(n) => {
                tracing::debug!(active_sessions = n, "observer: metric.active_sessions");
            }
        }
    }

    fn name(&self) -> &str {
        "log"
    }
}
