//! Structured lifecycle events for evaluations.
//!
//! [`EvaluationSpan`] scopes everything logged while one request runs;
//! the `emit_*` functions log the key transitions at `info!` (or `warn!`
//! for failures) with a stable `event` field.

use std::future::Future;

use tracing::instrument::Instrumented;
use tracing::{info, warn, Instrument};

/// Evaluation-scoped span carrying the evaluation id and item.
///
/// The span is attached to the evaluation future rather than entered on
/// the current thread, so it follows the request across worker threads.
pub struct EvaluationSpan {
    span: tracing::Span,
}

impl EvaluationSpan {
    pub fn new(evaluation_id: &str, item: &str) -> Self {
        Self {
            span: tracing::info_span!("fair.evaluation", evaluation_id = %evaluation_id, item = %item),
        }
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    /// Run `future` inside the span.
    pub fn scope<F: Future>(self, future: F) -> Instrumented<F> {
        future.instrument(self.span)
    }
}

pub fn emit_evaluation_started(evaluation_id: &str, raw_id: &str, repo: Option<&str>) {
    info!(
        event = "evaluation.started",
        evaluation_id = %evaluation_id,
        raw_id = %raw_id,
        repo = repo.unwrap_or("auto"),
    );
}

/// Emit event: request routed to a connector.
pub fn emit_evaluation_routed(evaluation_id: &str, plugin: &str, endpoint: Option<&str>) {
    info!(
        event = "evaluation.routed",
        evaluation_id = %evaluation_id,
        plugin = %plugin,
        endpoint = endpoint.unwrap_or(""),
    );
}

/// Emit event: an indicator scored through the timeout, error or panic path.
pub fn emit_indicator_degraded(code: &str, reason: &str) {
    warn!(event = "indicator.degraded", code = %code, reason = %reason);
}

pub fn emit_evaluation_finished(evaluation_id: &str, indicators: usize, overall: f64, duration_ms: u64) {
    info!(
        event = "evaluation.finished",
        evaluation_id = %evaluation_id,
        indicators = indicators,
        overall = overall,
        duration_ms = duration_ms,
    );
}

pub fn emit_evaluation_failed(evaluation_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "evaluation.failed", evaluation_id = %evaluation_id, error = %error);
}
