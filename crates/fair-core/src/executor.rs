//! Fault-isolated indicator execution.
//!
//! Every catalog indicator runs as its own task on a [`JoinSet`], bounded
//! by a semaphore. Each task is guarded: a timeout, an `Err` or a panic in
//! the body becomes a zero-point [`IndicatorResult`] with an explanatory
//! message, so one bad indicator never affects its siblings. The returned
//! vector always has one result per catalog entry, in catalog order.
//!
//! Dropping the future returned by [`execute_indicators`] drops the
//! `JoinSet`, which aborts every indicator still in flight.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

use crate::catalog::IndicatorCatalog;
use crate::connector::{BoundConnector, IndicatorHandler};
use crate::domain::{IndicatorDefinition, IndicatorResult};
use crate::metrics::METRICS;
use crate::obs;

/// Configuration for one indicator batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Budget per indicator, measured from when it gets a worker slot.
    pub indicator_timeout: Duration,
    /// Maximum number of indicators running at once.
    pub max_concurrent: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            indicator_timeout: Duration::from_secs(15),
            max_concurrent: 8,
        }
    }
}

/// Run every catalog indicator against `bound`.
///
/// Connector overrides take precedence over the catalog's generic bodies.
#[instrument(skip_all, fields(connector = %bound.connector_name(), indicators = catalog.len()))]
pub async fn execute_indicators(
    bound: Arc<BoundConnector>,
    catalog: &IndicatorCatalog,
    config: &ExecutorConfig,
) -> Vec<IndicatorResult> {
    let overrides = bound.connector().indicators();
    let semaphore = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
    let mut tasks = JoinSet::new();

    for (index, definition) in catalog.definitions().iter().enumerate() {
        let body = catalog.handler_for(&definition.code, &overrides);
        let definition = definition.clone();
        let bound = Arc::clone(&bound);
        let semaphore = Arc::clone(&semaphore);
        let timeout = config.indicator_timeout;

        tasks.spawn(async move {
            // The semaphore is never closed, so acquisition only fails on abort.
            let _permit = semaphore.acquire_owned().await.ok();
            let result = run_guarded(&definition, body, bound, timeout).await;
            (index, result)
        });
    }

    let mut slots: Vec<Option<IndicatorResult>> = vec![None; catalog.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => slots[index] = Some(result),
            Err(e) => warn!(error = %e, "indicator task did not complete"),
        }
    }

    catalog
        .definitions()
        .iter()
        .zip(slots)
        .map(|(definition, slot)| {
            slot.unwrap_or_else(|| {
                let message = format!("[ERROR] {}: task aborted", definition.code);
                obs::emit_indicator_degraded(&definition.code, &message);
                METRICS.inc_indicators_degraded();
                IndicatorResult::degraded(definition, message)
            })
        })
        .collect()
}

/// Run one indicator body under the timeout and fault guard.
///
/// Calls that indicators make to each other or to shared helpers happen
/// inside `body` and are not guarded separately.
pub async fn run_guarded(
    definition: &IndicatorDefinition,
    body: IndicatorHandler,
    bound: Arc<BoundConnector>,
    timeout: Duration,
) -> IndicatorResult {
    METRICS.inc_indicators_run();
    let code = definition.code.as_str();
    // Invoke inside the future so a panic while building it is caught too.
    let invocation = AssertUnwindSafe(async move { body(bound).await }).catch_unwind();

    match tokio::time::timeout(timeout, invocation).await {
        Ok(Ok(Ok(outcome))) => {
            debug!(code = %code, points = outcome.points, "indicator scored");
            IndicatorResult::new(definition, outcome)
        }
        Ok(Ok(Err(e))) => {
            let message = format!("[ERROR] {code}: {e:#}");
            obs::emit_indicator_degraded(code, &message);
            METRICS.inc_indicators_degraded();
            IndicatorResult::degraded(definition, message)
        }
        Ok(Err(panic)) => {
            let message = format!("[ERROR] {code}: {}", panic_message(panic.as_ref()));
            obs::emit_indicator_degraded(code, &message);
            METRICS.inc_indicators_degraded();
            IndicatorResult::degraded(definition, message)
        }
        Err(_) => {
            let message = format!("timeout after {}", format_duration(timeout));
            obs::emit_indicator_degraded(code, &message);
            METRICS.inc_indicators_timed_out();
            IndicatorResult::degraded(definition, message)
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic".to_string()
    }
}

fn format_duration(d: Duration) -> String {
    if d.subsec_millis() == 0 {
        format!("{}s", d.as_secs())
    } else {
        format!("{}ms", d.as_millis())
    }
}
