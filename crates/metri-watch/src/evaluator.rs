use crate::history::HistoryStore;
use crate::registry::{StatusRegistry, WatchState, WatchStatus};
use crate::spec::{WatchKey, WatchSpec};
use chrono::{DateTime, Utc};
use metri_common::types::MetricSample;
use std::sync::{Arc, Mutex, PoisonError};

/// Outcome of one evaluation step.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub key: WatchKey,
    /// Statistic over the trailing window; `None` when undefined for it.
    pub statistic: Option<f64>,
    pub qualifies: bool,
    pub consecutive_qualifying: u32,
    pub previous: WatchStatus,
    pub status: WatchStatus,
}

impl Evaluation {
    pub fn changed(&self) -> bool {
        self.previous != self.status
    }
}

/// Applies watch specifications to incoming samples, keeping per-watch
/// history and debounced status.
///
/// Evaluations are serialized by one coarse lock that covers both the
/// history and the registry it owns. Share the evaluator itself through
/// `Arc` to evaluate from several tasks; [`registry`](Self::registry) hands
/// out a read handle for alert routing.
pub struct WatchEvaluator {
    history: HistoryStore,
    registry: Arc<StatusRegistry>,
    lock: Mutex<()>,
}

impl Default for WatchEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchEvaluator {
    pub fn new() -> Self {
        Self {
            history: HistoryStore::new(),
            registry: Arc::new(StatusRegistry::new()),
            lock: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> Arc<StatusRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Evaluates `spec` against `sample` under the spec's name and returns
    /// the resulting status.
    pub fn evaluate(&self, spec: &WatchSpec, sample: &MetricSample) -> WatchStatus {
        self.evaluate_keyed(&spec.key(), spec, sample).status
    }

    /// Evaluates every watch attached to one sample.
    pub fn watch<'a>(
        &self,
        sample: &MetricSample,
        specs: impl IntoIterator<Item = &'a WatchSpec>,
    ) -> Vec<(WatchKey, WatchStatus)> {
        specs
            .into_iter()
            .map(|spec| {
                let evaluation = self.evaluate_keyed(&spec.key(), spec, sample);
                (evaluation.key, evaluation.status)
            })
            .collect()
    }

    pub fn evaluate_keyed(&self, key: &WatchKey, spec: &WatchSpec, sample: &MetricSample) -> Evaluation {
        self.evaluate_at(key, spec, sample.timestamp(), sample.value())
    }

    /// One evaluation step for a raw `(timestamp, value)` observation. The
    /// window is computed as of `timestamp`, never the wall clock.
    pub fn evaluate_at(
        &self,
        key: &WatchKey,
        spec: &WatchSpec,
        timestamp: DateTime<Utc>,
        value: f64,
    ) -> Evaluation {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        self.history.record(key, timestamp, value, spec.period_secs());
        let window = self.history.window(key, spec.period_secs(), timestamp);

        let statistic = spec.statistic().compute(&window);
        let qualifies = statistic.is_some_and(|stat| spec.comparator().check(stat, spec.threshold()));

        let previous = self.registry.state(key).unwrap_or_default();
        let consecutive_qualifying = if qualifies {
            previous.consecutive_qualifying.saturating_add(1)
        } else {
            0
        };
        let status = if consecutive_qualifying >= spec.evaluations() {
            WatchStatus::Triggered
        } else {
            WatchStatus::Ok
        };

        self.registry.set(
            key,
            WatchState {
                consecutive_qualifying,
                status,
                last_value: statistic,
                last_evaluated: Some(timestamp),
            },
        );

        let evaluation = Evaluation {
            key: key.clone(),
            statistic,
            qualifies,
            consecutive_qualifying,
            previous: previous.status,
            status,
        };
        log_evaluation(spec, &evaluation, window.len());
        evaluation
    }

    /// Status of a watch by name; `Ok` if it was never evaluated.
    pub fn status(&self, name: &str) -> WatchStatus {
        self.registry.status(&WatchKey::named(name))
    }

    /// Forgets all history and runtime state.
    pub fn reset(&self) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.history.clear();
        self.registry.reset();
    }
}

fn log_evaluation(spec: &WatchSpec, evaluation: &Evaluation, window_len: usize) {
    let key = &evaluation.key;
    match (evaluation.previous, evaluation.status) {
        (WatchStatus::Ok, WatchStatus::Triggered) => tracing::warn!(
            watch = %key,
            condition = %spec.condition(),
            statistic = ?evaluation.statistic,
            consecutive = evaluation.consecutive_qualifying,
            "Watch triggered"
        ),
        (WatchStatus::Triggered, WatchStatus::Ok) => tracing::info!(
            watch = %key,
            statistic = ?evaluation.statistic,
            "Watch recovered"
        ),
        _ => tracing::debug!(
            watch = %key,
            statistic = ?evaluation.statistic,
            window = window_len,
            qualifies = evaluation.qualifies,
            consecutive = evaluation.consecutive_qualifying,
            status = %evaluation.status,
            "Watch evaluated"
        ),
    }
}
