use crate::spec::WatchKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Debounced state of a watch as seen by alert routing.
///
/// # Examples
///
/// ```
/// use metri_watch::registry::WatchStatus;
///
/// assert_eq!(WatchStatus::default(), WatchStatus::Ok);
/// assert_eq!(WatchStatus::Triggered.to_string(), "triggered");
/// assert!(WatchStatus::Triggered.is_triggered());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchStatus {
    #[default]
    Ok,
    Triggered,
}

impl WatchStatus {
    pub fn is_triggered(&self) -> bool {
        matches!(self, WatchStatus::Triggered)
    }
}

impl std::fmt::Display for WatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatchStatus::Ok => write!(f, "ok"),
            WatchStatus::Triggered => write!(f, "triggered"),
        }
    }
}

/// Runtime state of one watch key.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WatchState {
    pub consecutive_qualifying: u32,
    pub status: WatchStatus,
    /// Statistic computed on the last evaluation, `None` when undefined.
    pub last_value: Option<f64>,
    pub last_evaluated: Option<DateTime<Utc>>,
}

/// Process-lifetime mapping from watch key to runtime state.
///
/// Only the evaluator writes; any number of readers may query concurrently.
/// Keys that were never evaluated report [`WatchStatus::Ok`].
#[derive(Debug, Default)]
pub struct StatusRegistry {
    states: RwLock<HashMap<WatchKey, WatchState>>,
}

impl StatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, key: &WatchKey) -> WatchStatus {
        self.read(|states| states.get(key).map(|s| s.status).unwrap_or_default())
    }

    pub fn state(&self, key: &WatchKey) -> Option<WatchState> {
        self.read(|states| states.get(key).copied())
    }

    /// All known keys and their status, sorted by key.
    pub fn snapshot(&self) -> Vec<(WatchKey, WatchStatus)> {
        let mut all: Vec<_> = self.read(|states| {
            states
                .iter()
                .map(|(k, s)| (k.clone(), s.status))
                .collect()
        });
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Keys currently in [`WatchStatus::Triggered`], sorted.
    pub fn triggered(&self) -> Vec<WatchKey> {
        self.snapshot()
            .into_iter()
            .filter(|(_, status)| status.is_triggered())
            .map(|(key, _)| key)
            .collect()
    }

    /// Status of every key whose name matches a glob pattern (`"*"` matches all).
    pub fn matching(&self, pattern: &str) -> Vec<(WatchKey, WatchStatus)> {
        self.snapshot()
            .into_iter()
            .filter(|(key, _)| name_matches(pattern, key.name()))
            .collect()
    }

    /// Drops every state. Intended for test isolation and explicit teardown.
    pub fn reset(&self) {
        self.states
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Stores the new state of `key`. Only the evaluator writes.
    pub(crate) fn set(&self, key: &WatchKey, state: WatchState) {
        self.states
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), state);
    }

    fn read<T>(&self, f: impl FnOnce(&HashMap<WatchKey, WatchState>) -> T) -> T {
        let states = self.states.read().unwrap_or_else(PoisonError::into_inner);
        f(&states)
    }
}

fn name_matches(pattern: &str, name: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    glob_match::glob_match(pattern, name)
}
