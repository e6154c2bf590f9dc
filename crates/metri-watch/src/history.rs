use crate::spec::WatchKey;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{PoisonError, RwLock};

/// One `(timestamp, value)` observation retained for a watch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl HistoryEntry {
    /// Inside the period that ends at `as_of`. Entries newer than `as_of`
    /// are outside it.
    fn within(&self, as_of: DateTime<Utc>, period_secs: u64) -> bool {
        let age = as_of - self.timestamp;
        age >= Duration::zero() && age <= period(period_secs)
    }
}

fn period(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

/// Insertion-ordered entries of one watch. Retention is the longest period
/// any watch sharing this key has asked for, so a short-period watch never
/// evicts data a longer one still needs.
#[derive(Debug, Default)]
struct SlidingWindow {
    retention_secs: u64,
    newest: Option<DateTime<Utc>>,
    entries: VecDeque<HistoryEntry>,
}

impl SlidingWindow {
    /// Prunes relative to the newest timestamp seen, then appends. A late
    /// entry is always stored, even one already past retention, so its own
    /// evaluation sees it; the next push drops it.
    fn push(&mut self, entry: HistoryEntry, period_secs: u64) {
        self.retention_secs = self.retention_secs.max(period_secs);
        let newest = self
            .newest
            .map_or(entry.timestamp, |n| n.max(entry.timestamp));
        self.newest = Some(newest);
        self.evict(newest);
        self.entries.push_back(entry);
    }

    fn evict(&mut self, newest: DateTime<Utc>) {
        let retention = self.retention_secs;
        // retain rather than pop_front: late samples may sit behind newer ones
        self.entries.retain(|e| e.within(newest, retention));
    }

    fn window(&self, as_of: DateTime<Utc>, period_secs: u64) -> Vec<HistoryEntry> {
        self.entries
            .iter()
            .filter(|e| e.within(as_of, period_secs))
            .copied()
            .collect()
    }
}

/// Rolling per-watch buffer of recent samples.
///
/// Pruning happens on [`record`](Self::record), relative to the newest
/// recorded timestamp; [`window`](Self::window) filters again by its own `as_of`, so a
/// read is always correct even if nothing was recorded for a while.
#[derive(Debug, Default)]
pub struct HistoryStore {
    windows: RwLock<HashMap<WatchKey, SlidingWindow>>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, key: &WatchKey, timestamp: DateTime<Utc>, value: f64, period_secs: u64) {
        let mut windows = self.windows.write().unwrap_or_else(PoisonError::into_inner);
        windows
            .entry(key.clone())
            .or_default()
            .push(HistoryEntry { timestamp, value }, period_secs);
    }

    /// Entries with `0 <= as_of - timestamp <= period_secs`, in insertion order.
    /// An unknown key yields an empty window.
    pub fn window(&self, key: &WatchKey, period_secs: u64, as_of: DateTime<Utc>) -> Vec<HistoryEntry> {
        let windows = self.windows.read().unwrap_or_else(PoisonError::into_inner);
        windows
            .get(key)
            .map(|w| w.window(as_of, period_secs))
            .unwrap_or_default()
    }

    /// Number of retained entries for a key.
    pub fn len(&self, key: &WatchKey) -> usize {
        let windows = self.windows.read().unwrap_or_else(PoisonError::into_inner);
        windows.get(key).map_or(0, |w| w.entries.len())
    }

    pub fn clear(&self) {
        self.windows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
