//! Watch evaluation engine.
//!
//! A watch is a named alerting rule bound to one metric: a statistic
//! (sum, average, min, max, count) over a trailing period compared against a
//! threshold, debounced by a minimum number of consecutive qualifying
//! evaluations. The [`evaluator::WatchEvaluator`] records each sample into a
//! per-watch [`history::HistoryStore`], reduces the window with a
//! [`statistic::Statistic`] and publishes the resulting
//! [`registry::WatchStatus`] into a shared [`registry::StatusRegistry`].
//!
//! Windows are computed relative to the sample's own timestamp, so a fixed
//! sequence of samples always produces the same statuses.

pub mod comparator;
pub mod error;
pub mod evaluator;
pub mod history;
pub mod registry;
pub mod spec;
pub mod statistic;


pub use evaluator::{Evaluation, WatchEvaluator};
pub use registry::{StatusRegistry, WatchStatus};
pub use spec::{WatchConfig, WatchKey, WatchSpec};
