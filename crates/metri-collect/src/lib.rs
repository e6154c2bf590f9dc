//! Metric definitions, publishing and polling.
//!
//! Applications declare metrics in nested namespaces ([`namespace`]), reuse
//! fragments through templates ([`definition::TemplateRegistry`]), and hand
//! each collection pass to their [`publisher::Publisher`]s. Metrics that
//! declare watches are evaluated by the application's
//! [`metri_watch::WatchEvaluator`]s before publishing. The [`runner::Runner`]
//! repeats passes at a fixed frequency.

pub mod application;
pub mod definition;
pub mod error;
pub mod namespace;
pub mod publisher;
pub mod registry;
pub mod runner;

#[cfg(test)]
mod tests;

pub use application::{Application, Collection, DirectMetric};
pub use definition::{Metric, MetricBuilder};
pub use registry::Registry;
pub use runner::Runner;
