//! Metric sinks.
//!
//! A [`Publisher`] receives the samples of a collection pass. Built-in
//! publishers keep samples in memory ([`memory::MemoryPublisher`]), log them
//! ([`log::LogPublisher`]) or post them as JSON batches
//! ([`http::HttpPublisher`]).

pub mod http;
pub mod log;
pub mod memory;

use crate::error::PublishError;
use async_trait::async_trait;
use metri_common::types::MetricSample;

/// Largest number of samples sent in one batch.
pub const MAX_BATCH_SIZE: usize = 20;

/// A destination for collected metric samples.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes the given samples.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink could not accept the samples. Callers do
    /// not retry.
    async fn publish(&self, metrics: &[MetricSample]) -> Result<(), PublishError>;

    /// Returns the publisher type name (e.g., `"memory"`, `"http"`).
    fn publisher_name(&self) -> &str;
}

/// Samples sharing one namespace, at most [`MAX_BATCH_SIZE`] of them.
#[derive(Debug, PartialEq)]
pub struct Batch<'a> {
    pub namespace: &'a str,
    pub metrics: Vec<&'a MetricSample>,
}

/// Groups samples by namespace (in order of first appearance) and splits
/// each group into batches of at most `max_size` samples.
pub fn batches(metrics: &[MetricSample], max_size: usize) -> Vec<Batch<'_>> {
    let max_size = max_size.max(1);
    let mut namespaces: Vec<&str> = Vec::new();
    for metric in metrics {
        if !namespaces.contains(&metric.namespace()) {
            namespaces.push(metric.namespace());
        }
    }

    let mut out = Vec::new();
    for namespace in namespaces {
        let group: Vec<&MetricSample> = metrics
            .iter()
            .filter(|m| m.namespace() == namespace)
            .collect();
        for chunk in group.chunks(max_size) {
            out.push(Batch {
                namespace,
                metrics: chunk.to_vec(),
            });
        }
    }
    out
}
