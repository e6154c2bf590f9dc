use crate::error::PublishError;
use crate::publisher::Publisher;
use async_trait::async_trait;
use metri_common::types::MetricSample;
use std::sync::{Mutex, PoisonError};

/// Keeps every published sample in memory. Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    published: Mutex<Vec<MetricSample>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<MetricSample> {
        self.lock().clone()
    }

    pub fn last(&self) -> Option<MetricSample> {
        self.lock().last().cloned()
    }

    pub fn is_published(&self, metric: &MetricSample) -> bool {
        self.lock().contains(metric)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<MetricSample>> {
        self.published.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Publisher for MemoryPublisher {
    async fn publish(&self, metrics: &[MetricSample]) -> Result<(), PublishError> {
        self.lock().extend_from_slice(metrics);
        Ok(())
    }

    fn publisher_name(&self) -> &str {
        "memory"
    }
}
