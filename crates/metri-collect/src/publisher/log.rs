use crate::error::PublishError;
use crate::publisher::Publisher;
use async_trait::async_trait;
use metri_common::types::{format_dimensions, MetricSample};

/// Writes each sample to the log at `info` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPublisher;

#[async_trait]
impl Publisher for LogPublisher {
    async fn publish(&self, metrics: &[MetricSample]) -> Result<(), PublishError> {
        for metric in metrics {
            tracing::info!(
                namespace = metric.namespace(),
                name = metric.name(),
                value = metric.value(),
                unit = %metric.unit(),
                timestamp = %metric.timestamp().to_rfc3339(),
                dimensions = %format_dimensions(metric.dimensions()),
                "Metric published"
            );
        }
        Ok(())
    }

    fn publisher_name(&self) -> &str {
        "log"
    }
}
