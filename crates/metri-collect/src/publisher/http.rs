use crate::error::PublishError;
use crate::publisher::{batches, Batch, Publisher, MAX_BATCH_SIZE};
use async_trait::async_trait;
use metri_common::types::{Dimension, MetricSample, Unit};
use serde::Serialize;
use std::time::Duration;

/// Maximum number of response body bytes kept in a rejection error.
const MAX_BODY_LENGTH: usize = 512;

/// Posts samples as JSON, one request per namespace batch.
///
/// The body of each request is
/// `{"namespace": "...", "metrics": [{"name", "value", "unit", "timestamp", "dimensions"}]}`.
pub struct HttpPublisher {
    endpoint: String,
    client: reqwest::Client,
    batch_size: usize,
}

#[derive(Debug, Serialize)]
struct PutMetricData<'a> {
    namespace: &'a str,
    metrics: Vec<MetricDatum<'a>>,
}

#[derive(Debug, Serialize)]
struct MetricDatum<'a> {
    name: &'a str,
    value: f64,
    unit: Unit,
    timestamp: String,
    dimensions: &'a [Dimension],
}

impl<'a> From<&Batch<'a>> for PutMetricData<'a> {
    fn from(batch: &Batch<'a>) -> Self {
        Self {
            namespace: batch.namespace,
            metrics: batch
                .metrics
                .iter()
                .map(|m| MetricDatum {
                    name: m.name(),
                    value: m.value(),
                    unit: m.unit(),
                    timestamp: m.timestamp().to_rfc3339(),
                    dimensions: m.dimensions(),
                })
                .collect(),
        }
    }
}

impl HttpPublisher {
    /// # Errors
    ///
    /// Returns [`PublishError::Http`] if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
            batch_size: MAX_BATCH_SIZE,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Publisher for HttpPublisher {
    async fn publish(&self, metrics: &[MetricSample]) -> Result<(), PublishError> {
        for batch in batches(metrics, self.batch_size) {
            let payload = PutMetricData::from(&batch);
            let resp = self.client.post(&self.endpoint).json(&payload).send().await?;
            let status = resp.status();
            if !status.is_success() {
                let mut body = resp.text().await.unwrap_or_default();
                if body.len() > MAX_BODY_LENGTH {
                    let mut end = MAX_BODY_LENGTH;
                    while !body.is_char_boundary(end) {
                        end -= 1;
                    }
                    body.truncate(end);
                }
                return Err(PublishError::Rejected {
                    publisher: self.publisher_name().to_string(),
                    status: status.as_u16(),
                    body,
                });
            }
            tracing::debug!(
                endpoint = %self.endpoint,
                namespace = batch.namespace,
                count = batch.metrics.len(),
                "Metric batch posted"
            );
        }
        Ok(())
    }

    fn publisher_name(&self) -> &str {
        "http"
    }
}
