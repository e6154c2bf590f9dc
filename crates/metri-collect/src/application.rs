use crate::definition::{apply_prefix, Defaults, Metric, MetricBuilder, TemplateRegistry};
use crate::error::{CollectError, Result};
use crate::namespace::{self, Node, Pass};
use crate::publisher::Publisher;
use chrono::{DateTime, Utc};
use metri_common::types::{Dimension, MetricSample, Unit};
use metri_watch::evaluator::WatchEvaluator;
use metri_watch::registry::WatchStatus;
use metri_watch::spec::{WatchConfig, WatchKey, WatchSpec};
use serde::Deserialize;
use std::sync::Arc;

/// Result of one collection pass: the metrics that were built and the
/// definitions that failed.
#[derive(Debug, Default)]
pub struct Collection {
    pub metrics: Vec<Metric>,
    pub errors: Vec<CollectError>,
}

impl Collection {
    /// The metrics, or the first definition error.
    pub fn into_result(self) -> Result<Vec<Metric>> {
        match self.errors.into_iter().next() {
            Some(e) => Err(e),
            None => Ok(self.metrics),
        }
    }
}

/// Options for publishing a single metric without declaring it first.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectMetric {
    pub namespace: String,
    pub name: String,
    pub value: f64,
    #[serde(default)]
    pub unit: Unit,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub watches: Vec<WatchConfig>,
}

/// A named set of metric definitions with its publishers and watchers.
pub struct Application {
    name: String,
    prefix: Option<String>,
    nodes: Vec<Node>,
    publishers: Vec<Arc<dyn Publisher>>,
    watchers: Vec<Arc<WatchEvaluator>>,
    templates: Arc<TemplateRegistry>,
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("name", &self.name)
            .field("prefix", &self.prefix)
            .field("definitions", &self.nodes.len())
            .field(
                "publishers",
                &self.publishers.iter().map(|p| p.publisher_name()).collect::<Vec<_>>(),
            )
            .field("watchers", &self.watchers.len())
            .finish()
    }
}

impl Application {
    pub(crate) fn new(
        name: String,
        prefix: Option<String>,
        nodes: Vec<Node>,
        publishers: Vec<Arc<dyn Publisher>>,
        watchers: Vec<Arc<WatchEvaluator>>,
        templates: Arc<TemplateRegistry>,
    ) -> Self {
        Self {
            name,
            prefix,
            nodes,
            publishers,
            watchers,
            templates,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn watchers(&self) -> &[Arc<WatchEvaluator>] {
        &self.watchers
    }

    /// Runs every definition once. Failing definitions are collected in
    /// [`Collection::errors`] and the rest of the pass continues.
    ///
    /// `roles` restricts role-scoped groups; `None` collects all of them.
    pub fn collect(&self, roles: Option<&[String]>) -> Collection {
        let pass = Pass {
            prefix: self.prefix.as_deref(),
            timestamp: Utc::now(),
            templates: &self.templates,
            roles,
        };
        let mut collection = Collection::default();
        let mut path = vec![self.name.clone()];
        namespace::collect(
            &self.nodes,
            &mut path,
            &pass,
            &mut collection.metrics,
            &mut collection.errors,
        );
        collection
    }

    /// Runs every definition once and fails on the first broken one.
    pub fn metrics(&self) -> Result<Vec<Metric>> {
        self.collect(None).into_result()
    }

    pub fn metrics_for_roles(&self, roles: &[String]) -> Result<Vec<Metric>> {
        self.collect(Some(roles)).into_result()
    }

    /// Evaluates the watches attached to `metrics` on every watcher of this
    /// application.
    pub fn watch(&self, metrics: &[Metric]) -> Vec<(WatchKey, WatchStatus)> {
        let mut results = Vec::new();
        for metric in metrics.iter().filter(|m| !m.watches.is_empty()) {
            for watcher in &self.watchers {
                results.extend(watcher.watch(&metric.sample, &metric.watches));
            }
        }
        results
    }

    /// Evaluates watches, then hands the samples to every publisher.
    ///
    /// Every publisher is attempted; the first failure is returned.
    pub async fn publish(&self, metrics: &[Metric]) -> Result<()> {
        let triggered: Vec<WatchKey> = self
            .watch(metrics)
            .into_iter()
            .filter(|(_, status)| status.is_triggered())
            .map(|(key, _)| key)
            .collect();
        if !triggered.is_empty() {
            tracing::debug!(
                application = %self.name,
                triggered = ?triggered,
                "Watches triggered before publish"
            );
        }
        if metrics.is_empty() || self.publishers.is_empty() {
            return Ok(());
        }

        let samples: Vec<MetricSample> = metrics.iter().map(|m| m.sample.clone()).collect();
        let mut first_error = None;
        for publisher in &self.publishers {
            if let Err(e) = publisher.publish(&samples).await {
                tracing::warn!(
                    application = %self.name,
                    publisher = publisher.publisher_name(),
                    error = %e,
                    "Publish failed"
                );
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Collects and publishes everything, optionally filtered by roles.
    /// Returns the number of metrics published.
    pub async fn publish_all(&self, roles: Option<&[String]>) -> Result<usize> {
        let collection = self.collect(roles);
        for error in &collection.errors {
            tracing::warn!(application = %self.name, error = %error, "Metric definition failed");
        }
        self.publish(&collection.metrics).await?;
        tracing::debug!(
            application = %self.name,
            count = collection.metrics.len(),
            failed = collection.errors.len(),
            "Collection pass published"
        );
        Ok(collection.metrics.len())
    }

    /// Publishes one metric described by options. The namespace receives the
    /// application prefix; watch options are validated before anything is
    /// published.
    pub async fn publish_direct(&self, options: DirectMetric) -> Result<Metric> {
        let watches = options
            .watches
            .into_iter()
            .map(WatchSpec::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut builder = MetricBuilder::new();
        builder
            .name(options.name)
            .namespace(options.namespace)
            .value(options.value)
            .unit(options.unit)
            .dimensions(options.dimensions.into_iter().map(|d| (d.name, d.value)));
        if let Some(ts) = options.timestamp {
            builder.timestamp(ts);
        }
        if let Some(template) = options.template {
            builder.template(template);
        }
        for watch in watches {
            builder.watch(watch);
        }

        self.publish_built(builder).await
    }

    /// Publishes one metric produced by a closure.
    pub async fn publish_with<F>(&self, body: F) -> Result<Metric>
    where
        F: FnOnce(&mut MetricBuilder) -> anyhow::Result<()>,
    {
        let mut builder = MetricBuilder::new();
        body(&mut builder).map_err(|source| CollectError::Definition {
            metric: "direct".to_string(),
            source,
        })?;
        self.publish_built(builder).await
    }

    async fn publish_built(&self, builder: MetricBuilder) -> Result<Metric> {
        let namespace = apply_prefix(&self.name, self.prefix.as_deref());
        let metric = builder.finish(&Defaults {
            name: None,
            namespace: &namespace,
            prefix: self.prefix.as_deref(),
            timestamp: Utc::now(),
            templates: &self.templates,
        })?;
        self.publish(std::slice::from_ref(&metric)).await?;
        Ok(metric)
    }
}
