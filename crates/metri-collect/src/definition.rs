use crate::error::{CollectError, Result};
use chrono::{DateTime, Utc};
use metri_common::types::{Dimension, MetricSample, Unit};
use metri_watch::spec::WatchSpec;
use std::collections::HashMap;
use std::sync::Arc;

/// A finished metric: the sample plus the watches declared on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub sample: MetricSample,
    pub watches: Vec<WatchSpec>,
}

impl std::ops::Deref for Metric {
    type Target = MetricSample;
    fn deref(&self) -> &MetricSample {
        &self.sample
    }
}

/// Mutable scratch space handed to metric bodies and templates.
///
/// Anything left unset falls back to the surrounding definition: the name of
/// the `metric`/`group` entry, the namespace path, and the pass timestamp.
/// Setting a namespace here replaces the composed path verbatim.
#[derive(Debug, Default, Clone)]
pub struct MetricBuilder {
    name: Option<String>,
    namespace: Option<String>,
    value: Option<f64>,
    unit: Unit,
    timestamp: Option<DateTime<Utc>>,
    dimensions: Vec<Dimension>,
    templates: Vec<String>,
    watches: Vec<WatchSpec>,
}

impl MetricBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    pub fn namespace(&mut self, namespace: impl Into<String>) -> &mut Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn value(&mut self, value: impl Into<f64>) -> &mut Self {
        self.value = Some(value.into());
        self
    }

    pub fn unit(&mut self, unit: Unit) -> &mut Self {
        self.unit = unit;
        self
    }

    pub fn timestamp(&mut self, timestamp: DateTime<Utc>) -> &mut Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn dimension(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.dimensions.push(Dimension::new(name, value));
        self
    }

    pub fn dimensions<K, V>(&mut self, dimensions: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in dimensions {
            self.dimension(k, v);
        }
        self
    }

    /// Applies a registered template after the body has run.
    pub fn template(&mut self, name: impl Into<String>) -> &mut Self {
        self.templates.push(name.into());
        self
    }

    pub fn watch(&mut self, spec: WatchSpec) -> &mut Self {
        self.watches.push(spec);
        self
    }

    /// Applies templates, resolves defaults and freezes the metric.
    pub(crate) fn finish(mut self, ctx: &Defaults<'_>) -> Result<Metric> {
        let templates = std::mem::take(&mut self.templates);
        for name in &templates {
            let template = ctx
                .templates
                .get(name)
                .ok_or_else(|| CollectError::UnknownTemplate(name.clone()))?;
            template(&mut self);
        }

        let namespace = match self.namespace {
            Some(ns) => apply_prefix(&ns, ctx.prefix),
            None => ctx.namespace.to_string(),
        };
        let name = self
            .name
            .or_else(|| ctx.name.map(str::to_string))
            .ok_or_else(|| CollectError::MissingName {
                namespace: namespace.clone(),
            })?;
        let value = self
            .value
            .ok_or_else(|| CollectError::MissingValue { metric: name.clone() })?;

        Ok(Metric {
            sample: MetricSample::new(
                namespace,
                name,
                value,
                self.unit,
                self.timestamp.unwrap_or(ctx.timestamp),
                self.dimensions,
            ),
            watches: self.watches,
        })
    }
}

/// Values a metric falls back to when its body leaves them unset.
pub(crate) struct Defaults<'a> {
    pub name: Option<&'a str>,
    /// Already prefixed.
    pub namespace: &'a str,
    pub prefix: Option<&'a str>,
    pub timestamp: DateTime<Utc>,
    pub templates: &'a TemplateRegistry,
}

/// Inserts `prefix` after the first namespace segment:
/// `CareerArc/Counters` with `development` becomes `CareerArc/development/Counters`.
pub fn apply_prefix(namespace: &str, prefix: Option<&str>) -> String {
    let Some(prefix) = prefix.filter(|p| !p.is_empty()) else {
        return namespace.to_string();
    };
    match namespace.split_once('/') {
        Some((head, rest)) => format!("{head}/{prefix}/{rest}"),
        None => format!("{namespace}/{prefix}"),
    }
}

pub type Template = Arc<dyn Fn(&mut MetricBuilder) + Send + Sync>;

/// Named, reusable metric fragments (shared dimensions, units, watches).
#[derive(Default, Clone)]
pub struct TemplateRegistry {
    templates: HashMap<String, Template>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, template: F)
    where
        F: Fn(&mut MetricBuilder) + Send + Sync + 'static,
    {
        self.templates.insert(name.into(), Arc::new(template));
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }
}

impl std::fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRegistry")
            .field("templates", &self.templates.keys().collect::<Vec<_>>())
            .finish()
    }
}
