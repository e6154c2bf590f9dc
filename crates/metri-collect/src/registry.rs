use crate::application::Application;
use crate::definition::{MetricBuilder, TemplateRegistry};
use crate::error::{CollectError, Result};
use crate::namespace::NamespaceBuilder;
use crate::publisher::Publisher;
use metri_watch::evaluator::WatchEvaluator;
use std::collections::HashMap;
use std::sync::Arc;

type ApplicationFn = Box<dyn FnOnce(&mut ApplicationBuilder)>;

/// Configuration of one application, filled in by the closure passed to
/// [`RegistryBuilder::application`].
pub struct ApplicationBuilder {
    name: String,
    prefix: Option<String>,
    publishers: Vec<String>,
    watchers: Vec<String>,
    root: NamespaceBuilder,
}

impl ApplicationBuilder {
    fn new(name: String) -> Self {
        Self {
            name,
            prefix: None,
            publishers: Vec::new(),
            watchers: Vec::new(),
            root: NamespaceBuilder::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn publishers<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.publishers.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn watchers<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.watchers.extend(names.into_iter().map(Into::into));
        self
    }

    /// Inserts `prefix` after the first segment of every namespace.
    pub fn prefix_metrics_with(&mut self, prefix: impl Into<String>) -> &mut Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Declares metrics at the application root namespace.
    pub fn metrics(&mut self, f: impl FnOnce(&mut NamespaceBuilder)) -> &mut Self {
        f(&mut self.root);
        self
    }
}

/// Collects publishers, watchers, templates and applications; resolves all
/// names in [`build`](Self::build).
///
/// # Examples
///
/// ```
/// use metri_collect::publisher::memory::MemoryPublisher;
/// use metri_collect::registry::Registry;
/// use std::sync::Arc;
///
/// let registry = Registry::builder()
///     .publisher("test", Arc::new(MemoryPublisher::new()))
///     .application("CareerArc", |app| {
///         app.publishers(["test"]);
///     })
///     .build()
///     .unwrap();
/// assert!(registry.get("CareerArc").is_some());
/// ```
#[derive(Default)]
pub struct RegistryBuilder {
    publishers: HashMap<String, Arc<dyn Publisher>>,
    watchers: HashMap<String, Arc<WatchEvaluator>>,
    templates: TemplateRegistry,
    applications: Vec<(String, ApplicationFn)>,
}

impl RegistryBuilder {
    pub fn publisher(mut self, name: impl Into<String>, publisher: Arc<dyn Publisher>) -> Self {
        self.publishers.insert(name.into(), publisher);
        self
    }

    pub fn watcher(mut self, name: impl Into<String>, watcher: Arc<WatchEvaluator>) -> Self {
        self.watchers.insert(name.into(), watcher);
        self
    }

    pub fn template<F>(mut self, name: impl Into<String>, template: F) -> Self
    where
        F: Fn(&mut MetricBuilder) + Send + Sync + 'static,
    {
        self.templates.register(name, template);
        self
    }

    pub fn application<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(&mut ApplicationBuilder) + 'static,
    {
        self.applications.push((name.into(), Box::new(f)));
        self
    }

    /// # Errors
    ///
    /// Fails on duplicate application names and on publisher or watcher
    /// names that were never registered.
    pub fn build(self) -> Result<Registry> {
        let templates = Arc::new(self.templates);
        let mut applications = HashMap::new();

        for (name, configure) in self.applications {
            if applications.contains_key(&name) {
                return Err(CollectError::DuplicateApplication(name));
            }
            let mut builder = ApplicationBuilder::new(name.clone());
            configure(&mut builder);

            let publishers = builder
                .publishers
                .iter()
                .map(|p| {
                    self.publishers
                        .get(p)
                        .cloned()
                        .ok_or_else(|| CollectError::UnknownPublisher(p.clone()))
                })
                .collect::<Result<Vec<_>>>()?;
            let watchers = builder
                .watchers
                .iter()
                .map(|w| {
                    self.watchers
                        .get(w)
                        .cloned()
                        .ok_or_else(|| CollectError::UnknownWatcher(w.clone()))
                })
                .collect::<Result<Vec<_>>>()?;

            let app = Application::new(
                builder.name,
                builder.prefix,
                builder.root.into_nodes(),
                publishers,
                watchers,
                Arc::clone(&templates),
            );
            tracing::debug!(application = %name, "Application registered");
            applications.insert(name, Arc::new(app));
        }

        Ok(Registry {
            applications,
            publishers: self.publishers,
            watchers: self.watchers,
            templates,
        })
    }
}

/// Every configured application plus the shared publishers and watchers.
pub struct Registry {
    applications: HashMap<String, Arc<Application>>,
    publishers: HashMap<String, Arc<dyn Publisher>>,
    watchers: HashMap<String, Arc<WatchEvaluator>>,
    templates: Arc<TemplateRegistry>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("applications", &self.application_names())
            .field("publishers", &self.publishers.keys().collect::<Vec<_>>())
            .field("watchers", &self.watchers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Application>> {
        self.applications.get(name).cloned()
    }

    pub fn application(&self, name: &str) -> Result<Arc<Application>> {
        self.get(name)
            .ok_or_else(|| CollectError::UnknownApplication(name.to_string()))
    }

    pub fn application_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.applications.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn publisher(&self, name: &str) -> Option<Arc<dyn Publisher>> {
        self.publishers.get(name).cloned()
    }

    pub fn watcher(&self, name: &str) -> Option<Arc<WatchEvaluator>> {
        self.watchers.get(name).cloned()
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }
}
