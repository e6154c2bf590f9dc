use crate::definition::{apply_prefix, Defaults, Metric, MetricBuilder, TemplateRegistry};
use crate::error::CollectError;
use chrono::{DateTime, Utc};
use metri_common::types::join_namespace;

pub type MetricBody = Box<dyn Fn(&mut MetricBuilder) -> anyhow::Result<()> + Send + Sync>;
pub type GroupBody = Box<dyn Fn(&mut GroupBuilder) -> anyhow::Result<()> + Send + Sync>;

pub(crate) enum Node {
    Namespace {
        name: String,
        children: Vec<Node>,
    },
    Metric {
        name: String,
        body: MetricBody,
    },
    Group {
        name: String,
        roles: Vec<String>,
        body: GroupBody,
    },
}

/// Declares metrics under a (possibly nested) namespace.
///
/// # Examples
///
/// ```
/// use metri_collect::namespace::NamespaceBuilder;
///
/// let mut root = NamespaceBuilder::new();
/// root.namespace("Application", |app| {
///     app.namespace("Users", |users| {
///         users.metric("Total", |m| {
///             m.value(50);
///             Ok(())
///         });
///     });
/// });
/// assert_eq!(root.len(), 1);
/// ```
#[derive(Default)]
pub struct NamespaceBuilder {
    nodes: Vec<Node>,
}

impl NamespaceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespace(&mut self, name: impl Into<String>, f: impl FnOnce(&mut NamespaceBuilder)) -> &mut Self {
        let mut inner = NamespaceBuilder::new();
        f(&mut inner);
        self.nodes.push(Node::Namespace {
            name: name.into(),
            children: inner.nodes,
        });
        self
    }

    /// Declares one metric. The body runs on every collection pass.
    pub fn metric<F>(&mut self, name: impl Into<String>, body: F) -> &mut Self
    where
        F: Fn(&mut MetricBuilder) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.nodes.push(Node::Metric {
            name: name.into(),
            body: Box::new(body),
        });
        self
    }

    /// Declares a group: a body that yields several metrics per pass, all
    /// named after the group and sharing one timestamp.
    pub fn group<F>(&mut self, name: impl Into<String>, body: F) -> &mut Self
    where
        F: Fn(&mut GroupBuilder) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.group_for_roles(name, Vec::<String>::new(), body)
    }

    /// Like [`group`](Self::group), but only collected for hosts carrying one
    /// of `roles`. An empty role list matches every host.
    pub fn group_for_roles<F, R>(&mut self, name: impl Into<String>, roles: R, body: F) -> &mut Self
    where
        F: Fn(&mut GroupBuilder) -> anyhow::Result<()> + Send + Sync + 'static,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        self.nodes.push(Node::Group {
            name: name.into(),
            roles: roles.into_iter().map(Into::into).collect(),
            body: Box::new(body),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }
}

/// Collects the metrics of one group body.
#[derive(Default)]
pub struct GroupBuilder {
    metrics: Vec<MetricBuilder>,
}

impl GroupBuilder {
    /// Starts a new metric in this group.
    pub fn metric(&mut self) -> &mut MetricBuilder {
        self.metrics.push(MetricBuilder::new());
        let last = self.metrics.len() - 1;
        &mut self.metrics[last]
    }
}

/// Inputs shared by every node of one collection pass.
pub(crate) struct Pass<'a> {
    pub prefix: Option<&'a str>,
    pub timestamp: DateTime<Utc>,
    pub templates: &'a TemplateRegistry,
    /// `None` collects every group regardless of roles.
    pub roles: Option<&'a [String]>,
}

impl Pass<'_> {
    fn matches_roles(&self, group_roles: &[String]) -> bool {
        match self.roles {
            None => true,
            Some(roles) => group_roles.is_empty() || group_roles.iter().any(|r| roles.contains(r)),
        }
    }
}

/// Walks the tree depth-first, in declaration order. A failing definition is
/// reported in `errors` and does not stop the rest of the pass.
pub(crate) fn collect(
    nodes: &[Node],
    path: &mut Vec<String>,
    pass: &Pass<'_>,
    metrics: &mut Vec<Metric>,
    errors: &mut Vec<CollectError>,
) {
    for node in nodes {
        match node {
            Node::Namespace { name, children } => {
                path.push(name.clone());
                collect(children, path, pass, metrics, errors);
                path.pop();
            }
            Node::Metric { name, body } => {
                let namespace = namespace_for(path, pass.prefix);
                let mut builder = MetricBuilder::new();
                let result = body(&mut builder)
                    .map_err(|source| CollectError::Definition {
                        metric: name.clone(),
                        source,
                    })
                    .and_then(|()| builder.finish(&defaults(pass, name, &namespace)));
                match result {
                    Ok(metric) => metrics.push(metric),
                    Err(e) => errors.push(e),
                }
            }
            Node::Group { name, roles, body } => {
                if !pass.matches_roles(roles) {
                    continue;
                }
                let namespace = namespace_for(path, pass.prefix);
                let mut group = GroupBuilder::default();
                if let Err(source) = body(&mut group) {
                    errors.push(CollectError::Definition {
                        metric: name.clone(),
                        source,
                    });
                    continue;
                }
                let ctx = defaults(pass, name, &namespace);
                for builder in group.metrics {
                    match builder.finish(&ctx) {
                        Ok(metric) => metrics.push(metric),
                        Err(e) => errors.push(e),
                    }
                }
            }
        }
    }
}

fn namespace_for(path: &[String], prefix: Option<&str>) -> String {
    let joined = join_namespace(path.iter().map(String::as_str));
    apply_prefix(&joined, prefix)
}

fn defaults<'a>(pass: &Pass<'a>, name: &'a str, namespace: &'a str) -> Defaults<'a> {
    Defaults {
        name: Some(name),
        namespace,
        prefix: pass.prefix,
        timestamp: pass.timestamp,
        templates: pass.templates,
    }
}
