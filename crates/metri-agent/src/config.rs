use metri_collect::publisher::http::HttpPublisher;
use metri_collect::publisher::log::LogPublisher;
use metri_collect::publisher::Publisher;
use metri_watch::spec::WatchConfig;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_application")]
    pub application: String,
    #[serde(default = "default_frequency")]
    pub frequency_secs: u64,
    /// Number of passes before exiting; runs until ctrl-c when absent.
    pub iterations: Option<u64>,
    /// Inserted after the application name in every namespace.
    pub prefix: Option<String>,
    #[serde(default)]
    pub publisher: PublisherConfig,
    #[serde(default)]
    pub watches: Vec<WatchOptions>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PublisherConfig {
    #[serde(default)]
    pub kind: PublisherKind,
    pub endpoint: Option<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublisherKind {
    #[default]
    Log,
    Http,
}

/// A watch attached to one of the host metrics by name.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchOptions {
    pub metric: String,
    #[serde(flatten)]
    pub watch: WatchConfig,
}

fn default_application() -> String {
    "Host".to_string()
}

fn default_frequency() -> u64 {
    60
}

impl AgentConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        if config.frequency_secs == 0 {
            anyhow::bail!("frequency_secs must be at least 1");
        }
        if config.publisher.kind == PublisherKind::Http && config.publisher.endpoint.is_none() {
            anyhow::bail!("publisher.endpoint is required for the http publisher");
        }
        Ok(config)
    }
}

impl PublisherConfig {
    pub fn build(&self) -> anyhow::Result<Arc<dyn Publisher>> {
        match self.kind {
            PublisherKind::Log => Ok(Arc::new(LogPublisher)),
            PublisherKind::Http => {
                let endpoint = self
                    .endpoint
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("publisher.endpoint is required"))?;
                Ok(Arc::new(HttpPublisher::new(endpoint)?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn load(content: &str) -> anyhow::Result<AgentConfig> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        AgentConfig::load(file.path().to_str().unwrap())
    }

    #[test]
    fn defaults_apply_to_empty_file() {
        let config = load("").unwrap();
        assert_eq!(config.application, "Host");
        assert_eq!(config.frequency_secs, 60);
        assert_eq!(config.iterations, None);
        assert_eq!(config.publisher.kind, PublisherKind::Log);
        assert!(config.watches.is_empty());
        assert_eq!(config.publisher.build().unwrap().publisher_name(), "log");
    }

    #[test]
    fn watches_are_flattened() {
        let config = load(
            r#"
application = "Web"
frequency_secs = 5
iterations = 3
prefix = "development"

[[watches]]
metric = "LoadAverage"
name = "Load Too High"
statistic = "average"
period = 300
evaluations = 3
comparison = ">"
threshold = 4.0
"#,
        )
        .unwrap();
        assert_eq!(config.application, "Web");
        assert_eq!(config.iterations, Some(3));
        assert_eq!(config.prefix.as_deref(), Some("development"));

        let watch = &config.watches[0];
        assert_eq!(watch.metric, "LoadAverage");
        assert_eq!(watch.watch.name, "Load Too High");
        assert_eq!(watch.watch.period, 300);
        assert_eq!(watch.watch.comparison, ">");
        assert_eq!(watch.watch.threshold, 4.0);
    }

    #[test]
    fn http_publisher_needs_endpoint() {
        let err = load("[publisher]\nkind = \"http\"\n").unwrap_err();
        assert!(err.to_string().contains("endpoint"));

        let config = load("[publisher]\nkind = \"http\"\nendpoint = \"http://127.0.0.1:9/metrics\"\n").unwrap();
        assert_eq!(config.publisher.build().unwrap().publisher_name(), "http");
    }

    #[test]
    fn rejects_zero_frequency() {
        assert!(load("frequency_secs = 0").is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(AgentConfig::load("/nonexistent/agent.toml").is_err());
    }
}
