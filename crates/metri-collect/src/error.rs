use metri_watch::error::WatchError;

/// Errors raised while assembling applications, evaluating metric
/// definitions or publishing.
///
/// # Examples
///
/// ```rust
/// use metri_collect::error::CollectError;
///
/// let err = CollectError::UnknownTemplate("instance".to_string());
/// assert!(err.to_string().contains("instance"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// A metric referenced a template that was never registered.
    #[error("Collect: unknown template '{0}'")]
    UnknownTemplate(String),

    /// An application referenced a publisher that was never registered.
    #[error("Collect: unknown publisher '{0}'")]
    UnknownPublisher(String),

    /// An application referenced a watcher that was never registered.
    #[error("Collect: unknown watcher '{0}'")]
    UnknownWatcher(String),

    #[error("Collect: unknown application '{0}'")]
    UnknownApplication(String),

    #[error("Collect: application '{0}' is defined twice")]
    DuplicateApplication(String),

    /// A metric body finished without naming the metric.
    #[error("Collect: metric in namespace '{namespace}' has no name")]
    MissingName { namespace: String },

    /// A metric body finished without setting a value.
    #[error("Collect: metric '{metric}' has no value")]
    MissingValue { metric: String },

    /// A user-supplied metric or group body returned an error.
    #[error("Collect: definition of '{metric}' failed: {source}")]
    Definition {
        metric: String,
        #[source]
        source: anyhow::Error,
    },

    /// A watch attached to a metric is invalid.
    #[error("Collect: {0}")]
    Watch(#[from] WatchError),

    #[error("Collect: {0}")]
    Publish(#[from] PublishError),
}

/// Errors returned by [`Publisher`](crate::publisher::Publisher)
/// implementations. Nothing here is retried.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// HTTP transport failure from `reqwest`.
    #[error("Publish: HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The sink answered with a non-success status.
    #[error("Publish: {publisher} rejected batch: status={status}, body={body}")]
    Rejected {
        publisher: String,
        status: u16,
        body: String,
    },
}

/// Convenience `Result` alias for collection operations.
pub type Result<T> = std::result::Result<T, CollectError>;
