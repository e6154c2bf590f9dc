/// Configuration errors raised while building a watch specification.
///
/// Evaluation itself never fails: every variant here is caught when the
/// [`WatchSpec`](crate::spec::WatchSpec) is constructed.
///
/// # Examples
///
/// ```rust
/// use metri_watch::error::WatchError;
///
/// let err = WatchError::UnknownStatistic("median".to_string());
/// assert!(err.to_string().contains("median"));
/// ```
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WatchError {
    /// The watch name is empty; names key the status registry.
    #[error("Watch: name must not be empty")]
    EmptyName,

    /// `period_secs` must be strictly positive.
    #[error("Watch '{name}': period must be positive, got {period}")]
    InvalidPeriod { name: String, period: i64 },

    /// `evaluations` must be at least one.
    #[error("Watch '{name}': evaluations must be at least 1, got {evaluations}")]
    InvalidEvaluations { name: String, evaluations: i64 },

    /// The threshold is NaN or infinite.
    #[error("Watch '{name}': threshold must be finite, got {threshold}")]
    NonFiniteThreshold { name: String, threshold: f64 },

    /// No condition (statistic, period, comparator, threshold) was supplied.
    #[error("Watch '{0}': missing condition")]
    MissingCondition(String),

    #[error("Watch: unknown statistic '{0}'")]
    UnknownStatistic(String),

    #[error("Watch: unknown comparator '{0}'")]
    UnknownComparator(String),
}

/// Convenience `Result` alias for watch configuration.
pub type Result<T> = std::result::Result<T, WatchError>;
