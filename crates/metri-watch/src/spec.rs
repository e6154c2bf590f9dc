use crate::comparator::Comparator;
use crate::error::{Result, WatchError};
use crate::statistic::{Condition, Statistic};
use serde::{Deserialize, Serialize};

/// Identity of a watch in the history store and the status registry.
///
/// Watches are keyed by name alone by default, so two watches declaring the
/// same name on different metrics share one history and one status. Callers
/// that want `(namespace, name)` identity can build keys with
/// [`WatchKey::qualified`] and evaluate through
/// [`WatchEvaluator::evaluate_keyed`](crate::evaluator::WatchEvaluator::evaluate_keyed).
///
/// # Examples
///
/// ```
/// use metri_watch::spec::WatchKey;
///
/// let plain = WatchKey::named("Error Rate Too High");
/// let scoped = WatchKey::qualified("CareerArc", "Error Rate Too High");
/// assert_ne!(plain, scoped);
/// assert_eq!(plain, WatchKey::from("Error Rate Too High"));
/// assert_eq!(scoped.to_string(), "CareerArc::Error Rate Too High");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WatchKey {
    namespace: Option<String>,
    name: String,
}

impl WatchKey {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    pub fn qualified(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}

impl From<&str> for WatchKey {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<String> for WatchKey {
    fn from(name: String) -> Self {
        Self::named(name)
    }
}

impl std::fmt::Display for WatchKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{ns}::{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// An immutable, validated watch declaration bound to one metric.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchSpec {
    name: String,
    description: String,
    condition: Condition,
    evaluations: u32,
}

impl WatchSpec {
    /// Builds a spec from a condition, validating it.
    ///
    /// # Errors
    ///
    /// Returns a [`WatchError`] for an empty name, a zero period, zero
    /// evaluations or a non-finite threshold.
    pub fn new(name: impl Into<String>, condition: Condition, evaluations: u32) -> Result<Self> {
        let name = name.into();
        validate(&name, &condition, i64::from(evaluations))?;
        Ok(Self {
            name,
            description: String::new(),
            condition,
            evaluations,
        })
    }

    pub fn builder(name: impl Into<String>) -> WatchBuilder {
        WatchBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// The default registry key: the watch name alone.
    pub fn key(&self) -> WatchKey {
        WatchKey::named(&self.name)
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn statistic(&self) -> Statistic {
        self.condition.statistic
    }

    pub fn period_secs(&self) -> u64 {
        self.condition.period_secs
    }

    pub fn comparator(&self) -> Comparator {
        self.condition.comparator
    }

    pub fn threshold(&self) -> f64 {
        self.condition.threshold
    }

    pub fn evaluations(&self) -> u32 {
        self.evaluations
    }
}

fn validate(name: &str, condition: &Condition, evaluations: i64) -> Result<()> {
    if name.trim().is_empty() {
        return Err(WatchError::EmptyName);
    }
    if condition.period_secs == 0 {
        return Err(WatchError::InvalidPeriod {
            name: name.to_string(),
            period: 0,
        });
    }
    if evaluations < 1 {
        return Err(WatchError::InvalidEvaluations {
            name: name.to_string(),
            evaluations,
        });
    }
    if !condition.threshold.is_finite() {
        return Err(WatchError::NonFiniteThreshold {
            name: name.to_string(),
            threshold: condition.threshold,
        });
    }
    Ok(())
}

/// Step-by-step construction of a [`WatchSpec`].
///
/// # Examples
///
/// ```
/// use metri_watch::spec::WatchSpec;
/// use metri_watch::statistic::Statistic;
///
/// let watch = WatchSpec::builder("Error Rate Too High")
///     .description("Triggered when the Application error rate is too high")
///     .condition(Statistic::Sum.over_period(3600).gt(10.0))
///     .build()
///     .unwrap();
/// assert_eq!(watch.evaluations(), 1);
/// assert_eq!(watch.period_secs(), 3600);
/// ```
#[derive(Debug, Clone)]
pub struct WatchBuilder {
    name: String,
    description: String,
    condition: Option<Condition>,
    evaluations: u32,
}

impl WatchBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            condition: None,
            evaluations: 1,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn evaluations(mut self, evaluations: u32) -> Self {
        self.evaluations = evaluations;
        self
    }

    /// # Errors
    ///
    /// Returns [`WatchError::MissingCondition`] when no condition was set, or
    /// any validation error from [`WatchSpec::new`].
    pub fn build(self) -> Result<WatchSpec> {
        let condition = self
            .condition
            .ok_or_else(|| WatchError::MissingCondition(self.name.clone()))?;
        let mut spec = WatchSpec::new(self.name, condition, self.evaluations)?;
        spec.description = self.description;
        Ok(spec)
    }
}

/// Loosely-typed watch options, as found in TOML config files and in
/// direct-publish options.
///
/// Signed integers are accepted on purpose so that negative values surface
/// as validation errors instead of deserialization failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub statistic: String,
    #[serde(alias = "period_secs")]
    pub period: i64,
    #[serde(default = "default_evaluations")]
    pub evaluations: i64,
    #[serde(alias = "comparator")]
    pub comparison: String,
    pub threshold: f64,
}

fn default_evaluations() -> i64 {
    1
}

impl TryFrom<WatchConfig> for WatchSpec {
    type Error = WatchError;

    fn try_from(cfg: WatchConfig) -> Result<Self> {
        let statistic: Statistic = cfg.statistic.parse()?;
        let comparator: Comparator = cfg.comparison.parse()?;
        if cfg.period <= 0 {
            return Err(WatchError::InvalidPeriod {
                name: cfg.name,
                period: cfg.period,
            });
        }
        let evaluations = u32::try_from(cfg.evaluations).map_err(|_| {
            WatchError::InvalidEvaluations {
                name: cfg.name.clone(),
                evaluations: cfg.evaluations,
            }
        })?;
        let condition = statistic
            .over_period(cfg.period as u64)
            .compare(comparator, cfg.threshold);
        let mut spec = WatchSpec::new(cfg.name, condition, evaluations)?;
        spec.description = cfg.description;
        Ok(spec)
    }
}
