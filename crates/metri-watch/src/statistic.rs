use crate::comparator::Comparator;
use crate::error::WatchError;
use crate::history::HistoryEntry;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Reduction applied to the entries of a trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    Sum,
    Average,
    Min,
    Max,
    Count,
}

impl FromStr for Statistic {
    type Err = WatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sum" => Ok(Self::Sum),
            "average" | "avg" => Ok(Self::Average),
            "min" | "minimum" => Ok(Self::Min),
            "max" | "maximum" => Ok(Self::Max),
            "count" | "sample_count" => Ok(Self::Count),
            _ => Err(WatchError::UnknownStatistic(s.to_string())),
        }
    }
}

impl std::fmt::Display for Statistic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sum => write!(f, "sum"),
            Self::Average => write!(f, "average"),
            Self::Min => write!(f, "min"),
            Self::Max => write!(f, "max"),
            Self::Count => write!(f, "count"),
        }
    }
}

impl Statistic {
    /// Reduces a window to a single value.
    ///
    /// Returns `None` when the statistic is undefined for the window
    /// (`average`, `min` and `max` over an empty window). `sum` and `count`
    /// are `0.0` for an empty window.
    ///
    /// # Examples
    ///
    /// ```
    /// use metri_watch::statistic::Statistic;
    ///
    /// assert_eq!(Statistic::Sum.compute(&[]), Some(0.0));
    /// assert_eq!(Statistic::Average.compute(&[]), None);
    /// ```
    pub fn compute(&self, window: &[HistoryEntry]) -> Option<f64> {
        let values = window.iter().map(|e| e.value);
        match self {
            Self::Sum => Some(values.sum()),
            Self::Count => Some(window.len() as f64),
            Self::Average => {
                if window.is_empty() {
                    None
                } else {
                    Some(values.sum::<f64>() / window.len() as f64)
                }
            }
            Self::Min => values.reduce(f64::min),
            Self::Max => values.reduce(f64::max),
        }
    }

    /// Starts a condition over a trailing period, e.g.
    /// `Statistic::Sum.over_period(3600).gt(10.0)`.
    pub fn over_period(self, period_secs: u64) -> PeriodStatistic {
        PeriodStatistic {
            statistic: self,
            period_secs,
        }
    }
}

/// A statistic bound to a trailing period, waiting for its comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodStatistic {
    pub statistic: Statistic,
    pub period_secs: u64,
}

impl PeriodStatistic {
    pub fn compare(self, comparator: Comparator, threshold: f64) -> Condition {
        Condition {
            statistic: self.statistic,
            period_secs: self.period_secs,
            comparator,
            threshold,
        }
    }

    pub fn gt(self, threshold: f64) -> Condition {
        self.compare(Comparator::GreaterThan, threshold)
    }

    pub fn ge(self, threshold: f64) -> Condition {
        self.compare(Comparator::GreaterEqual, threshold)
    }

    pub fn lt(self, threshold: f64) -> Condition {
        self.compare(Comparator::LessThan, threshold)
    }

    pub fn le(self, threshold: f64) -> Condition {
        self.compare(Comparator::LessEqual, threshold)
    }

    pub fn eq(self, threshold: f64) -> Condition {
        self.compare(Comparator::Equal, threshold)
    }
}

/// The alerting condition of a watch: `statistic over period <comparator> threshold`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Condition {
    pub statistic: Statistic,
    pub period_secs: u64,
    pub comparator: Comparator,
    pub threshold: f64,
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} over {}s {} {}",
            self.statistic,
            self.period_secs,
            self.comparator.symbol(),
            self.threshold
        )
    }
}
