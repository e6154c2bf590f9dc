use crate::error::WatchError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    GreaterThan,
    GreaterEqual,
    LessThan,
    LessEqual,
    Equal,
}

impl FromStr for Comparator {
    type Err = WatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            ">" | "gt" | "greater_than" => Ok(Self::GreaterThan),
            ">=" | "gte" | "greater_equal" => Ok(Self::GreaterEqual),
            "<" | "lt" | "less_than" => Ok(Self::LessThan),
            "<=" | "lte" | "less_equal" => Ok(Self::LessEqual),
            "==" | "eq" | "equal" => Ok(Self::Equal),
            _ => Err(WatchError::UnknownComparator(s.to_string())),
        }
    }
}

impl std::fmt::Display for Comparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GreaterThan => write!(f, "greater_than"),
            Self::GreaterEqual => write!(f, "greater_equal"),
            Self::LessThan => write!(f, "less_than"),
            Self::LessEqual => write!(f, "less_equal"),
            Self::Equal => write!(f, "equal"),
        }
    }
}

impl Comparator {
    /// Applies the comparison. No epsilon: `Equal` is exact float equality.
    pub fn check(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::GreaterThan => value > threshold,
            Self::GreaterEqual => value >= threshold,
            Self::LessThan => value < threshold,
            Self::LessEqual => value <= threshold,
            Self::Equal => value == threshold,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::GreaterThan => ">",
            Self::GreaterEqual => ">=",
            Self::LessThan => "<",
            Self::LessEqual => "<=",
            Self::Equal => "==",
        }
    }
}
