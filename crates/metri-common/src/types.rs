use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unit attached to a metric value.
///
/// # Examples
///
/// ```
/// use metri_common::types::Unit;
///
/// let unit: Unit = "megabytes".parse().unwrap();
/// assert_eq!(unit, Unit::Megabytes);
/// assert_eq!(unit.to_string(), "megabytes");
/// assert_eq!(Unit::default(), Unit::Count);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Count,
    Bytes,
    Kilobytes,
    Megabytes,
    Gigabytes,
    Seconds,
    Milliseconds,
    Microseconds,
    Percent,
    None,
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Unit::Count => "count",
            Unit::Bytes => "bytes",
            Unit::Kilobytes => "kilobytes",
            Unit::Megabytes => "megabytes",
            Unit::Gigabytes => "gigabytes",
            Unit::Seconds => "seconds",
            Unit::Milliseconds => "milliseconds",
            Unit::Microseconds => "microseconds",
            Unit::Percent => "percent",
            Unit::None => "none",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "count" => Ok(Unit::Count),
            "bytes" => Ok(Unit::Bytes),
            "kilobytes" => Ok(Unit::Kilobytes),
            "megabytes" => Ok(Unit::Megabytes),
            "gigabytes" => Ok(Unit::Gigabytes),
            "seconds" => Ok(Unit::Seconds),
            "milliseconds" => Ok(Unit::Milliseconds),
            "microseconds" => Ok(Unit::Microseconds),
            "percent" => Ok(Unit::Percent),
            "none" => Ok(Unit::None),
            _ => Err(format!("unknown unit: {s}")),
        }
    }
}

/// A single `name=value` dimension on a metric. Order of declaration is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An immutable metric observation produced by a collection pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    namespace: String,
    name: String,
    value: f64,
    unit: Unit,
    timestamp: DateTime<Utc>,
    dimensions: Vec<Dimension>,
}

impl MetricSample {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        value: f64,
        unit: Unit,
        timestamp: DateTime<Utc>,
        dimensions: Vec<Dimension>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            value,
            unit,
            timestamp,
            dimensions,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Looks up the first dimension with the given name.
    pub fn dimension(&self, name: &str) -> Option<&str> {
        self.dimensions
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.value.as_str())
    }
}

impl std::fmt::Display for MetricSample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}={} {}", self.namespace, self.name, self.value, self.unit)?;
        let dims = format_dimensions(&self.dimensions);
        if !dims.is_empty() {
            write!(f, " [{dims}]")?;
        }
        Ok(())
    }
}

/// Format dimensions into a human-readable string, keeping declaration order.
///
/// # Examples
///
/// ```
/// use metri_common::types::{format_dimensions, Dimension};
///
/// let dims = vec![Dimension::new("Type", "Free"), Dimension::new("SystemId", "Workstation-1")];
/// assert_eq!(format_dimensions(&dims), "Type=Free, SystemId=Workstation-1");
/// assert_eq!(format_dimensions(&[]), "");
/// ```
pub fn format_dimensions(dimensions: &[Dimension]) -> String {
    dimensions
        .iter()
        .map(|d| format!("{}={}", d.name, d.value))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Join namespace segments with `/`, skipping empty ones.
///
/// # Examples
///
/// ```
/// use metri_common::types::join_namespace;
///
/// assert_eq!(join_namespace(["CareerArc", "Application", "Users"]), "CareerArc/Application/Users");
/// assert_eq!(join_namespace(["Template", ""]), "Template");
/// ```
pub fn join_namespace<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    segments
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
