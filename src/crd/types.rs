//! Shared types used by the kupdater CRDs

use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Kind of upstream source a workload's version is published at
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Helm chart repository serving an `index.yaml`
    Helm,
    /// GitHub repository publishing tagged releases
    GitHub,
    /// Any type not understood by the resolvers, kept as declared
    Unknown(String),
}

impl Default for SourceKind {
    fn default() -> Self {
        Self::Unknown(String::new())
    }
}

impl SourceKind {
    /// Wire name of the kind
    pub fn as_str(&self) -> &str {
        match self {
            Self::Helm => "helm",
            Self::GitHub => "github",
            Self::Unknown(declared) => declared,
        }
    }

    /// Parse a declared type, keeping anything unrecognized verbatim
    pub fn from_declared(s: &str) -> Self {
        s.parse()
            .unwrap_or_else(|_| Self::Unknown(s.trim().to_string()))
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "helm" => Ok(Self::Helm),
            "github" => Ok(Self::GitHub),
            other => Err(format!("invalid source type: {}", other)),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SourceKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SourceKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_declared(&raw))
    }
}

/// Canonical version descriptor of one tracked workload source
///
/// Serialized as `{name, type, source, version}`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct WorkloadDescriptor {
    /// Release name, used as the chart key in a Helm index
    pub name: String,

    /// Source kind
    #[serde(rename = "type")]
    #[schemars(with = "String")]
    pub kind: SourceKind,

    /// Repository URL the version is published at
    #[serde(rename = "source")]
    pub source_locator: String,

    /// Version currently declared by the workload
    #[serde(rename = "version", default)]
    pub declared_version: String,
}

impl WorkloadDescriptor {
    /// Create a new descriptor
    pub fn new(
        name: impl Into<String>,
        kind: SourceKind,
        source_locator: impl Into<String>,
        declared_version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            source_locator: source_locator.into(),
            declared_version: declared_version.into(),
        }
    }
}

/// Condition status following Kubernetes conventions
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    /// Condition is true
    True,
    /// Condition is false
    False,
    /// Condition status is unknown
    #[default]
    Unknown,
}

impl From<bool> for ConditionStatus {
    fn from(value: bool) -> Self {
        if value {
            Self::True
        } else {
            Self::False
        }
    }
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Kubernetes-style condition for status reporting
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct Condition {
    /// Type of condition (e.g., UpToDate, Outdated)
    #[serde(rename = "type")]
    pub type_: String,

    /// Status of the condition (True, False, Unknown)
    pub status: ConditionStatus,

    /// Machine-readable reason for the condition
    pub reason: String,

    /// Human-readable message
    pub message: String,

    /// Last time the condition transitioned
    #[serde(rename = "lastTransitionTime")]
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    /// Create a new condition with the current timestamp
    pub fn new(
        type_: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_: type_.into(),
            status,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: Utc::now(),
        }
    }

    /// True if the condition status is `True`
    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }
}

/// Insert or replace a condition by type, preserving insertion order.
///
/// When a condition of the same type already exists with the same status its
/// `lastTransitionTime` is kept.
pub fn upsert_condition(conditions: &mut Vec<Condition>, mut condition: Condition) {
    match conditions.iter_mut().find(|c| c.type_ == condition.type_) {
        Some(existing) => {
            if existing.status == condition.status {
                condition.last_transition_time = existing.last_transition_time;
            }
            *existing = condition;
        }
        None => conditions.push(condition),
    }
}

/// Find a condition by type
pub fn find_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}
