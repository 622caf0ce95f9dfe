//! Update Custom Resource Definition
//!
//! An Update lists the version sources of one tracked workload and carries the
//! drift report for them in its status. Each Update is owned by the AppVersion
//! of the same name.

use chrono::{DateTime, SecondsFormat, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{find_condition, upsert_condition, Condition, WorkloadDescriptor};

/// Phase reported when every resolved source matches its declared version
pub const PHASE_UP_TO_DATE: &str = "UpToDate";

/// Condition type set when a declared version matches the latest release
pub const CONDITION_UP_TO_DATE: &str = "UpToDate";

/// Condition type set when a newer release exists
pub const CONDITION_OUTDATED: &str = "Outdated";

/// Condition type set when a chart repository could not be resolved
pub const CONDITION_SOURCE_UNAVAILABLE: &str = "SourceUnavailable";

/// Phase text for an outdated source
pub fn outdated_phase(resolved: &str) -> String {
    format!("Outdated ({} available)", resolved)
}

/// Specification for an Update
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "ops.getais.cloud",
    version = "v1alpha1",
    kind = "Update",
    plural = "updates",
    namespaced,
    status = "UpdateStatus",
    printcolumn = r#"{"name":"Type","type":"string","jsonPath":".spec.versioning.sources[0].type"}"#,
    printcolumn = r#"{"name":"Version","type":"string","jsonPath":".spec.versioning.sources[0].version"}"#,
    printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Synced","type":"date","jsonPath":".status.syncTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSpec {
    /// Version sources to check
    pub versioning: UpdateVersioning,
}

impl UpdateSpec {
    /// Build a spec listing the given sources in order
    pub fn from_sources(sources: Vec<WorkloadDescriptor>) -> Self {
        Self {
            versioning: UpdateVersioning { sources },
        }
    }
}

/// Ordered list of version sources
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct UpdateVersioning {
    /// Sources in resolution order
    #[serde(default)]
    pub sources: Vec<WorkloadDescriptor>,
}

/// Drift report for an Update
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatus {
    /// `UpToDate`, `Outdated (<version> available)`, or an error description
    #[serde(default)]
    pub phase: String,

    /// RFC3339 time of the last completed drift pass
    #[serde(default)]
    pub sync_timestamp: String,

    /// Conditions, at most one per type
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Spec generation the report was computed for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl UpdateStatus {
    /// Start a fresh pass: phase `UpToDate`, no conditions, stamped at `now`
    pub fn begin_pass(now: DateTime<Utc>) -> Self {
        Self {
            phase: PHASE_UP_TO_DATE.to_string(),
            sync_timestamp: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            conditions: Vec::new(),
            observed_generation: None,
        }
    }

    /// Parsed `syncTimestamp`, if it holds a valid RFC3339 time
    pub fn synced_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.sync_timestamp)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Set a condition, replacing any existing one of the same type.
    ///
    /// Transition times are inherited from `previous` when the status is
    /// unchanged across passes.
    pub fn set_condition(&mut self, condition: Condition, previous: Option<&UpdateStatus>) {
        let mut condition = condition;
        if let Some(prev) = previous.and_then(|p| find_condition(&p.conditions, &condition.type_))
        {
            if prev.status == condition.status {
                condition.last_transition_time = prev.last_transition_time;
            }
        }
        upsert_condition(&mut self.conditions, condition);
    }

    /// Look up a condition by type
    pub fn condition(&self, type_: &str) -> Option<&Condition> {
        find_condition(&self.conditions, type_)
    }

    /// True if an `Outdated` condition is currently true
    pub fn is_outdated(&self) -> bool {
        self.condition(CONDITION_OUTDATED)
            .is_some_and(Condition::is_true)
    }
}
