//! AppVersion Custom Resource Definition
//!
//! An AppVersion tracks the version a single workload declares. There is at
//! most one per workload `(name, namespace)`; it is owned by the workload and
//! garbage-collected with it.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::WorkloadDescriptor;

/// Specification for an AppVersion
///
/// The primary descriptor is flattened so the spec reads
/// `{name, type, source, version}`. Workloads with several containers carry
/// the remaining descriptors in `additionalSources`.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "ops.getais.cloud",
    version = "v1alpha1",
    kind = "AppVersion",
    plural = "appversions",
    shortname = "av",
    namespaced,
    status = "AppVersionStatus",
    printcolumn = r#"{"name":"Type","type":"string","jsonPath":".spec.type"}"#,
    printcolumn = r#"{"name":"Version","type":"string","jsonPath":".spec.version"}"#,
    printcolumn = r#"{"name":"Source","type":"string","jsonPath":".spec.source"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AppVersionSpec {
    /// First descriptor derived from the workload
    #[serde(flatten)]
    pub primary: WorkloadDescriptor,

    /// Descriptors for further containers of the same workload
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_sources: Vec<WorkloadDescriptor>,
}

impl AppVersionSpec {
    /// Build a spec from derived descriptors, in order.
    ///
    /// Returns `None` when nothing was derived.
    pub fn from_descriptors(descriptors: Vec<WorkloadDescriptor>) -> Option<Self> {
        let mut iter = descriptors.into_iter();
        let primary = iter.next()?;
        Some(Self {
            primary,
            additional_sources: iter.collect(),
        })
    }

    /// All descriptors, primary first
    pub fn descriptors(&self) -> Vec<WorkloadDescriptor> {
        std::iter::once(self.primary.clone())
            .chain(self.additional_sources.iter().cloned())
            .collect()
    }
}

/// Status for an AppVersion (intentionally empty; drift is reported on Update)
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct AppVersionStatus {}
