//! Minimal mirror of the Argo CD `Application` resource
//!
//! Only the fields needed to discover Helm-sourced applications are modelled;
//! everything else in the object is ignored on deserialization. The CRD itself
//! is owned by Argo CD and never installed by this controller.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Subset of an Argo CD Application spec
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "argoproj.io",
    version = "v1alpha1",
    kind = "Application",
    plural = "applications",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSpec {
    /// Where the application manifests come from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ApplicationSource>,

    /// Where the application is deployed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<ApplicationDestination>,
}

/// Application source
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSource {
    /// Git or Helm repository URL
    #[serde(rename = "repoURL", default)]
    pub repo_url: String,

    /// Git revision or Helm chart version
    #[serde(default)]
    pub target_revision: String,

    /// Helm chart name, set when the repository is a chart repository
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<String>,

    /// Helm rendering options (parameters, values); presence marks a Helm source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helm: Option<serde_json::Value>,
}

impl ApplicationSource {
    /// True when the source is a Helm chart repository
    pub fn is_helm(&self) -> bool {
        self.helm.is_some() || self.chart.as_deref().is_some_and(|c| !c.is_empty())
    }
}

/// Application destination
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDestination {
    /// Target namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}
