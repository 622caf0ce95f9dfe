//! Workload descriptor derivation
//!
//! Turns a discovered workload into the ordered list of [`WorkloadDescriptor`]s
//! that its tracker should carry. Two inputs are supported:
//!
//! - Argo CD Applications with a Helm source: one descriptor, or nothing when
//!   the application is not applicable
//! - Deployments opted in via annotations: one descriptor per container
//!
//! Derivation is pure; all I/O happens in the controllers.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Container;
use kube::ResourceExt;
use url::Url;

use crate::crd::{Application, SourceKind, WorkloadDescriptor};
use crate::Error;

/// Prefix shared by all kupdater annotations
pub const ANNOTATION_PREFIX: &str = "kupdater.ops.getais.cloud/";

/// Upstream repository locator (required)
pub const SOURCE_ANNOTATION: &str = "kupdater.ops.getais.cloud/source";

/// Source type, e.g. `helm` or `github` (required)
pub const TYPE_ANNOTATION: &str = "kupdater.ops.getais.cloud/type";

/// Declared version for non-image sources (optional)
pub const VERSION_ANNOTATION: &str = "kupdater.ops.getais.cloud/version";

/// Opt-in marker; value is ignored
pub const ENABLED_ANNOTATION: &str = "kupdater.ops.getais.cloud/enabled";

/// Derive the descriptor of an Argo CD Application.
///
/// Returns `None` when the application has no Helm source or its repository
/// URL is not an absolute URI. Those applications are simply not tracked.
pub fn from_application(app: &Application) -> Option<WorkloadDescriptor> {
    let source = app.spec.source.as_ref()?;
    if !source.is_helm() {
        return None;
    }
    if !is_absolute_uri(&source.repo_url) {
        return None;
    }

    Some(WorkloadDescriptor::new(
        app.name_any(),
        SourceKind::Helm,
        source.repo_url.clone(),
        source.target_revision.clone(),
    ))
}

/// True when the deployment carries the opt-in annotation
pub fn is_enabled(deployment: &Deployment) -> bool {
    deployment.annotations().contains_key(ENABLED_ANNOTATION)
}

/// Derive descriptors for an annotated Deployment, one per container.
///
/// Callers check [`is_enabled`] first. For `github` sources the declared
/// version comes from each container's image tag, which takes precedence over
/// the version annotation.
pub fn from_deployment(deployment: &Deployment) -> Result<Vec<WorkloadDescriptor>, Error> {
    let annotations = deployment.annotations();
    let (source, kind, version) = read_annotations(annotations)?;
    let name = deployment.name_any();

    let containers: &[Container] = deployment
        .spec
        .as_ref()
        .and_then(|s| s.template.spec.as_ref())
        .map(|p| p.containers.as_slice())
        .unwrap_or_default();

    containers
        .iter()
        .map(|container| {
            let declared_version = match kind {
                SourceKind::GitHub => image_tag(container)?.to_string(),
                _ => version.clone(),
            };
            Ok(WorkloadDescriptor::new(
                name.clone(),
                kind.clone(),
                source.clone(),
                declared_version,
            ))
        })
        .collect()
}

fn read_annotations(
    annotations: &BTreeMap<String, String>,
) -> Result<(String, SourceKind, String), Error> {
    let source = annotations
        .get(SOURCE_ANNOTATION)
        .ok_or_else(|| Error::MissingSourceAnnotation(SOURCE_ANNOTATION.to_string()))?;
    let kind = annotations
        .get(TYPE_ANNOTATION)
        .map(|t| SourceKind::from_declared(t))
        .ok_or_else(|| Error::MissingTypeAnnotation(TYPE_ANNOTATION.to_string()))?;
    let version = annotations
        .get(VERSION_ANNOTATION)
        .cloned()
        .unwrap_or_default();

    Ok((source.clone(), kind, version))
}

/// Extract the tag from a container's image reference.
///
/// The tag is whatever follows the last `:` of the name part (before any
/// `@digest`). A `:` that belongs to a registry port does not count.
fn image_tag(container: &Container) -> Result<&str, Error> {
    let image = container.image.as_deref().unwrap_or_default();
    let malformed = || Error::MalformedImageReference {
        container: container.name.clone(),
        image: image.to_string(),
    };

    let name_part = image.split('@').next().unwrap_or_default();
    let (_, tag) = name_part.rsplit_once(':').ok_or_else(malformed)?;
    if tag.is_empty() || tag.contains('/') {
        return Err(malformed());
    }
    Ok(tag)
}

fn is_absolute_uri(s: &str) -> bool {
    Url::parse(s).is_ok_and(|u| u.has_host())
}
