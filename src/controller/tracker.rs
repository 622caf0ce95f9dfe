//! Tracker reconciliation
//!
//! Keeps exactly one AppVersion per discovered workload, named after the
//! workload and owned by it. Two discovery origins feed the same logic:
//! Argo CD Applications with a Helm source and Deployments carrying the
//! `enabled` annotation.

use std::sync::Arc;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::runtime::controller::Action;
use kube::ResourceExt;
use tracing::{debug, info, instrument};

use super::{namespace_of, owner_reference, Context};
use crate::crd::{AppVersion, AppVersionSpec, Application};
use crate::descriptor;
use crate::Error;

/// Reconcile an Argo CD Application into its AppVersion.
///
/// Applications without a Helm source or with a repository URL that is not
/// an absolute URI are skipped.
#[instrument(skip(app, ctx), fields(application = %app.name_any(), namespace = ?app.namespace()))]
pub async fn reconcile_application(
    app: Arc<Application>,
    ctx: Arc<Context>,
) -> Result<Action, Error> {
    let Some(primary) = descriptor::from_application(&app) else {
        debug!("no trackable Helm source, skipping");
        return Ok(Action::await_change());
    };

    let namespace = namespace_of(app.as_ref())?;
    let spec = AppVersionSpec {
        primary,
        additional_sources: Vec::new(),
    };

    ensure_tracker(
        &ctx,
        &app.name_any(),
        &namespace,
        owner_reference(app.as_ref())?,
        spec,
    )
    .await?;
    Ok(Action::requeue(ctx.config.resync_interval()))
}

/// Reconcile an annotated Deployment into its AppVersion.
///
/// Deployments without the `enabled` annotation are skipped. Missing
/// `source`/`type` annotations or untagged images fail the reconcile and no
/// AppVersion is written.
#[instrument(skip(deployment, ctx), fields(deployment = %deployment.name_any(), namespace = ?deployment.namespace()))]
pub async fn reconcile_deployment(
    deployment: Arc<Deployment>,
    ctx: Arc<Context>,
) -> Result<Action, Error> {
    if !descriptor::is_enabled(&deployment) {
        debug!("version tracking not enabled, skipping");
        return Ok(Action::await_change());
    }

    let descriptors = descriptor::from_deployment(&deployment)?;
    let Some(spec) = AppVersionSpec::from_descriptors(descriptors) else {
        debug!("deployment declares no containers, skipping");
        return Ok(Action::await_change());
    };

    let namespace = namespace_of(deployment.as_ref())?;
    ensure_tracker(
        &ctx,
        &deployment.name_any(),
        &namespace,
        owner_reference(deployment.as_ref())?,
        spec,
    )
    .await?;
    Ok(Action::requeue(ctx.config.resync_interval()))
}

/// Create the AppVersion if missing, or overwrite its spec when the derived
/// descriptors changed. An identical AppVersion is left alone.
async fn ensure_tracker(
    ctx: &Context,
    name: &str,
    namespace: &str,
    owner: OwnerReference,
    spec: AppVersionSpec,
) -> Result<(), Error> {
    match ctx.kube.get_app_version(name, namespace).await? {
        None => {
            let mut tracker = AppVersion::new(name, spec);
            tracker.metadata.namespace = Some(namespace.to_string());
            tracker.metadata.owner_references = Some(vec![owner]);
            ctx.kube.create_app_version(&tracker).await?;
            info!(
                source = %tracker.spec.primary.source_locator,
                version = %tracker.spec.primary.declared_version,
                "created AppVersion"
            );
        }
        Some(existing) if existing.spec == spec => {
            debug!("AppVersion already matches workload");
        }
        Some(mut existing) => {
            existing.spec = spec;
            ctx.kube.replace_app_version(&existing).await?;
            info!(
                version = %existing.spec.primary.declared_version,
                "updated AppVersion"
            );
        }
    }
    Ok(())
}
