//! Controllers for version tracking
//!
//! Four reconcilers form a pipeline:
//! - [`reconcile_application`] and [`reconcile_deployment`] keep one AppVersion
//!   per discovered workload
//! - [`sync_update`] mirrors each AppVersion into an Update
//! - [`reconcile_drift`] resolves upstream versions and reports drift on the
//!   Update's status
//!
//! All of them share one [`Context`] and the same [`error_policy`].

mod context;
mod drift;
mod tracker;
mod update;

use std::sync::Arc;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::runtime::controller::Action;
use kube::{Resource, ResourceExt};
use tracing::{debug, error, warn};

use crate::Error;

pub use context::{Context, ContextBuilder, KubeClient, KubeClientImpl, FIELD_MANAGER};
pub use drift::reconcile_drift;
pub use tracker::{reconcile_application, reconcile_deployment};
pub use update::sync_update;

#[cfg(test)]
pub use context::MockKubeClient;

/// Requeue a failed reconcile after the configured fixed backoff.
///
/// Malformed workload declarations are logged as warnings since they only
/// clear once the workload is edited. Write conflicts are expected under
/// concurrent changes and rerun the whole pass.
pub fn error_policy<K>(obj: Arc<K>, error: &Error, ctx: Arc<Context>) -> Action
where
    K: Resource<DynamicType = ()>,
{
    if error.is_conflict() {
        debug!(
            kind = %K::kind(&()),
            name = %obj.name_any(),
            namespace = ?obj.namespace(),
            "write rejected against a stale resourceVersion"
        );
    } else if error.is_malformed_input() {
        warn!(
            error = %error,
            kind = %K::kind(&()),
            name = %obj.name_any(),
            namespace = ?obj.namespace(),
            "cannot derive version descriptors"
        );
    } else {
        error!(
            ?error,
            kind = %K::kind(&()),
            name = %obj.name_any(),
            namespace = ?obj.namespace(),
            "reconciliation failed"
        );
    }
    Action::requeue(ctx.config.error_backoff())
}

/// Controller owner reference pointing at `owner`
///
/// Children carrying it are garbage-collected with the owner.
fn owner_reference<K>(owner: &K) -> Result<OwnerReference, Error>
where
    K: Resource<DynamicType = ()>,
{
    let uid = owner.uid().ok_or_else(|| {
        Error::validation(format!("{} {} has no uid", K::kind(&()), owner.name_any()))
    })?;

    Ok(OwnerReference {
        api_version: K::api_version(&()).to_string(),
        kind: K::kind(&()).to_string(),
        name: owner.name_any(),
        uid,
        controller: Some(true),
        block_owner_deletion: Some(true),
    })
}

fn namespace_of<K>(obj: &K) -> Result<String, Error>
where
    K: Resource<DynamicType = ()>,
{
    obj.namespace().ok_or_else(|| {
        Error::validation(format!("{} {} must be namespaced", K::kind(&()), obj.name_any()))
    })
}
