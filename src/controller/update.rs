//! AppVersion to Update synchronization
//!
//! Every AppVersion gets an Update of the same name listing its descriptors
//! as version sources. The Update is owned by the AppVersion, and its status
//! belongs to the drift reconciler and is never touched here.

use std::sync::Arc;

use kube::runtime::controller::Action;
use kube::ResourceExt;
use tracing::{debug, info, instrument};

use super::{namespace_of, owner_reference, Context};
use crate::crd::{AppVersion, Update, UpdateSpec};
use crate::Error;

/// Create or refresh the Update mirroring an AppVersion
#[instrument(skip(tracker, ctx), fields(app_version = %tracker.name_any(), namespace = ?tracker.namespace()))]
pub async fn sync_update(tracker: Arc<AppVersion>, ctx: Arc<Context>) -> Result<Action, Error> {
    let name = tracker.name_any();
    let namespace = namespace_of(tracker.as_ref())?;
    let spec = UpdateSpec::from_sources(tracker.spec.descriptors());

    match ctx.kube.get_update(&name, &namespace).await? {
        None => {
            let mut update = Update::new(&name, spec);
            update.metadata.namespace = Some(namespace);
            update.metadata.owner_references = Some(vec![owner_reference(tracker.as_ref())?]);
            ctx.kube.create_update(&update).await?;
            info!(
                sources = update.spec.versioning.sources.len(),
                "created Update"
            );
        }
        Some(existing) if existing.spec == spec => {
            debug!("Update already lists current sources");
        }
        Some(mut existing) => {
            existing.spec = spec;
            ctx.kube.replace_update(&existing).await?;
            info!("updated Update sources");
        }
    }

    Ok(Action::requeue(ctx.config.resync_interval()))
}
