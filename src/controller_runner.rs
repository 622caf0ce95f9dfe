//! Controller runner - builds the controller futures of the pipeline
//!
//! [`build_controllers`] returns boxed futures that the binary drives
//! together. Every controller shuts down on SIGTERM/SIGINT.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client};

use crate::controller::{
    error_policy, reconcile_application, reconcile_deployment, reconcile_drift, sync_update,
    Context,
};
use crate::crd::{AppVersion, Application, Update};

/// Watcher timeout (seconds) - must be less than client read_timeout (30s)
/// This forces the API server to close the watch before the client times out,
/// preventing "body read timed out" errors on idle watches.
pub const WATCH_TIMEOUT_SECS: u32 = 25;

/// A controller future ready to be polled
pub type ControllerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

fn watcher_config() -> WatcherConfig {
    WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS)
}

/// Build the four controllers sharing one context:
/// - Application → AppVersion
/// - Deployment → AppVersion
/// - AppVersion → Update
/// - Update drift
pub fn build_controllers(client: Client, ctx: Arc<Context>) -> Vec<ControllerFuture> {
    let applications: Api<Application> = Api::all(client.clone());
    let deployments: Api<Deployment> = Api::all(client.clone());
    let app_versions: Api<AppVersion> = Api::all(client.clone());
    let updates: Api<Update> = Api::all(client);

    let application_ctrl = Controller::new(applications, watcher_config())
        .owns(app_versions.clone(), watcher_config())
        .shutdown_on_signal()
        .run(
            reconcile_application,
            error_policy::<Application>,
            ctx.clone(),
        )
        .for_each(log_reconcile_result("Application"));

    let deployment_ctrl = Controller::new(deployments, watcher_config())
        .owns(app_versions.clone(), watcher_config())
        .shutdown_on_signal()
        .run(reconcile_deployment, error_policy::<Deployment>, ctx.clone())
        .for_each(log_reconcile_result("Deployment"));

    let update_ctrl = Controller::new(app_versions, watcher_config())
        .owns(updates.clone(), watcher_config())
        .shutdown_on_signal()
        .run(sync_update, error_policy::<AppVersion>, ctx.clone())
        .for_each(log_reconcile_result("AppVersion"));

    let drift_ctrl = Controller::new(updates, watcher_config())
        .shutdown_on_signal()
        .run(reconcile_drift, error_policy::<Update>, ctx)
        .for_each(log_reconcile_result("Update"));

    tracing::info!("- Application controller");
    tracing::info!("- Deployment controller");
    tracing::info!("- AppVersion controller");
    tracing::info!("- Update drift controller");

    vec![
        Box::pin(application_ctrl),
        Box::pin(deployment_ctrl),
        Box::pin(update_ctrl),
        Box::pin(drift_ctrl),
    ]
}

/// Creates a closure for logging reconciliation results.
fn log_reconcile_result<T: std::fmt::Debug, E: std::fmt::Debug>(
    controller_name: &'static str,
) -> impl Fn(Result<T, E>) -> std::future::Ready<()> {
    move |result| {
        match result {
            Ok(action) => tracing::debug!(?action, "{} reconciliation completed", controller_name),
            Err(e) => tracing::error!(error = ?e, "{} reconciliation error", controller_name),
        }
        std::future::ready(())
    }
}
