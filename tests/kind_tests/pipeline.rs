//! Integration tests for the tracking pipeline
//!
//! Each story drives the reconcilers one step at a time against the kind API
//! server, with chart indices served from the test process.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::api::{Api, PostParams};
use kube::{Client, ResourceExt};

use kupdater::config::ControllerConfig;
use kupdater::controller::{reconcile_deployment, reconcile_drift, sync_update, Context};
use kupdater::crd::{AppVersion, Update, CONDITION_OUTDATED};
use kupdater::descriptor::{
    ENABLED_ANNOTATION, SOURCE_ANNOTATION, TYPE_ANNOTATION, VERSION_ANNOTATION,
};

use super::helpers::{ensure_test_cluster, fresh_namespace};

const INDEX: &str = r#"
apiVersion: v1
entries:
  web:
    - name: web
      version: 1.0.0
    - name: web
      version: 1.1.0
"#;

/// Serve `INDEX` at `/index.yaml` and return the repository URL
async fn serve_chart_repository() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind chart repository");
    let addr = listener.local_addr().expect("no local address");
    let router = Router::new().route("/index.yaml", get(|| async { INDEX }));
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("chart repository failed");
    });
    format!("http://{addr}")
}

fn annotated_deployment(namespace: &str, repo_url: &str, version: &str) -> Deployment {
    let labels = BTreeMap::from([("app".to_string(), "web".to_string())]);
    let annotations = BTreeMap::from([
        (ENABLED_ANNOTATION.to_string(), "true".to_string()),
        (SOURCE_ANNOTATION.to_string(), repo_url.to_string()),
        (TYPE_ANNOTATION.to_string(), "helm".to_string()),
        (VERSION_ANNOTATION.to_string(), version.to_string()),
    ]);

    Deployment {
        metadata: ObjectMeta {
            name: Some("web".to_string()),
            namespace: Some(namespace.to_string()),
            annotations: Some(annotations),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(0),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: "web".to_string(),
                        image: Some("nginx:1.25".to_string()),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn context(client: &Client) -> Arc<Context> {
    Arc::new(
        Context::builder(client.clone())
            .config(ControllerConfig::default())
            .build(),
    )
}

/// Story: An annotated deployment running an old chart version ends up with
/// an Update reporting the newer chart.
///
/// Expected behavior:
/// - The AppVersion is created, named after and owned by the Deployment
/// - The Update mirrors the AppVersion and is owned by it
/// - The drift report names the newer version
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_outdated_deployment_is_reported() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let namespace = "kupdater-pipeline";
    fresh_namespace(&client, namespace)
        .await
        .expect("failed to create namespace");
    let repo_url = serve_chart_repository().await;
    let ctx = context(&client);

    let deployments: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    let deployment = deployments
        .create(
            &PostParams::default(),
            &annotated_deployment(namespace, &repo_url, "1.0.0"),
        )
        .await
        .expect("failed to create Deployment");

    // Discovery creates the tracker
    reconcile_deployment(Arc::new(deployment.clone()), ctx.clone())
        .await
        .expect("deployment reconcile failed");
    let trackers: Api<AppVersion> = Api::namespaced(client.clone(), namespace);
    let tracker = trackers.get("web").await.expect("AppVersion not created");
    assert_eq!(tracker.spec.primary.declared_version, "1.0.0");
    assert_eq!(tracker.owner_references()[0].uid, deployment.uid().unwrap());

    // Reconciling the unchanged deployment again leaves the tracker alone
    reconcile_deployment(Arc::new(deployment), ctx.clone())
        .await
        .expect("second deployment reconcile failed");
    let unchanged = trackers.get("web").await.expect("AppVersion disappeared");
    assert_eq!(unchanged.resource_version(), tracker.resource_version());

    // The tracker is mirrored into an Update
    sync_update(Arc::new(tracker.clone()), ctx.clone())
        .await
        .expect("update sync failed");
    let updates: Api<Update> = Api::namespaced(client.clone(), namespace);
    let update = updates.get("web").await.expect("Update not created");
    assert_eq!(update.owner_references()[0].uid, tracker.uid().unwrap());

    // The drift pass reports the newer chart
    reconcile_drift(Arc::new(update), ctx)
        .await
        .expect("drift reconcile failed");
    let reported = updates.get_status("web").await.expect("Update not readable");
    let status = reported.status.expect("drift report missing");
    assert_eq!(status.phase, "Outdated (1.1.0 available)");
    assert!(status.condition(CONDITION_OUTDATED).unwrap().is_true());
}

/// Story: A deployment without the opt-in annotation is never tracked.
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_unmarked_deployment_is_not_tracked() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let namespace = "kupdater-unmarked";
    fresh_namespace(&client, namespace)
        .await
        .expect("failed to create namespace");

    let mut deployment = annotated_deployment(namespace, "https://charts.example.com", "1.0.0");
    if let Some(annotations) = deployment.metadata.annotations.as_mut() {
        annotations.remove(ENABLED_ANNOTATION);
    }
    let deployments: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    let created = deployments
        .create(&PostParams::default(), &deployment)
        .await
        .expect("failed to create Deployment");

    reconcile_deployment(Arc::new(created), context(&client))
        .await
        .expect("deployment reconcile failed");

    let trackers: Api<AppVersion> = Api::namespaced(client, namespace);
    assert!(trackers
        .get_opt("web")
        .await
        .expect("failed to query AppVersion")
        .is_none());
}
