//! Integration tests for CRD operations
//!
//! These tests tell the story of how AppVersion and Update resources look
//! through the Kubernetes API.

use kube::api::{Api, Patch, PatchParams, PostParams};

use kupdater::crd::{
    AppVersion, AppVersionSpec, SourceKind, Update, UpdateSpec, UpdateStatus, WorkloadDescriptor,
};

use super::helpers::{ensure_test_cluster, fresh_namespace};

fn argo_descriptor(version: &str) -> WorkloadDescriptor {
    WorkloadDescriptor::new(
        "argo-cd",
        SourceKind::Helm,
        "https://argoproj.github.io/argo-helm",
        version,
    )
}

/// Story: An AppVersion round-trips through the API server with the flat
/// `{name, type, source, version}` spec.
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_app_version_persists_flat_descriptor() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let namespace = "kupdater-crd-av";
    fresh_namespace(&client, namespace)
        .await
        .expect("failed to create namespace");
    let api: Api<AppVersion> = Api::namespaced(client.clone(), namespace);

    let tracker = AppVersion::new(
        "argo-cd",
        AppVersionSpec {
            primary: argo_descriptor("5.51.0"),
            additional_sources: Vec::new(),
        },
    );
    api.create(&PostParams::default(), &tracker)
        .await
        .expect("failed to create AppVersion");

    let raw: Api<kube::api::DynamicObject> = Api::namespaced_with(
        client.clone(),
        namespace,
        &kube::api::ApiResource::erase::<AppVersion>(&()),
    );
    let stored = raw.get("argo-cd").await.expect("failed to read AppVersion");
    let spec = &stored.data["spec"];
    assert_eq!(spec["type"], "helm");
    assert_eq!(spec["version"], "5.51.0");
    assert!(spec.get("additionalSources").is_none());
}

/// Story: Status writes on an Update are rejected when they were computed
/// against a stale resourceVersion.
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_stale_status_write_conflicts() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let namespace = "kupdater-crd-update";
    fresh_namespace(&client, namespace)
        .await
        .expect("failed to create namespace");
    let api: Api<Update> = Api::namespaced(client.clone(), namespace);

    let created = api
        .create(
            &PostParams::default(),
            &Update::new(
                "argo-cd",
                UpdateSpec::from_sources(vec![argo_descriptor("5.51.0")]),
            ),
        )
        .await
        .expect("failed to create Update");
    let stale_rv = created.metadata.resource_version.clone();

    // Someone else changes the Update in between
    let mut changed = created.clone();
    changed.spec = UpdateSpec::from_sources(vec![argo_descriptor("5.52.0")]);
    api.replace("argo-cd", &PostParams::default(), &changed)
        .await
        .expect("failed to replace Update");

    let status = UpdateStatus {
        phase: "UpToDate".to_string(),
        ..Default::default()
    };
    let patch = serde_json::json!({
        "metadata": { "resourceVersion": stale_rv },
        "status": status,
    });
    let result = api
        .patch_status("argo-cd", &PatchParams::default(), &Patch::Merge(&patch))
        .await;

    assert!(
        matches!(result, Err(kube::Error::Api(ref e)) if e.code == 409),
        "stale write should conflict, got {result:?}"
    );
}
