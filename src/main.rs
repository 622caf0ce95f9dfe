//! kupdater - version drift reporting for Kubernetes workloads

use std::sync::Arc;

use clap::{Parser, Subcommand};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, CustomResourceExt};

use kupdater::config::ControllerConfig;
use kupdater::controller::{Context, FIELD_MANAGER};
use kupdater::controller_runner::build_controllers;
use kupdater::crd::{AppVersion, Update};
use kupdater::telemetry::init_telemetry;

/// kupdater - reports drift between deployed and published versions
#[derive(Parser, Debug)]
#[command(name = "kupdater", version, about, long_about = None)]
struct Cli {
    /// Generate CRD manifests and exit
    #[arg(long)]
    crd: bool,

    #[command(flatten)]
    config: ControllerConfig,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as controller (default mode)
    ///
    /// Watches Argo CD Applications, annotated Deployments, AppVersions and
    /// Updates, and keeps drift reports current.
    Controller,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // aws-lc-rs backs every TLS connection, both to the API server and to
    // upstream version sources.
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!(
            "CRITICAL: Failed to install crypto provider: {:?}. \
             The controller cannot make TLS connections without it.",
            e
        );
        std::process::exit(1);
    }

    let cli = Cli::parse();

    if cli.crd {
        let manifests = [
            serde_yaml::to_string(&AppVersion::crd()),
            serde_yaml::to_string(&Update::crd()),
        ]
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
        println!("{}", manifests.join("---\n"));
        return Ok(());
    }

    cli.config.validate()?;
    init_telemetry(cli.config.log_format)?;

    match cli.command {
        Some(Commands::Controller) | None => run_controller(cli.config).await,
    }
}

/// Ensure the kupdater CRDs are installed
///
/// The controller installs its own CRDs on startup using server-side apply.
/// This ensures the CRD versions always match the controller version.
async fn ensure_crds_installed(client: &Client) -> anyhow::Result<()> {
    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(FIELD_MANAGER).force();

    for (name, crd) in [
        (AppVersion::crd_name(), AppVersion::crd()),
        (Update::crd_name(), Update::crd()),
    ] {
        tracing::info!(crd = %name, "Installing CRD...");
        crds.patch(name, &params, &Patch::Apply(&crd))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to install CRD {}: {}", name, e))?;
    }

    tracing::info!("All kupdater CRDs installed/updated");
    Ok(())
}

/// Run in controller mode
async fn run_controller(config: ControllerConfig) -> anyhow::Result<()> {
    tracing::info!("kupdater controller starting...");

    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    if config.skip_crd_install {
        tracing::info!("Skipping CRD installation");
    } else {
        ensure_crds_installed(&client).await?;
    }

    if config.insecure_skip_tls_verify {
        tracing::warn!("TLS certificate verification is disabled for chart repository fetches");
    }

    let ctx = Arc::new(Context::builder(client.clone()).config(config).build());

    tracing::info!("Starting controllers:");
    futures::future::join_all(build_controllers(client, ctx)).await;

    tracing::info!("kupdater controller shutting down");
    Ok(())
}
