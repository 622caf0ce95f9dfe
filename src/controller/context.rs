//! Shared controller context and Kubernetes client abstraction

use std::sync::Arc;

use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::{Client, ResourceExt};

#[cfg(test)]
use mockall::automock;

use crate::config::ControllerConfig;
use crate::crd::{AppVersion, Update, UpdateStatus};
use crate::source::{ChartRepository, GitHubClient, HelmRepositoryClient, ReleaseFeed};
use crate::Error;

/// Field manager recorded on writes made by the controllers
pub const FIELD_MANAGER: &str = "kupdater";

/// Trait abstracting Kubernetes client operations on AppVersion and Update
///
/// This trait allows mocking the Kubernetes client in tests while using
/// the real client in production.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KubeClient: Send + Sync {
    /// Get an AppVersion, `None` if it does not exist
    async fn get_app_version(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<AppVersion>, Error>;

    /// Create an AppVersion in its own namespace
    async fn create_app_version(&self, app_version: &AppVersion) -> Result<(), Error>;

    /// Replace an AppVersion
    ///
    /// The object must carry the resourceVersion it was read at; a stale
    /// write is rejected by the API server.
    async fn replace_app_version(&self, app_version: &AppVersion) -> Result<(), Error>;

    /// Get an Update, `None` if it does not exist
    async fn get_update(&self, name: &str, namespace: &str) -> Result<Option<Update>, Error>;

    /// Create an Update in its own namespace
    async fn create_update(&self, update: &Update) -> Result<(), Error>;

    /// Replace an Update's spec, leaving status untouched
    async fn replace_update(&self, update: &Update) -> Result<(), Error>;

    /// Write the full status of an Update
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the Update
    /// * `namespace` - Namespace of the Update
    /// * `resource_version` - resourceVersion the pass observed; when set, the
    ///   write fails with a conflict if the Update changed since
    /// * `status` - Complete status to persist
    async fn patch_update_status(
        &self,
        name: &str,
        namespace: &str,
        resource_version: Option<String>,
        status: &UpdateStatus,
    ) -> Result<(), Error>;
}

/// Real Kubernetes client implementation
pub struct KubeClientImpl {
    client: Client,
}

impl KubeClientImpl {
    /// Create a new KubeClientImpl wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn namespaced<K>(&self, obj: &K) -> Result<(Api<K>, String), Error>
    where
        K: kube::Resource<DynamicType = (), Scope = kube::core::NamespaceResourceScope>
            + Clone
            + serde::de::DeserializeOwned
            + std::fmt::Debug,
    {
        let namespace = obj.namespace().ok_or_else(|| {
            Error::validation(format!("{} {} has no namespace", K::kind(&()), obj.name_any()))
        })?;
        Ok((Api::namespaced(self.client.clone(), &namespace), namespace))
    }
}

#[async_trait]
impl KubeClient for KubeClientImpl {
    async fn get_app_version(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<AppVersion>, Error> {
        let api: Api<AppVersion> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn create_app_version(&self, app_version: &AppVersion) -> Result<(), Error> {
        let (api, _) = self.namespaced(app_version)?;
        api.create(&PostParams::default(), app_version).await?;
        Ok(())
    }

    async fn replace_app_version(&self, app_version: &AppVersion) -> Result<(), Error> {
        let (api, _) = self.namespaced(app_version)?;
        api.replace(&app_version.name_any(), &PostParams::default(), app_version)
            .await?;
        Ok(())
    }

    async fn get_update(&self, name: &str, namespace: &str) -> Result<Option<Update>, Error> {
        let api: Api<Update> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn create_update(&self, update: &Update) -> Result<(), Error> {
        let (api, _) = self.namespaced(update)?;
        api.create(&PostParams::default(), update).await?;
        Ok(())
    }

    async fn replace_update(&self, update: &Update) -> Result<(), Error> {
        let (api, _) = self.namespaced(update)?;
        api.replace(&update.name_any(), &PostParams::default(), update)
            .await?;
        Ok(())
    }

    async fn patch_update_status(
        &self,
        name: &str,
        namespace: &str,
        resource_version: Option<String>,
        status: &UpdateStatus,
    ) -> Result<(), Error> {
        let api: Api<Update> = Api::namespaced(self.client.clone(), namespace);

        let mut patch = serde_json::json!({ "status": status });
        if let Some(rv) = resource_version {
            patch["metadata"] = serde_json::json!({ "resourceVersion": rv });
        }

        api.patch_status(
            name,
            &PatchParams::apply(FIELD_MANAGER),
            &Patch::Merge(&patch),
        )
        .await?;

        Ok(())
    }
}

/// Controller context containing shared state and clients
///
/// The context is shared across all reconciliation calls of every controller.
///
/// Use [`ContextBuilder`] to construct instances:
///
/// ```ignore
/// let ctx = Context::builder(client).config(config).build();
/// ```
pub struct Context {
    /// Kubernetes client for API operations (trait object for testability)
    pub kube: Arc<dyn KubeClient>,
    /// Chart repository index fetcher
    pub charts: Arc<dyn ChartRepository>,
    /// Release API client
    pub releases: Arc<dyn ReleaseFeed>,
    /// Intervals, timeouts and endpoints
    pub config: ControllerConfig,
}

impl Context {
    /// Create a builder for constructing a Context
    pub fn builder(client: Client) -> ContextBuilder {
        ContextBuilder::new(client)
    }

    /// Create a context for testing with mock clients and default config
    #[cfg(test)]
    pub fn for_testing(
        kube: Arc<dyn KubeClient>,
        charts: Arc<dyn ChartRepository>,
        releases: Arc<dyn ReleaseFeed>,
    ) -> Self {
        Self {
            kube,
            charts,
            releases,
            config: ControllerConfig::default(),
        }
    }
}

/// Builder for constructing [`Context`] instances
///
/// Resolvers not set explicitly are built from the config, so timeouts and
/// the TLS opt-in take effect.
pub struct ContextBuilder {
    client: Client,
    kube: Option<Arc<dyn KubeClient>>,
    charts: Option<Arc<dyn ChartRepository>>,
    releases: Option<Arc<dyn ReleaseFeed>>,
    config: ControllerConfig,
}

impl ContextBuilder {
    fn new(client: Client) -> Self {
        Self {
            client,
            kube: None,
            charts: None,
            releases: None,
            config: ControllerConfig::default(),
        }
    }

    /// Set the controller configuration
    pub fn config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the Kubernetes client (primarily for testing)
    pub fn kube_client(mut self, kube: Arc<dyn KubeClient>) -> Self {
        self.kube = Some(kube);
        self
    }

    /// Override the chart repository client
    pub fn chart_repository(mut self, charts: Arc<dyn ChartRepository>) -> Self {
        self.charts = Some(charts);
        self
    }

    /// Override the release API client
    pub fn release_feed(mut self, releases: Arc<dyn ReleaseFeed>) -> Self {
        self.releases = Some(releases);
        self
    }

    /// Build the Context
    pub fn build(self) -> Context {
        let config = self.config;
        Context {
            kube: self
                .kube
                .unwrap_or_else(|| Arc::new(KubeClientImpl::new(self.client.clone()))),
            charts: self.charts.unwrap_or_else(|| {
                Arc::new(HelmRepositoryClient::new(
                    config.chart_index_timeout(),
                    config.insecure_skip_tls_verify,
                ))
            }),
            releases: self.releases.unwrap_or_else(|| {
                Arc::new(GitHubClient::new(
                    config.github_api_url.clone(),
                    config.release_api_timeout(),
                ))
            }),
            config,
        }
    }
}
