//! Version source resolvers
//!
//! Stateless clients that look up the latest published version of a release:
//! - [`helm`] fetches a chart repository's `index.yaml`
//! - [`github`] queries the GitHub "latest release" API
//!
//! Both are reached through traits so the drift controller can be tested
//! without network access.

pub mod github;
pub mod helm;

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::Error;

pub use github::{parse_repository, GitHubClient, Release};
pub use helm::{latest_chart_version, ChartEntry, ChartIndex, HelmRepositoryClient};

/// Fetches chart repository indices
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChartRepository: Send + Sync {
    /// Fetch and decode `<repo_url>/index.yaml`.
    ///
    /// Transport failures and non-200 responses are errors; an undecodable
    /// body yields an empty index.
    async fn fetch_index(&self, repo_url: &str) -> Result<ChartIndex, Error>;
}

/// Looks up the latest published release of a repository
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ReleaseFeed: Send + Sync {
    /// Latest published release of `owner/repo`
    async fn latest_release(&self, owner: &str, repo: &str) -> Result<Release, Error>;
}
