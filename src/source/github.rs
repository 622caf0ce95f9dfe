//! GitHub release resolver
//!
//! Resolves the latest published release of a repository through the
//! unauthenticated REST API. The release tag is used verbatim as the version;
//! no semantic-version parsing or pre-release filtering is applied.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::ReleaseFeed;
use crate::Error;

/// Public GitHub API endpoint
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Default timeout for release lookups
pub const DEFAULT_RELEASE_TIMEOUT: Duration = Duration::from_secs(10);

/// GitHub rejects requests without a User-Agent
const USER_AGENT: &str = concat!("kupdater/", env!("CARGO_PKG_VERSION"));

/// A published release
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Release {
    /// Tag the release was cut from
    #[serde(rename = "tag_name", alias = "tagName")]
    pub tag_name: String,
}

/// Extract `(owner, repo)` from a repository locator such as
/// `https://github.com/argoproj/argo-cd`.
///
/// Owner and repository are the first two path segments; a `.git` suffix is
/// dropped.
pub fn parse_repository(locator: &str) -> Result<(String, String), Error> {
    let url = Url::parse(locator).map_err(|e| Error::invalid_locator(locator, e.to_string()))?;
    let mut segments = url
        .path_segments()
        .ok_or_else(|| Error::invalid_locator(locator, "locator has no path"))?
        .filter(|s| !s.is_empty());

    let owner = segments
        .next()
        .ok_or_else(|| Error::invalid_locator(locator, "missing repository owner"))?;
    let repo = segments
        .next()
        .map(|r| r.trim_end_matches(".git"))
        .filter(|r| !r.is_empty())
        .ok_or_else(|| Error::invalid_locator(locator, "missing repository name"))?;

    Ok((owner.to_string(), repo.to_string()))
}

/// HTTP client for the GitHub releases API
#[derive(Clone, Debug)]
pub struct GitHubClient {
    api_url: String,
    timeout: Duration,
}

impl Default for GitHubClient {
    fn default() -> Self {
        Self::new(DEFAULT_GITHUB_API_URL, DEFAULT_RELEASE_TIMEOUT)
    }
}

impl GitHubClient {
    /// Create a client against `api_url` (e.g. a GitHub Enterprise endpoint)
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_url: api_url.into(),
            timeout,
        }
    }

    fn latest_release_url(&self, owner: &str, repo: &str) -> String {
        format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_url.trim_end_matches('/'),
            owner,
            repo
        )
    }
}

#[async_trait]
impl ReleaseFeed for GitHubClient {
    async fn latest_release(&self, owner: &str, repo: &str) -> Result<Release, Error> {
        let url = self.latest_release_url(owner, repo);
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;

        let response = client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| Error::source_request(&url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::SourceStatus {
                url,
                status: status.as_u16(),
            });
        }

        let release: Release = response
            .json()
            .await
            .map_err(|e| Error::serialization(format!("invalid release from {}: {}", url, e)))?;

        debug!(owner, repo, tag = %release.tag_name, "resolved latest release");
        Ok(release)
    }
}
