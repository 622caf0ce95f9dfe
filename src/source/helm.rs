//! Helm chart repository resolver
//!
//! A chart repository publishes `index.yaml` at its root, listing every chart
//! and all of its released versions. The latest version of a chart is the
//! highest semantic version among its entries, not the first or newest-dated.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};
use url::Url;

use super::ChartRepository;
use crate::Error;

/// Default timeout for index fetches
pub const DEFAULT_INDEX_TIMEOUT: Duration = Duration::from_secs(5);

/// Decoded chart repository index
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChartIndex {
    /// Index format version
    #[serde(default)]
    pub api_version: String,

    /// Chart name to released entries, in index order
    #[serde(default)]
    pub entries: BTreeMap<String, Vec<ChartEntry>>,
}

impl ChartIndex {
    /// Entries released under `chart`, if the index lists it
    pub fn entries_for(&self, chart: &str) -> Option<&[ChartEntry]> {
        self.entries.get(chart).map(Vec::as_slice)
    }
}

/// One released chart version
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct ChartEntry {
    /// Chart name
    #[serde(default)]
    pub name: String,

    /// Chart description
    #[serde(default)]
    pub description: String,

    /// Package digest
    #[serde(default)]
    pub digest: String,

    /// Chart version as published
    #[serde(default)]
    pub version: String,

    /// Publication time
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created: Option<DateTime<Utc>>,
}

fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok().map(|t| t.with_timezone(&Utc))))
}

/// Parse a chart version as a semantic version.
///
/// Accepts a leading `v` and zero-fills missing minor/patch components, so
/// `v1.2` parses as `1.2.0`.
pub fn parse_chart_version(raw: &str) -> Option<semver::Version> {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);

    if let Ok(v) = semver::Version::parse(trimmed) {
        return Some(v);
    }

    let split_at = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
    let (core, suffix) = trimmed.split_at(split_at);
    let parts = core.split('.').count();
    if core.is_empty() || parts >= 3 {
        return None;
    }
    let padded = format!("{}{}{}", core, ".0".repeat(3 - parts), suffix);
    semver::Version::parse(&padded).ok()
}

/// Highest semantic version among `entries`, as its published string.
///
/// Unparsable versions are skipped; `None` when none parse. On equal versions
/// the earlier entry wins.
pub fn latest_chart_version(entries: &[ChartEntry]) -> Option<&str> {
    let mut best: Option<(semver::Version, &str)> = None;
    for entry in entries {
        let Some(parsed) = parse_chart_version(&entry.version) else {
            debug!(version = %entry.version, "skipping unparsable chart version");
            continue;
        };
        if best.as_ref().map_or(true, |(b, _)| parsed > *b) {
            best = Some((parsed, entry.version.as_str()));
        }
    }
    best.map(|(_, raw)| raw)
}

/// Build the index URL for a repository locator
pub fn index_url(repo_url: &str) -> Result<Url, Error> {
    let base = repo_url.trim_end_matches('/');
    let url = Url::parse(&format!("{}/index.yaml", base))
        .map_err(|e| Error::invalid_locator(repo_url, e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::invalid_locator(
            repo_url,
            format!("unsupported scheme {}", url.scheme()),
        ));
    }
    Ok(url)
}

/// HTTP client for chart repository indices.
///
/// A `reqwest::Client` is built per fetch from this configuration, so no
/// connection state is shared between reconciles.
#[derive(Clone, Debug)]
pub struct HelmRepositoryClient {
    timeout: Duration,
    insecure_skip_tls_verify: bool,
}

impl Default for HelmRepositoryClient {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_TIMEOUT, false)
    }
}

impl HelmRepositoryClient {
    /// Create a client with the given request timeout.
    ///
    /// `insecure_skip_tls_verify` disables certificate verification for index
    /// fetches and must be opted into explicitly by the operator.
    pub fn new(timeout: Duration, insecure_skip_tls_verify: bool) -> Self {
        Self {
            timeout,
            insecure_skip_tls_verify,
        }
    }

    fn http_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .danger_accept_invalid_certs(self.insecure_skip_tls_verify)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))
    }
}

#[async_trait]
impl ChartRepository for HelmRepositoryClient {
    async fn fetch_index(&self, repo_url: &str) -> Result<ChartIndex, Error> {
        let url = index_url(repo_url)?;
        let client = self.http_client()?;

        let response = client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::source_request(url.as_str(), e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(Error::SourceStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::source_request(url.as_str(), e.to_string()))?;

        match serde_yaml::from_slice::<ChartIndex>(&body) {
            Ok(index) => {
                debug!(url = %url, charts = index.entries.len(), "fetched chart index");
                Ok(index)
            }
            Err(e) => {
                warn!(url = %url, error = %e, "chart index is not decodable, treating as empty");
                Ok(ChartIndex::default())
            }
        }
    }
}
