//! Controller configuration
//!
//! Every option can be set on the command line or through a `KUPDATER_*`
//! environment variable.

use std::time::Duration;

use clap::{Args, ValueEnum};
use url::Url;

use crate::source::github::DEFAULT_GITHUB_API_URL;
use crate::Error;

/// Log output format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Human-readable text
    Text,
}

/// Runtime options for the controllers
#[derive(Args, Clone, Debug)]
pub struct ControllerConfig {
    /// Seconds between drift re-checks of an unchanged Update
    #[arg(long, env = "KUPDATER_RESYNC_INTERVAL_SECS", default_value_t = 120)]
    pub resync_interval_secs: u64,

    /// Seconds to wait before retrying a failed reconcile
    #[arg(long, env = "KUPDATER_ERROR_BACKOFF_SECS", default_value_t = 120)]
    pub error_backoff_secs: u64,

    /// Timeout for chart repository index fetches
    #[arg(long, env = "KUPDATER_CHART_INDEX_TIMEOUT_SECS", default_value_t = 5)]
    pub chart_index_timeout_secs: u64,

    /// Timeout for release API lookups
    #[arg(long, env = "KUPDATER_RELEASE_API_TIMEOUT_SECS", default_value_t = 10)]
    pub release_api_timeout_secs: u64,

    /// Skip TLS certificate verification for chart repository index fetches
    #[arg(long, env = "KUPDATER_INSECURE_SKIP_TLS_VERIFY")]
    pub insecure_skip_tls_verify: bool,

    /// Base URL of the GitHub API
    #[arg(long, env = "KUPDATER_GITHUB_API_URL", default_value = DEFAULT_GITHUB_API_URL)]
    pub github_api_url: String,

    /// Log output format
    #[arg(long, env = "KUPDATER_LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,

    /// Do not install or update the CRDs at startup
    #[arg(long, env = "KUPDATER_SKIP_CRD_INSTALL")]
    pub skip_crd_install: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            resync_interval_secs: 120,
            error_backoff_secs: 120,
            chart_index_timeout_secs: 5,
            release_api_timeout_secs: 10,
            insecure_skip_tls_verify: false,
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            log_format: LogFormat::Json,
            skip_crd_install: false,
        }
    }
}

impl ControllerConfig {
    /// Check the configuration for values that cannot work
    pub fn validate(&self) -> Result<(), Error> {
        let durations = [
            ("resync interval", self.resync_interval_secs),
            ("error backoff", self.error_backoff_secs),
            ("chart index timeout", self.chart_index_timeout_secs),
            ("release API timeout", self.release_api_timeout_secs),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, secs)| *secs == 0) {
            return Err(Error::config(format!("{} must be greater than zero", name)));
        }

        Url::parse(&self.github_api_url).map_err(|e| {
            Error::config(format!(
                "invalid GitHub API URL {:?}: {}",
                self.github_api_url, e
            ))
        })?;

        Ok(())
    }

    /// Interval between drift passes for an unchanged Update
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    /// Fixed backoff after a failed reconcile
    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }

    /// Timeout for chart index fetches
    pub fn chart_index_timeout(&self) -> Duration {
        Duration::from_secs(self.chart_index_timeout_secs)
    }

    /// Timeout for release API lookups
    pub fn release_api_timeout(&self) -> Duration {
        Duration::from_secs(self.release_api_timeout_secs)
    }
}
