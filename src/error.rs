//! Error types for the kupdater controllers

use thiserror::Error;

/// Main error type for kupdater operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Deployment is enabled for tracking but has no source annotation
    #[error("missing annotation {0}")]
    MissingSourceAnnotation(String),

    /// Deployment is enabled for tracking but has no type annotation
    #[error("missing annotation {0}")]
    MissingTypeAnnotation(String),

    /// Container image reference carries no tag to derive a version from
    #[error("container {container} has malformed image reference {image:?}: no tag")]
    MalformedImageReference {
        /// Container name
        container: String,
        /// Image reference as declared
        image: String,
    },

    /// Source locator cannot be turned into a request target
    #[error("invalid source locator {locator:?}: {reason}")]
    InvalidSourceLocator {
        /// Locator as declared on the workload
        locator: String,
        /// What is wrong with it
        reason: String,
    },

    /// Transport-level failure talking to an upstream source
    #[error("request to {url} failed: {message}")]
    SourceRequest {
        /// Requested URL
        url: String,
        /// Underlying failure
        message: String,
    },

    /// Upstream source answered with a non-success status
    #[error("request to {url} returned HTTP {status}")]
    SourceStatus {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Validation error for resource specs
    #[error("validation error: {0}")]
    Validation(String),

    /// Invalid controller configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create a configuration error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid-locator error
    pub fn invalid_locator(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSourceLocator {
            locator: locator.into(),
            reason: reason.into(),
        }
    }

    /// Create a transport error for a request to `url`
    pub fn source_request(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceRequest {
            url: url.into(),
            message: message.into(),
        }
    }

    /// True for errors caused by the workload's own declaration.
    ///
    /// These block tracker creation and only clear once the workload changes.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            Self::MissingSourceAnnotation(_)
                | Self::MissingTypeAnnotation(_)
                | Self::MalformedImageReference { .. }
        )
    }

    /// True when the Kubernetes API rejected a write against a stale resourceVersion
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Kube(kube::Error::Api(resp)) if resp.code == 409)
    }
}
