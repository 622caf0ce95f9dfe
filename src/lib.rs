//! kupdater - Kubernetes controller reporting version drift
//!
//! kupdater discovers workloads whose versions should be tracked, records the
//! version each one declares, looks up the latest version published upstream
//! and reports the difference as status on an `Update` resource.
//!
//! # Pipeline
//!
//! - Argo CD Applications with a Helm source and Deployments annotated with
//!   `kupdater.ops.getais.cloud/enabled` are discovered
//! - Each gets an `AppVersion` holding its version descriptors
//! - Each AppVersion is mirrored into an `Update`
//! - The Update's sources are resolved against Helm chart repositories or
//!   GitHub releases and drift is written to its status
//!
//! # Modules
//!
//! - [`crd`] - Custom Resource Definitions (AppVersion, Update, Application)
//! - [`descriptor`] - Version descriptor derivation from workloads
//! - [`source`] - Upstream version resolvers (Helm, GitHub)
//! - [`controller`] - Kubernetes controller reconciliation logic
//! - [`controller_runner`] - Controller wiring
//! - [`config`] - Command-line and environment configuration
//! - [`telemetry`] - Logging setup
//! - [`error`] - Error types for the controllers

#![deny(missing_docs)]

pub mod config;
pub mod controller;
pub mod controller_runner;
pub mod crd;
pub mod descriptor;
pub mod error;
pub mod source;
pub mod telemetry;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
