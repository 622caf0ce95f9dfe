//! Integration tests for kupdater
//!
//! These tests require a Kubernetes cluster (kind) to run and tell the story
//! of how workloads get their versions tracked.
//!
//! # Test Organization
//!
//! - `crd_operations`: Stories about creating and reading AppVersion and
//!   Update resources through the Kubernetes API
//!
//! - `pipeline`: Stories that drive the reconcilers against a real API server
//!   and an in-process chart repository
//!
//! # Running These Tests
//!
//! ```bash
//! cargo test --test kind -- --ignored
//! ```

mod crd_operations;
mod helpers;
mod pipeline;
