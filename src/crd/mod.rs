//! Custom Resource Definitions for kupdater
//!
//! `AppVersion` and `Update` are owned by this controller. `Application` is a
//! read-only mirror of the Argo CD resource used for discovery.

mod app_version;
mod application;
mod types;
mod update;

pub use app_version::{AppVersion, AppVersionSpec, AppVersionStatus};
pub use application::{Application, ApplicationDestination, ApplicationSource, ApplicationSpec};
pub use types::{
    find_condition, upsert_condition, Condition, ConditionStatus, SourceKind, WorkloadDescriptor,
};
pub use update::{
    outdated_phase, Update, UpdateSpec, UpdateStatus, UpdateVersioning, CONDITION_OUTDATED,
    CONDITION_SOURCE_UNAVAILABLE, CONDITION_UP_TO_DATE, PHASE_UP_TO_DATE,
};
