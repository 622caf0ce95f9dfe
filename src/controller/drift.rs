//! Drift reconciliation
//!
//! Resolves the latest upstream version of every source listed on an Update
//! and compares it with the declared version. The report (phase, conditions
//! and sync time) is built in memory over one pass and written once at the
//! end, so observers never see a half-updated status.
//!
//! Failure handling differs per source kind:
//! - chart repository errors degrade to a descriptive phase and a
//!   `SourceUnavailable` condition, and the pass continues
//! - release API errors abort the pass and the last written report stays

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use kube::runtime::controller::Action;
use kube::ResourceExt;
use tracing::{debug, info, instrument, warn};

use super::{namespace_of, Context};
use crate::crd::{
    outdated_phase, Condition, ConditionStatus, SourceKind, Update, UpdateStatus,
    WorkloadDescriptor, CONDITION_OUTDATED, CONDITION_SOURCE_UNAVAILABLE, CONDITION_UP_TO_DATE,
};
use crate::source::{latest_chart_version, parse_repository, ChartRepository, ReleaseFeed};
use crate::Error;

const REASON_NEWER_VERSION: &str = "NewerVersionAvailable";
const REASON_VERSION_MATCHES: &str = "LatestVersionDeployed";
const REASON_SOURCE_UNAVAILABLE: &str = "ChartIndexUnavailable";

/// Outcome of looking up one source
#[derive(Debug, PartialEq)]
enum Resolution {
    /// Latest published version, verbatim
    Latest(String),
    /// The source lists the release but no version could be parsed
    NoReleases,
    /// The source could not be read; carries the reason
    Unavailable(String),
}

/// Run one drift pass over an Update and persist the report.
///
/// A report already computed for the current generation within the resync
/// interval is not recomputed; this absorbs the watch event caused by the
/// report's own write.
#[instrument(skip(update, ctx), fields(update = %update.name_any(), namespace = ?update.namespace()))]
pub async fn reconcile_drift(update: Arc<Update>, ctx: Arc<Context>) -> Result<Action, Error> {
    let name = update.name_any();
    let namespace = namespace_of(update.as_ref())?;
    let resync = ctx.config.resync_interval();
    let now = Utc::now();

    if let Some(wait) = remaining_until_resync(&update, now, resync) {
        debug!(wait_secs = wait.as_secs(), "drift report is current");
        return Ok(Action::requeue(wait));
    }

    let mut status = check_sources(
        &update.spec.versioning.sources,
        update.status.as_ref(),
        &ctx,
        now,
    )
    .await?;
    status.observed_generation = update.metadata.generation;

    ctx.kube
        .patch_update_status(&name, &namespace, update.resource_version(), &status)
        .await?;

    info!(phase = %status.phase, "recorded drift report");
    Ok(Action::requeue(resync))
}

/// Time left before a report written for the current generation is due again
fn remaining_until_resync(
    update: &Update,
    now: DateTime<Utc>,
    resync: Duration,
) -> Option<Duration> {
    let status = update.status.as_ref()?;
    if status.observed_generation.is_none()
        || status.observed_generation != update.metadata.generation
    {
        return None;
    }

    let elapsed = now.signed_duration_since(status.synced_at()?).to_std().ok()?;
    resync.checked_sub(elapsed).filter(|d| !d.is_zero())
}

/// Resolve every source in order and build the resulting report.
///
/// `previous` is the persisted report; condition transition times carry over
/// from it when a condition's status did not change.
async fn check_sources(
    sources: &[WorkloadDescriptor],
    previous: Option<&UpdateStatus>,
    ctx: &Context,
    now: DateTime<Utc>,
) -> Result<UpdateStatus, Error> {
    let mut status = UpdateStatus::begin_pass(now);
    // Set once any source is outdated or unavailable; UpToDate=True is never
    // written after that point.
    let mut degraded = false;
    // An outdated phase is never replaced by an unavailable source's message.
    let mut outdated = false;

    for source in sources {
        let resolution = match &source.kind {
            SourceKind::Helm => resolve_chart(source, ctx.charts.as_ref()).await,
            SourceKind::GitHub => resolve_release(source, ctx.releases.as_ref()).await?,
            SourceKind::Unknown(declared) => {
                debug!(source = %source.name, %declared, "unknown source type, skipping");
                continue;
            }
        };

        match resolution {
            Resolution::Unavailable(message) => {
                warn!(source = %source.name, %message, "version source unavailable");
                degraded = true;
                if status.condition(CONDITION_UP_TO_DATE).is_some_and(Condition::is_true) {
                    status.set_condition(
                        Condition::new(
                            CONDITION_UP_TO_DATE,
                            ConditionStatus::Unknown,
                            REASON_SOURCE_UNAVAILABLE,
                            format!("latest version of {} is unknown", source.name),
                        ),
                        previous,
                    );
                }
                status.set_condition(
                    Condition::new(
                        CONDITION_SOURCE_UNAVAILABLE,
                        ConditionStatus::True,
                        REASON_SOURCE_UNAVAILABLE,
                        message.clone(),
                    ),
                    previous,
                );
                if !outdated {
                    status.phase = message;
                }
            }
            Resolution::NoReleases => {
                debug!(source = %source.name, "no parsable releases found, skipping");
            }
            Resolution::Latest(latest) if latest == source.declared_version => {
                debug!(source = %source.name, version = %latest, "source is up to date");
                if !degraded {
                    status.set_condition(
                        Condition::new(
                            CONDITION_UP_TO_DATE,
                            ConditionStatus::True,
                            REASON_VERSION_MATCHES,
                            format!("{} {} is the latest version", source.name, latest),
                        ),
                        previous,
                    );
                }
            }
            Resolution::Latest(latest) => {
                info!(
                    source = %source.name,
                    declared = %source.declared_version,
                    latest = %latest,
                    "newer version available"
                );
                degraded = true;
                outdated = true;
                let message = format!(
                    "{} {} is available, {} is deployed",
                    source.name, latest, source.declared_version
                );
                status.set_condition(
                    Condition::new(
                        CONDITION_OUTDATED,
                        ConditionStatus::True,
                        REASON_NEWER_VERSION,
                        message.clone(),
                    ),
                    previous,
                );
                status.set_condition(
                    Condition::new(
                        CONDITION_UP_TO_DATE,
                        ConditionStatus::False,
                        REASON_NEWER_VERSION,
                        message,
                    ),
                    previous,
                );
                status.phase = outdated_phase(&latest);
            }
        }
    }

    Ok(status)
}

/// Look up the highest chart version published under the source's name.
///
/// Never fails the pass: fetch errors and a missing chart become
/// [`Resolution::Unavailable`].
async fn resolve_chart(source: &WorkloadDescriptor, charts: &dyn ChartRepository) -> Resolution {
    let index = match charts.fetch_index(&source.source_locator).await {
        Ok(index) => index,
        Err(e) => return Resolution::Unavailable(e.to_string()),
    };

    let Some(entries) = index.entries_for(&source.name) else {
        return Resolution::Unavailable(format!(
            "chart {} not found in {}",
            source.name, source.source_locator
        ));
    };

    match latest_chart_version(entries) {
        Some(version) => Resolution::Latest(version.to_string()),
        None => Resolution::NoReleases,
    }
}

/// Look up the latest release tag. Any failure aborts the pass.
async fn resolve_release(
    source: &WorkloadDescriptor,
    releases: &dyn ReleaseFeed,
) -> Result<Resolution, Error> {
    let (owner, repo) = parse_repository(&source.source_locator)?;
    let release = releases.latest_release(&owner, &repo).await?;
    Ok(Resolution::Latest(release.tag_name))
}
