use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::{Resource, ResourceExt};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::crd::registry::{Condition, Registry};
use crate::resource::factory::{
    APP_NAME, LABEL_COMPONENT, LABEL_INSTANCE, LABEL_MANAGED_BY, LABEL_NAME,
    MANAGED_BY,
};
use crate::resource::{DependentSpec, DesiredResource, TargetKind};

use super::apply::{ApplyOutcome, ObjectOps, apply};
use super::status::{
    build_status, failed_condition, ready_condition, should_patch_status,
};
use super::{ControllerContext, ReconcileErr};

/// One reconcile cycle for one owner: per registered kind, compute the
/// desired manifest, diff it against the discriminator-selected observed
/// object and apply; then prune unregistered children and record per-kind
/// outcomes in the owner status.
#[instrument(skip_all, fields(ns = %obj.namespace().unwrap_or_else(|| "default".into()), name = %obj.name_any()))]
pub async fn reconcile(
    obj: Arc<Registry>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, ReconcileErr> {
    let ns = obj.namespace().unwrap_or_else(|| "default".to_string());
    let name = obj.name_any();
    let key = format!("{ns}/{name}");

    // Children carry controller owner references; the orchestrator garbage
    // collects them with the owner. Nothing to do here.
    if obj.meta().deletion_timestamp.is_some() {
        debug!("owner deleting; children are garbage-collected");
        return Ok(Action::await_change());
    }

    let dep_api: Api<Deployment> = Api::namespaced(ctx.client.clone(), &ns);
    let svc_api: Api<Service> = Api::namespaced(ctx.client.clone(), &ns);

    let now = Utc::now().to_rfc3339();
    let mut conditions: Vec<Condition> = Vec::new();
    let mut failures: Vec<ReconcileErr> = Vec::new();

    for entry in ctx.registrations.entries() {
        match run_kind(&obj, &ctx, entry, &dep_api, &svc_api).await {
            Ok(outcome) => {
                info!(kind = entry.id, ?outcome, "kind reconciled");
                conditions.push(ready_condition(
                    entry.condition_type,
                    outcome,
                    &now,
                ));
            }
            Err(e) => {
                warn!(kind = entry.id, reason = e.reason(), error = %e, "kind failed");
                conditions.push(failed_condition(entry.condition_type, &e, &now));
                failures.push(e);
            }
        }
    }

    prune_unregistered(&ctx, &name, &dep_api, &svc_api).await;

    update_status(&obj, &ctx, &ns, &name, conditions).await?;

    match select_cycle_error(failures) {
        Some(e) => Err(e),
        None => {
            ctx.backoff.reset(&key);
            Ok(Action::requeue(Duration::from_secs(ctx.cfg.resync_secs)))
        }
    }
}

/// Pick the error that drives the requeue policy for the whole cycle. A
/// retryable failure outranks a non-retryable one, since a timed retry may
/// fix it; with only non-retryable failures the cycle waits for the next
/// owner change, carrying the failure in the status conditions meanwhile.
fn select_cycle_error(failures: Vec<ReconcileErr>) -> Option<ReconcileErr> {
    let mut fatal: Option<ReconcileErr> = None;
    for e in failures {
        if e.retryable() {
            return Some(e);
        }
        if fatal.is_none() {
            fatal = Some(e);
        }
    }
    fatal
}

/// Compute → diff → apply for a single registration entry. Computation errors
/// abort before any I/O; apply failures are taxonomy-classified by `apply`.
async fn run_kind(
    owner: &Registry,
    ctx: &ControllerContext,
    entry: &DependentSpec,
    dep_api: &Api<Deployment>,
    svc_api: &Api<Service>,
) -> Result<ApplyOutcome, ReconcileErr> {
    let desired = (entry.desired)(owner, &ctx.cfg)?;
    let owner_name = owner.name_any();
    match desired {
        DesiredResource::Deployment(dep) => {
            apply(
                dep_api,
                &dep,
                &owner_name,
                entry.discriminator,
                ctx.cfg.conflict_retries,
            )
            .await
        }
        DesiredResource::Service(svc) => {
            apply(
                svc_api,
                &svc,
                &owner_name,
                entry.discriminator,
                ctx.cfg.conflict_retries,
            )
            .await
        }
    }
}

/// Delete managed children whose component matches no current registration.
/// This only happens when a kind was unregistered while the owner persists;
/// owner deletion is covered by garbage collection instead. Best effort.
async fn prune_unregistered(
    ctx: &ControllerContext,
    owner_name: &str,
    dep_api: &Api<Deployment>,
    svc_api: &Api<Service>,
) {
    let selector =
        format!("{LABEL_NAME}={APP_NAME},{LABEL_INSTANCE}={owner_name}");
    prune_kind(ctx, TargetKind::Deployment, dep_api, &selector).await;
    prune_kind(ctx, TargetKind::Service, svc_api, &selector).await;
}

async fn prune_kind<K>(
    ctx: &ControllerContext,
    kind: TargetKind,
    api: &dyn ObjectOps<K>,
    selector: &str,
) where
    K: Resource + Clone + Send + Sync,
{
    let registered = ctx.registrations.registered_components(kind);
    let candidates = match api.list_labeled(selector).await {
        Ok(items) => items,
        Err(e) => {
            warn!(%kind, error = %e, "prune: listing children failed");
            return;
        }
    };
    for child in candidates {
        let labels = child.meta().labels.clone().unwrap_or_default();
        // Only touch objects this operator marked as its own.
        if labels.get(LABEL_MANAGED_BY).map(String::as_str) != Some(MANAGED_BY)
        {
            continue;
        }
        let component = labels.get(LABEL_COMPONENT).map(String::as_str);
        if component.is_some_and(|c| registered.iter().any(|r| *r == c)) {
            continue;
        }
        let child_name = child.name_any();
        info!(%kind, child = %child_name, "prune: deleting unregistered child");
        if let Err(e) = api.delete(&child_name).await {
            warn!(%kind, child = %child_name, error = %e, "prune: delete failed");
        }
    }
}

/// Write per-kind conditions back to the owner, unless a newer generation has
/// arrived (its cycle owns the status) or nothing material changed.
async fn update_status(
    obj: &Registry,
    ctx: &ControllerContext,
    ns: &str,
    name: &str,
    conditions: Vec<Condition>,
) -> Result<(), ReconcileErr> {
    let owner_api: Api<Registry> = Api::namespaced(ctx.client.clone(), ns);
    let latest = owner_api
        .get_opt(name)
        .await
        .map_err(ReconcileErr::Transport)?;
    let Some(latest) = latest else {
        debug!("owner gone; skipping status update");
        return Ok(());
    };
    if latest.meta().generation != obj.meta().generation {
        debug!("newer owner generation observed; superseding this cycle's status");
        return Ok(());
    }

    let status = build_status(
        latest.status.as_ref(),
        obj.meta().generation,
        conditions,
    );
    if !should_patch_status(latest.status.as_ref(), &status) {
        debug!("status unchanged; skipping patch");
        return Ok(());
    }
    let patch = json!({ "status": status });
    owner_api
        .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .map_err(ReconcileErr::Transport)?;
    Ok(())
}
