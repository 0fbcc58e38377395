pub mod apply;
pub mod backoff;
pub mod diff;
pub mod reconcile;
pub mod status;

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::runtime::controller::Action;
use kube::runtime::{Controller, watcher};
use kube::{Api, Client, ResourceExt};
use tracing::{error, info, warn};

use crate::config::OperatorConfig;
use crate::crd::registry::Registry;
use crate::resource::{ComputationError, Registrations};

use backoff::Backoff;
use reconcile::reconcile;

/// Cycle-level failure for one owner/kind pair.
#[derive(thiserror::Error, Debug)]
pub enum ReconcileErr {
    /// Desired-state computation failed; nothing was written. Not retried on
    /// a timer, the next trigger re-runs the cycle.
    #[error(transparent)]
    Computation(#[from] ComputationError),

    /// Optimistic-concurrency conflict persisted through the bounded
    /// in-cycle retries.
    #[error("write conflict persisted after {attempts} attempts")]
    Conflict { attempts: u32 },

    /// Connectivity or API failure; retried with exponential backoff.
    #[error("transport error: {0}")]
    Transport(#[source] kube::Error),
}

impl ReconcileErr {
    pub fn reason(&self) -> &'static str {
        match self {
            ReconcileErr::Computation(_) => "ComputationError",
            ReconcileErr::Conflict { .. } => "ConflictError",
            ReconcileErr::Transport(_) => "TransportError",
        }
    }

    pub fn retryable(&self) -> bool {
        !matches!(self, ReconcileErr::Computation(_))
    }
}

pub struct ControllerContext {
    pub client: Client,
    pub cfg: OperatorConfig,
    pub registrations: Registrations,
    pub backoff: Backoff,
}

pub async fn run_controller(
    client: Client,
    cfg: OperatorConfig,
) -> anyhow::Result<()> {
    // A discriminator collision would race two registrations over one live
    // object; refuse to start instead.
    let registrations = Registrations::builtin()?;

    let backoff = Backoff::new(
        Duration::from_millis(cfg.backoff_base_ms),
        Duration::from_secs(cfg.backoff_cap_secs),
    );
    let ctx = Arc::new(ControllerContext {
        client: client.clone(),
        cfg,
        registrations,
        backoff,
    });

    let owners: Api<Registry> = Api::all(client.clone());
    let deployments: Api<Deployment> = Api::all(client.clone());
    let services: Api<Service> = Api::all(client);

    Controller::new(owners, watcher::Config::default())
        .owns(deployments, watcher::Config::default())
        .owns(services, watcher::Config::default())
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj_ref, action)) => {
                    info!(object = %obj_ref.name, "reconciled: requeue={:?}", action)
                }
                Err(e) => error!(error = ?e, "reconcile error"),
            }
        })
        .await;

    Ok(())
}

fn error_policy(
    obj: Arc<Registry>,
    error: &ReconcileErr,
    ctx: Arc<ControllerContext>,
) -> Action {
    let key = format!(
        "{}/{}",
        obj.namespace().unwrap_or_else(|| "default".to_string()),
        obj.name_any()
    );
    if !error.retryable() {
        warn!(%key, reason = error.reason(), "cycle failed; awaiting next trigger");
        return Action::await_change();
    }
    let delay = ctx.backoff.next_delay(&key);
    warn!(%key, reason = error.reason(), ?delay, "cycle failed; scheduling retry");
    Action::requeue(delay)
}
