use async_trait::async_trait;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::{Resource, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::resource::discriminator::Discriminator;

use super::ReconcileErr;
use super::diff::needs_update;

/// What one apply decided to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Observed already matched the desired manifest; zero writes issued.
    Unchanged,
    Created,
    Updated,
}

impl ApplyOutcome {
    pub fn reason(&self) -> &'static str {
        match self {
            ApplyOutcome::Unchanged => "InSync",
            ApplyOutcome::Created => "Created",
            ApplyOutcome::Updated => "Updated",
        }
    }
}

/// The only I/O seam of the apply phase. The kube `Api` implements it for
/// real clusters; unit tests substitute an in-memory fake.
#[async_trait]
pub trait ObjectOps<K>: Send + Sync {
    async fn list_labeled(&self, selector: &str) -> Result<Vec<K>, kube::Error>;
    async fn create(&self, obj: &K) -> Result<K, kube::Error>;
    async fn replace(&self, name: &str, obj: &K) -> Result<K, kube::Error>;
    async fn delete(&self, name: &str) -> Result<(), kube::Error>;
}

#[async_trait]
impl<K> ObjectOps<K> for Api<K>
where
    K: Clone + std::fmt::Debug + Serialize + DeserializeOwned + Send + Sync,
{
    async fn list_labeled(&self, selector: &str) -> Result<Vec<K>, kube::Error> {
        Ok(self
            .list(&ListParams::default().labels(selector))
            .await?
            .items)
    }

    async fn create(&self, obj: &K) -> Result<K, kube::Error> {
        Api::create(self, &PostParams::default(), obj).await
    }

    async fn replace(&self, name: &str, obj: &K) -> Result<K, kube::Error> {
        Api::replace(self, name, &PostParams::default(), obj).await
    }

    async fn delete(&self, name: &str) -> Result<(), kube::Error> {
        Api::delete(self, name, &DeleteParams::default())
            .await
            .map(|_| ())
    }
}

fn is_conflict(e: &kube::Error) -> bool {
    matches!(e, kube::Error::Api(ae) if ae.code == 409)
}

/// Converge one dependent instance: fetch the discriminator-selected observed
/// object, diff, then create or replace as needed.
///
/// Updates carry the observed resourceVersion, so a concurrent external
/// mutation surfaces as a 409. On conflict the whole fetch/diff/write step is
/// repeated against fresh observed state; a write derived from a stale read
/// is never retried as-is. Attempts are bounded by `max_conflict_retries`.
pub async fn apply<K>(
    api: &dyn ObjectOps<K>,
    desired: &K,
    owner_name: &str,
    discriminator: Discriminator,
    max_conflict_retries: u32,
) -> Result<ApplyOutcome, ReconcileErr>
where
    K: Resource + Clone + Serialize + Send + Sync,
{
    let selector = discriminator.selector(owner_name);
    let mut conflicts: u32 = 0;
    loop {
        let candidates = api
            .list_labeled(&selector)
            .await
            .map_err(ReconcileErr::Transport)?;
        let observed = candidates.into_iter().find(|c| {
            c.meta()
                .labels
                .as_ref()
                .map(|l| discriminator.matches(owner_name, l))
                .unwrap_or(false)
        });

        let result = match observed {
            None => api.create(desired).await.map(|_| ApplyOutcome::Created),
            Some(observed) => {
                if !needs_update(desired, &observed) {
                    debug!(%selector, "observed matches desired; no write");
                    return Ok(ApplyOutcome::Unchanged);
                }
                let mut next = desired.clone();
                next.meta_mut().resource_version =
                    observed.meta().resource_version.clone();
                api.replace(&observed.name_any(), &next)
                    .await
                    .map(|_| ApplyOutcome::Updated)
            }
        };

        match result {
            Ok(outcome) => return Ok(outcome),
            Err(e) if is_conflict(&e) => {
                conflicts += 1;
                if conflicts > max_conflict_retries {
                    return Err(ReconcileErr::Conflict {
                        attempts: conflicts,
                    });
                }
                warn!(%selector, conflicts, "write conflict; re-fetching observed state");
            }
            Err(e) => return Err(ReconcileErr::Transport(e)),
        }
    }
}
