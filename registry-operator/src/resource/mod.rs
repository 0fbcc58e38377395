pub mod app;
pub mod console;
pub mod datasource;
pub mod discriminator;
pub mod env;
pub mod factory;
pub mod locate;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;

use crate::config::OperatorConfig;
use crate::crd::registry::Registry;
use discriminator::Discriminator;

/// A computed target manifest for one managed child.
#[derive(Clone, Debug)]
pub enum DesiredResource {
    Deployment(Deployment),
    Service(Service),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Deployment,
    Service,
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetKind::Deployment => write!(f, "Deployment"),
            TargetKind::Service => write!(f, "Service"),
        }
    }
}

/// Pure desired-state function: owner snapshot in, target manifest out.
pub type DesiredFn =
    fn(&Registry, &OperatorConfig) -> Result<DesiredResource, ComputationError>;

/// One registration entry: a dependent kind the controller manages.
/// Created at startup, immutable afterwards.
#[derive(Debug)]
pub struct DependentSpec {
    pub id: &'static str,
    pub kind: TargetKind,
    pub discriminator: Discriminator,
    /// Condition type written to owner status for this kind.
    pub condition_type: &'static str,
    pub desired: DesiredFn,
}

/// Fatal registration-time problem; the process refuses to start reconciling.
#[derive(thiserror::Error, Debug)]
pub enum ConfigurationError {
    #[error(
        "registrations {first} and {second} share discriminator {discriminator} for kind {kind}"
    )]
    DiscriminatorCollision {
        first: &'static str,
        second: &'static str,
        kind: TargetKind,
        discriminator: Discriminator,
    },
}

/// Computation failed for one kind in one cycle. No write is attempted and
/// the failure is surfaced on the owner status; it is not retried on a timer.
#[derive(thiserror::Error, Debug)]
pub enum ComputationError {
    #[error("container {container} not found in Deployment {namespace}/{name}")]
    ContainerNotFound {
        container: String,
        namespace: String,
        name: String,
    },
}

/// The immutable registration table.
#[derive(Debug)]
pub struct Registrations {
    entries: Vec<DependentSpec>,
}

impl Registrations {
    /// Validate and freeze a registration set. Two entries of the same kind
    /// with the same discriminator would race over one live object, so that
    /// is rejected here rather than detected mid-reconcile.
    pub fn new(entries: Vec<DependentSpec>) -> Result<Self, ConfigurationError> {
        for (i, a) in entries.iter().enumerate() {
            for b in entries.iter().skip(i + 1) {
                if a.kind == b.kind && a.discriminator == b.discriminator {
                    return Err(ConfigurationError::DiscriminatorCollision {
                        first: a.id,
                        second: b.id,
                        kind: a.kind,
                        discriminator: a.discriminator,
                    });
                }
            }
        }
        Ok(Self { entries })
    }

    /// The built-in table: app and console workloads, each a Deployment plus
    /// a Service.
    pub fn builtin() -> Result<Self, ConfigurationError> {
        Self::new(vec![
            DependentSpec {
                id: "app-deployment",
                kind: TargetKind::Deployment,
                discriminator: Discriminator::app(),
                condition_type: "AppDeploymentReady",
                desired: app::desired_deployment,
            },
            DependentSpec {
                id: "app-service",
                kind: TargetKind::Service,
                discriminator: Discriminator::app(),
                condition_type: "AppServiceReady",
                desired: app::desired_service,
            },
            DependentSpec {
                id: "console-deployment",
                kind: TargetKind::Deployment,
                discriminator: Discriminator::console(),
                condition_type: "ConsoleDeploymentReady",
                desired: console::desired_deployment,
            },
            DependentSpec {
                id: "console-service",
                kind: TargetKind::Service,
                discriminator: Discriminator::console(),
                condition_type: "ConsoleServiceReady",
                desired: console::desired_service,
            },
        ])
    }

    pub fn entries(&self) -> &[DependentSpec] {
        &self.entries
    }

    /// Components with at least one registration of the given kind. Used by
    /// pruning to tell a managed child from one whose registration was
    /// removed.
    pub fn registered_components(&self, kind: TargetKind) -> Vec<&'static str> {
        let mut out: Vec<&'static str> = self
            .entries
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.discriminator.component())
            .collect();
        out.dedup();
        out
    }
}
