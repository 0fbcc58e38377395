use k8s_openapi::api::core::v1::EnvVar;
use kube::ResourceExt;

use crate::config::OperatorConfig;
use crate::crd::registry::Registry;

use super::app::to_env_vars;
use super::discriminator::Discriminator;
use super::env::{merge, simple};
use super::factory::{
    self, APP_HTTP_PORT, CONSOLE_CONTAINER_NAME, CONSOLE_HTTP_PORT,
};
use super::{ComputationError, DesiredResource, locate};

/// Defaults for the console workload. REGISTRY_API_URL is computed per owner
/// so the console finds its backend through the app Service.
fn console_default_env(owner: &Registry) -> Vec<EnvVar> {
    let api_url = format!(
        "http://{}:{}/apis/registry/v3",
        factory::service_name(&owner.name_any(), Discriminator::app().component()),
        APP_HTTP_PORT
    );
    vec![simple("REGISTRY_API_URL", &api_url)]
}

pub fn desired_deployment(
    owner: &Registry,
    cfg: &OperatorConfig,
) -> Result<DesiredResource, ComputationError> {
    let console = owner.spec.console.as_ref();
    let image = console
        .and_then(|c| c.image.clone())
        .unwrap_or_else(|| cfg.console_image.clone());
    let replicas = console.and_then(|c| c.replicas).unwrap_or(1);

    let mut dep = factory::deployment_skeleton(
        owner,
        Discriminator::console(),
        CONSOLE_CONTAINER_NAME,
        image,
        CONSOLE_HTTP_PORT,
        replicas,
        None,
    );

    let user = console.map(|c| to_env_vars(&c.env)).unwrap_or_default();
    let merged = merge(user, console_default_env(owner));
    let container =
        locate::container_named_mut(&mut dep, CONSOLE_CONTAINER_NAME)?;
    container.env = Some(merged);
    Ok(DesiredResource::Deployment(dep))
}

pub fn desired_service(
    owner: &Registry,
    _cfg: &OperatorConfig,
) -> Result<DesiredResource, ComputationError> {
    Ok(DesiredResource::Service(factory::service_skeleton(
        owner,
        Discriminator::console(),
        CONSOLE_HTTP_PORT,
    )))
}
