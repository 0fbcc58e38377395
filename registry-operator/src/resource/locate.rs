use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Container;

use super::ComputationError;

/// Find the named container in a rendered Deployment's pod template.
///
/// Every desired-state function is expected to produce the container it later
/// mutates, so absence is an invariant violation: the cycle fails without
/// writing anything, rather than silently rendering a partial manifest.
pub fn container_named_mut<'a>(
    deployment: &'a mut Deployment,
    name: &str,
) -> Result<&'a mut Container, ComputationError> {
    let namespace = deployment
        .metadata
        .namespace
        .clone()
        .unwrap_or_default();
    let dep_name = deployment.metadata.name.clone().unwrap_or_default();
    deployment
        .spec
        .as_mut()
        .and_then(|s| s.template.spec.as_mut())
        .map(|pod| pod.containers.as_mut_slice())
        .unwrap_or(&mut [])
        .iter_mut()
        .find(|c| c.name == name)
        .ok_or(ComputationError::ContainerNotFound {
            container: name.to_string(),
            namespace,
            name: dep_name,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::DeploymentSpec;
    use k8s_openapi::api::core::v1::{PodSpec, PodTemplateSpec};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn deployment_with(containers: &[&str]) -> Deployment {
        Deployment {
            metadata: ObjectMeta {
                name: Some("reg-1-app".into()),
                namespace: Some("default".into()),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                template: PodTemplateSpec {
                    spec: Some(PodSpec {
                        containers: containers
                            .iter()
                            .map(|n| Container {
                                name: n.to_string(),
                                ..Default::default()
                            })
                            .collect(),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn finds_exact_name() {
        let mut dep = deployment_with(&["x", "y"]);
        let c = container_named_mut(&mut dep, "y").expect("container y");
        assert_eq!(c.name, "y");
    }

    #[test]
    fn missing_container_identifies_name_and_deployment() {
        let mut dep = deployment_with(&["x", "y"]);
        let err = container_named_mut(&mut dep, "z").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("container z"), "{msg}");
        assert!(msg.contains("default/reg-1-app"), "{msg}");
    }

    #[test]
    fn empty_pod_spec_is_not_found() {
        let mut dep = Deployment::default();
        assert!(container_named_mut(&mut dep, "x").is_err());
    }
}
