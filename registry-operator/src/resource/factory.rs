use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, PodSpec, PodTemplateSpec, ResourceRequirements,
    Service, ServicePort, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{
    LabelSelector, ObjectMeta, OwnerReference,
};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::{Resource, ResourceExt};

use crate::crd::registry::{Registry, ResourcesSpec};
use super::discriminator::Discriminator;

pub const LABEL_NAME: &str = "app.kubernetes.io/name";
pub const LABEL_INSTANCE: &str = "app.kubernetes.io/instance";
pub const LABEL_COMPONENT: &str = "app.kubernetes.io/component";
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

pub const APP_NAME: &str = "apicurio-registry";
pub const MANAGED_BY: &str = "registry-operator";

pub const APP_CONTAINER_NAME: &str = "registry-app";
pub const CONSOLE_CONTAINER_NAME: &str = "registry-console";

pub const APP_HTTP_PORT: i32 = 8080;
pub const CONSOLE_HTTP_PORT: i32 = 8080;

pub fn child_name(owner_name: &str, component: &str) -> String {
    format!("{owner_name}-{component}")
}

pub fn service_name(owner_name: &str, component: &str) -> String {
    format!("{owner_name}-{component}-svc")
}

pub fn base_labels(
    owner_name: &str,
    discriminator: Discriminator,
) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_NAME.to_string(), APP_NAME.to_string()),
        (LABEL_INSTANCE.to_string(), owner_name.to_string()),
        (
            LABEL_COMPONENT.to_string(),
            discriminator.component().to_string(),
        ),
        (LABEL_MANAGED_BY.to_string(), MANAGED_BY.to_string()),
    ])
}

fn owner_refs(owner: &Registry) -> Option<Vec<OwnerReference>> {
    owner.meta().uid.as_deref().map(|uid| {
        vec![OwnerReference {
            api_version: Registry::api_version(&()).into_owned(),
            kind: Registry::kind(&()).into_owned(),
            name: owner.name_any(),
            uid: uid.to_string(),
            controller: Some(true),
            block_owner_deletion: None,
        }]
    })
}

fn object_meta(
    owner: &Registry,
    name: String,
    discriminator: Discriminator,
) -> ObjectMeta {
    ObjectMeta {
        name: Some(name),
        namespace: owner.namespace(),
        labels: Some(base_labels(&owner.name_any(), discriminator)),
        owner_references: owner_refs(owner),
        ..Default::default()
    }
}

fn to_requirements(spec: Option<&ResourcesSpec>) -> Option<ResourceRequirements> {
    let spec = spec?;
    if spec.requests.is_empty() && spec.limits.is_empty() {
        return None;
    }
    let quantities = |m: &BTreeMap<String, String>| {
        (!m.is_empty()).then(|| {
            m.iter()
                .map(|(k, v)| (k.clone(), Quantity(v.clone())))
                .collect::<BTreeMap<_, _>>()
        })
    };
    Some(ResourceRequirements {
        requests: quantities(&spec.requests),
        limits: quantities(&spec.limits),
        ..Default::default()
    })
}

/// Skeleton Deployment for one workload role: identity, discriminator labels,
/// owner reference and a single named container. The desired-state function
/// fills the container env afterwards.
pub fn deployment_skeleton(
    owner: &Registry,
    discriminator: Discriminator,
    container_name: &str,
    image: String,
    port: i32,
    replicas: i32,
    resources: Option<&ResourcesSpec>,
) -> Deployment {
    let owner_name = owner.name_any();
    let labels = base_labels(&owner_name, discriminator);
    // The selector intentionally excludes managed-by so existing pods keep
    // matching if the operator is renamed.
    let selector_labels = BTreeMap::from([
        (LABEL_NAME.to_string(), APP_NAME.to_string()),
        (LABEL_INSTANCE.to_string(), owner_name.clone()),
        (
            LABEL_COMPONENT.to_string(),
            discriminator.component().to_string(),
        ),
    ]);
    Deployment {
        metadata: object_meta(
            owner,
            child_name(&owner_name, discriminator.component()),
            discriminator,
        ),
        spec: Some(DeploymentSpec {
            replicas: Some(replicas),
            selector: LabelSelector {
                match_labels: Some(selector_labels),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: container_name.to_string(),
                        image: Some(image),
                        ports: Some(vec![ContainerPort {
                            container_port: port,
                            name: Some("http".to_string()),
                            ..Default::default()
                        }]),
                        resources: to_requirements(resources),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Skeleton Service exposing one workload role's http port.
pub fn service_skeleton(
    owner: &Registry,
    discriminator: Discriminator,
    port: i32,
) -> Service {
    let owner_name = owner.name_any();
    let selector = BTreeMap::from([
        (LABEL_NAME.to_string(), APP_NAME.to_string()),
        (LABEL_INSTANCE.to_string(), owner_name.clone()),
        (
            LABEL_COMPONENT.to_string(),
            discriminator.component().to_string(),
        ),
    ]);
    Service {
        metadata: object_meta(
            owner,
            service_name(&owner_name, discriminator.component()),
            discriminator,
        ),
        spec: Some(ServiceSpec {
            selector: Some(selector),
            ports: Some(vec![ServicePort {
                name: Some("http".to_string()),
                port,
                target_port: Some(IntOrString::Int(port)),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}
