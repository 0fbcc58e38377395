use k8s_openapi::api::core::v1::EnvVar;

use crate::config::OperatorConfig;
use crate::crd::registry::{EnvEntry, Registry};

use super::discriminator::Discriminator;
use super::env::{merge, simple};
use super::factory::{
    self, APP_CONTAINER_NAME, APP_HTTP_PORT,
};
use super::{ComputationError, DesiredResource, datasource, locate};

/// Platform defaults for the app workload. Literal and versioned: a user
/// entry of the same name wins, anything else is appended in this order.
pub const APP_DEFAULT_ENV: &[(&str, &str)] = &[
    ("QUARKUS_PROFILE", "prod"),
    ("APICURIO_CONFIG_CACHE_ENABLED", "true"),
    ("QUARKUS_HTTP_ACCESS_LOG_ENABLED", "true"),
    ("QUARKUS_HTTP_CORS_ORIGINS", "*"),
    ("APICURIO_REST_DELETION_GROUP_ENABLED", "true"),
    ("APICURIO_REST_DELETION_ARTIFACT_ENABLED", "true"),
    ("APICURIO_REST_DELETION_ARTIFACTVERSION_ENABLED", "true"),
    ("APICURIO_APIS_V2_DATE_FORMAT", "yyyy-MM-dd''T''HH:mm:ssZ"),
];

pub(super) fn to_env_vars(entries: &[EnvEntry]) -> Vec<EnvVar> {
    entries.iter().map(|e| simple(&e.name, &e.value)).collect()
}

/// Desired app Deployment. Pure over the owner snapshot: same input, same
/// manifest, byte for byte.
pub fn desired_deployment(
    owner: &Registry,
    cfg: &OperatorConfig,
) -> Result<DesiredResource, ComputationError> {
    let app = owner.spec.app.as_ref();
    let image = app
        .and_then(|a| a.image.clone())
        .unwrap_or_else(|| cfg.app_image.clone());
    let replicas = app.and_then(|a| a.replicas).unwrap_or(1);

    let mut dep = factory::deployment_skeleton(
        owner,
        Discriminator::app(),
        APP_CONTAINER_NAME,
        image,
        APP_HTTP_PORT,
        replicas,
        app.and_then(|a| a.resources.as_ref()),
    );

    // Absent app config means an empty user list; defaults still apply in full.
    let user = app.map(|a| to_env_vars(&a.env)).unwrap_or_default();
    let mut defaults: Vec<EnvVar> = APP_DEFAULT_ENV
        .iter()
        .map(|(n, v)| simple(n, v))
        .collect();
    if let Some(ds) = app.and_then(|a| a.datasource.as_ref()) {
        defaults.extend(datasource::datasource_env(ds));
    }

    let merged = merge(user, defaults);
    let container = locate::container_named_mut(&mut dep, APP_CONTAINER_NAME)?;
    container.env = Some(merged);
    Ok(DesiredResource::Deployment(dep))
}

pub fn desired_service(
    owner: &Registry,
    _cfg: &OperatorConfig,
) -> Result<DesiredResource, ComputationError> {
    Ok(DesiredResource::Service(factory::service_skeleton(
        owner,
        Discriminator::app(),
        APP_HTTP_PORT,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::registry::{AppSpec, DatasourceSpec, RegistrySpec};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn owner_with(app: Option<AppSpec>) -> Registry {
        let mut r = Registry::new(
            "reg-1",
            RegistrySpec {
                app,
                console: None,
            },
        );
        r.metadata = ObjectMeta {
            name: Some("reg-1".into()),
            namespace: Some("default".into()),
            uid: Some("uid-1".into()),
            ..Default::default()
        };
        r
    }

    fn env_of(desired: &DesiredResource) -> Vec<(String, String)> {
        let DesiredResource::Deployment(dep) = desired else {
            panic!("expected a Deployment");
        };
        dep.spec
            .as_ref()
            .and_then(|s| s.template.spec.as_ref())
            .and_then(|p| p.containers.first())
            .and_then(|c| c.env.as_ref())
            .map(|env| {
                env.iter()
                    .map(|v| {
                        (v.name.clone(), v.value.clone().unwrap_or_default())
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn absent_app_config_still_gets_full_defaults() {
        let owner = owner_with(None);
        let cfg = OperatorConfig::default();
        let desired = desired_deployment(&owner, &cfg).expect("desired");
        let env = env_of(&desired);
        assert_eq!(env.len(), APP_DEFAULT_ENV.len());
        assert_eq!(env[0], ("QUARKUS_PROFILE".into(), "prod".into()));
    }

    #[test]
    fn user_declared_entry_overrides_default_in_place() {
        let owner = owner_with(Some(AppSpec {
            env: vec![
                EnvEntry {
                    name: "MY_SETTING".into(),
                    value: "x".into(),
                },
                EnvEntry {
                    name: "QUARKUS_PROFILE".into(),
                    value: "dev".into(),
                },
            ],
            ..Default::default()
        }));
        let cfg = OperatorConfig::default();
        let env = env_of(&desired_deployment(&owner, &cfg).expect("desired"));
        assert_eq!(env[0], ("MY_SETTING".into(), "x".into()));
        assert_eq!(env[1], ("QUARKUS_PROFILE".into(), "dev".into()));
        // The shadowed default is dropped, not duplicated.
        assert_eq!(
            env.iter()
                .filter(|(n, _)| n == "QUARKUS_PROFILE")
                .count(),
            1
        );
        assert_eq!(env.len(), APP_DEFAULT_ENV.len() + 1);
    }

    #[test]
    fn computation_is_deterministic_including_order() {
        let owner = owner_with(Some(AppSpec {
            env: vec![EnvEntry {
                name: "B".into(),
                value: "2".into(),
            }],
            datasource: Some(DatasourceSpec {
                url: Some("jdbc:postgresql://db:5432/registry".into()),
                username: Some("registry".into()),
                ..Default::default()
            }),
            ..Default::default()
        }));
        let cfg = OperatorConfig::default();
        let a = desired_deployment(&owner, &cfg).expect("first");
        let b = desired_deployment(&owner, &cfg).expect("second");
        assert_eq!(
            serde_json::to_value(match &a {
                DesiredResource::Deployment(d) => d,
                _ => unreachable!(),
            })
            .unwrap(),
            serde_json::to_value(match &b {
                DesiredResource::Deployment(d) => d,
                _ => unreachable!(),
            })
            .unwrap()
        );
    }

    #[test]
    fn datasource_entries_follow_fixed_defaults() {
        let owner = owner_with(Some(AppSpec {
            datasource: Some(DatasourceSpec {
                sql_kind: Some("postgresql".into()),
                url: Some("jdbc:postgresql://db:5432/registry".into()),
                ..Default::default()
            }),
            ..Default::default()
        }));
        let cfg = OperatorConfig::default();
        let env = env_of(&desired_deployment(&owner, &cfg).expect("desired"));
        let names: Vec<&str> = env.iter().map(|(n, _)| n.as_str()).collect();
        let date_idx = names
            .iter()
            .position(|n| *n == "APICURIO_APIS_V2_DATE_FORMAT")
            .expect("fixed defaults present");
        let storage_idx = names
            .iter()
            .position(|n| *n == "APICURIO_STORAGE_KIND")
            .expect("datasource entries present");
        assert!(storage_idx > date_idx);
    }
}
