use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Owner object for one registry installation. The controller derives every
/// managed child resource from this spec alone; it never writes the spec back.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[kube(
    group = "registry.apicur.io",
    version = "v1",
    kind = "Registry",
    plural = "registries",
    namespaced,
    status = "RegistryStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySpec {
    /// Backend (REST API) component configuration.
    pub app: Option<AppSpec>,
    /// Web console component configuration.
    pub console: Option<ConsoleSpec>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppSpec {
    /// User-declared environment entries, order significant. Entries with the
    /// same name as a platform default override that default.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvEntry>,
    /// Container image override.
    pub image: Option<String>,
    pub replicas: Option<i32>,
    pub resources: Option<ResourcesSpec>,
    /// SQL storage configuration; omitted means the in-memory default.
    pub datasource: Option<DatasourceSpec>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvEntry>,
    pub image: Option<String>,
    pub replicas: Option<i32>,
}

/// A declared name/value pair. Names are unique per component; the declared
/// order is preserved all the way into the rendered container.
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq, Eq)]
pub struct EnvEntry {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesSpec {
    /// Quantities keyed by resource name (e.g. "cpu", "memory").
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requests: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub limits: BTreeMap<String, String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct DatasourceSpec {
    /// Database kind ("postgresql", "mysql", "h2").
    pub sql_kind: Option<String>,
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub initial_size: Option<String>,
    pub min_size: Option<String>,
    pub max_size: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    /// One condition per registered dependent kind (e.g. AppDeploymentReady),
    /// reflecting the latest reconcile outcome for that kind.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq, Eq)]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(
        rename = "lastTransitionTime",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_transition_time: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}
