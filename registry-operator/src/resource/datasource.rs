use k8s_openapi::api::core::v1::EnvVar;

use crate::crd::registry::DatasourceSpec;
use super::env::simple;

const DEFAULT_SQL_KIND: &str = "h2";
const DEFAULT_URL: &str = "jdbc:h2:mem:registry_db";
const DEFAULT_USERNAME: &str = "sa";
const DEFAULT_PASSWORD: &str = "sa";
const DEFAULT_INITIAL_SIZE: &str = "20";
const DEFAULT_MIN_SIZE: &str = "20";
const DEFAULT_MAX_SIZE: &str = "100";

/// Translate declared datasource settings into the connection-pool property
/// map the application's storage layer reads at startup.
///
/// The last four entries are mandatory regardless of user input. Auto-commit
/// must stay off and isolation at read-committed so multi-step writes roll
/// back as a unit.
pub fn pool_properties(ds: &DatasourceSpec) -> Vec<(String, String)> {
    let mut props: Vec<(String, String)> = vec![
        (
            "maxSize".into(),
            ds.max_size.clone().unwrap_or_else(|| DEFAULT_MAX_SIZE.into()),
        ),
        (
            "minSize".into(),
            ds.min_size.clone().unwrap_or_else(|| DEFAULT_MIN_SIZE.into()),
        ),
        (
            "initialSize".into(),
            ds.initial_size
                .clone()
                .unwrap_or_else(|| DEFAULT_INITIAL_SIZE.into()),
        ),
        (
            "jdbcUrl".into(),
            ds.url.clone().unwrap_or_else(|| DEFAULT_URL.into()),
        ),
        (
            "principal".into(),
            ds.username
                .clone()
                .unwrap_or_else(|| DEFAULT_USERNAME.into()),
        ),
        (
            "credential".into(),
            ds.password
                .clone()
                .unwrap_or_else(|| DEFAULT_PASSWORD.into()),
        ),
    ];
    props.push(("autoCommit".into(), "false".into()));
    props.push(("jdbcTransactionIsolation".into(), "READ_COMMITTED".into()));
    props.push(("transactionRequirement".into(), "WARN".into()));
    props.push(("flushOnClose".into(), "true".into()));
    props
}

/// Environment entries wiring the app container to its SQL storage. Appended
/// to the platform defaults for the app workload, so a user-declared entry of
/// the same name still wins.
pub fn datasource_env(ds: &DatasourceSpec) -> Vec<EnvVar> {
    let mut vars = vec![
        simple("APICURIO_STORAGE_KIND", "sql"),
        simple(
            "APICURIO_STORAGE_SQL_KIND",
            ds.sql_kind.as_deref().unwrap_or(DEFAULT_SQL_KIND),
        ),
    ];
    if let Some(url) = &ds.url {
        vars.push(simple("APICURIO_DATASOURCE_URL", url));
    }
    if let Some(username) = &ds.username {
        vars.push(simple("APICURIO_DATASOURCE_USERNAME", username));
    }
    if let Some(password) = &ds.password {
        vars.push(simple("APICURIO_DATASOURCE_PASSWORD", password));
    }
    if let Some(v) = &ds.initial_size {
        vars.push(simple("APICURIO_DATASOURCE_JDBC_INITIAL_SIZE", v));
    }
    if let Some(v) = &ds.min_size {
        vars.push(simple("APICURIO_DATASOURCE_JDBC_MIN_SIZE", v));
    }
    if let Some(v) = &ds.max_size {
        vars.push(simple("APICURIO_DATASOURCE_JDBC_MAX_SIZE", v));
    }
    vars
}
