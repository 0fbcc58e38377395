use serde::Serialize;
use serde_json::{Value, json};

/// Decide whether the observed object materially differs from the desired one.
///
/// Comparison is structural over the fields the desired manifest declares:
/// every field present in the desired JSON must match the observed value,
/// with arrays compared positionally and in full length (env ordering is part
/// of the contract). Orchestrator-managed fields (version token, uid,
/// timestamps, status) are excluded on both sides, and server-side defaulting
/// of fields the desired manifest leaves unset does not count as drift.
pub fn needs_update<K: Serialize>(desired: &K, observed: &K) -> bool {
    let d = normalize(to_value(desired));
    let o = normalize(to_value(observed));
    !subset_eq(&d, &o)
}

fn to_value<K: Serialize>(obj: &K) -> Value {
    serde_json::to_value(obj).unwrap_or_else(|_| json!({}))
}

fn normalize(mut v: Value) -> Value {
    if let Value::Object(ref mut root) = v {
        root.remove("status");
        if let Some(Value::Object(meta)) = root.get_mut("metadata") {
            meta.remove("resourceVersion");
            meta.remove("uid");
            meta.remove("creationTimestamp");
            meta.remove("generation");
            meta.remove("managedFields");
            meta.remove("annotations");
            meta.remove("finalizers");
        }
    }
    v
}

/// True when every field `desired` declares is present and equal in
/// `observed`. Nulls in the desired tree are treated as "unset".
fn subset_eq(desired: &Value, observed: &Value) -> bool {
    match (desired, observed) {
        (Value::Null, _) => true,
        (Value::Object(d), Value::Object(o)) => {
            d.iter().all(|(k, dv)| match o.get(k) {
                Some(ov) => subset_eq(dv, ov),
                None => dv.is_null(),
            })
        }
        (Value::Array(d), Value::Array(o)) => {
            d.len() == o.len()
                && d.iter().zip(o.iter()).all(|(dv, ov)| subset_eq(dv, ov))
        }
        (d, o) => d == o,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::Deployment;

    fn deployment(v: Value) -> Deployment {
        serde_json::from_value(v).expect("deployment json")
    }

    fn desired_sample() -> Deployment {
        deployment(json!({
            "metadata": {"name": "reg-1-app", "namespace": "default",
                         "labels": {"app.kubernetes.io/component": "app"}},
            "spec": {
                "replicas": 1,
                "selector": {"matchLabels": {"app.kubernetes.io/component": "app"}},
                "template": {"spec": {"containers": [
                    {"name": "registry-app",
                     "env": [{"name": "QUARKUS_PROFILE", "value": "prod"}]}
                ]}}
            }
        }))
    }

    #[test]
    fn server_managed_fields_are_ignored() {
        let desired = desired_sample();
        let mut observed = desired.clone();
        observed.metadata.resource_version = Some("42".into());
        observed.metadata.uid = Some("uid-observed".into());
        observed.status = Some(Default::default());
        assert!(!needs_update(&desired, &observed));
    }

    #[test]
    fn server_side_defaulting_is_not_drift() {
        let desired = desired_sample();
        let mut observed = desired.clone();
        // The API server fills in strategy, revisionHistoryLimit, etc.
        if let Some(spec) = observed.spec.as_mut() {
            spec.revision_history_limit = Some(10);
        }
        assert!(!needs_update(&desired, &observed));
    }

    #[test]
    fn changed_env_value_is_drift() {
        let desired = desired_sample();
        let mut observed = desired.clone();
        if let Some(v) = observed
            .spec
            .as_mut()
            .and_then(|s| s.template.spec.as_mut())
            .and_then(|p| p.containers.first_mut())
            .and_then(|c| c.env.as_mut())
            .and_then(|e| e.first_mut())
        {
            v.value = Some("dev".into());
        }
        assert!(needs_update(&desired, &observed));
    }

    #[test]
    fn env_reordering_or_removal_is_drift() {
        let desired = deployment(json!({
            "metadata": {"name": "d"},
            "spec": {"template": {"spec": {"containers": [
                {"name": "c", "env": [
                    {"name": "A", "value": "1"},
                    {"name": "B", "value": "2"}
                ]}
            ]}}}
        }));
        let observed = deployment(json!({
            "metadata": {"name": "d"},
            "spec": {"template": {"spec": {"containers": [
                {"name": "c", "env": [
                    {"name": "B", "value": "2"},
                    {"name": "A", "value": "1"}
                ]}
            ]}}}
        }));
        assert!(needs_update(&desired, &observed));

        let truncated = deployment(json!({
            "metadata": {"name": "d"},
            "spec": {"template": {"spec": {"containers": [
                {"name": "c", "env": [{"name": "A", "value": "1"}]}
            ]}}}
        }));
        assert!(needs_update(&desired, &truncated));
    }
}
