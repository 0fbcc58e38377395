use chrono::Utc;
use serde_json::{Value, json};

use crate::crd::registry::{Condition, ConditionStatus, RegistryStatus};

use super::ReconcileErr;
use super::apply::ApplyOutcome;

/// Condition for one dependent kind after a successful apply.
pub fn ready_condition(
    condition_type: &str,
    outcome: ApplyOutcome,
    now: &str,
) -> Condition {
    Condition {
        type_: condition_type.to_string(),
        status: ConditionStatus::True,
        reason: Some(outcome.reason().to_string()),
        message: Some(match outcome {
            ApplyOutcome::Unchanged => "Observed state matches desired state",
            ApplyOutcome::Created => "Resource created",
            ApplyOutcome::Updated => "Resource updated",
        }
        .to_string()),
        last_transition_time: Some(now.to_string()),
    }
}

/// Condition for one dependent kind after a failed cycle, carrying the error
/// taxonomy as the reason.
pub fn failed_condition(
    condition_type: &str,
    err: &ReconcileErr,
    now: &str,
) -> Condition {
    Condition {
        type_: condition_type.to_string(),
        status: ConditionStatus::False,
        reason: Some(err.reason().to_string()),
        message: Some(err.to_string()),
        last_transition_time: Some(now.to_string()),
    }
}

/// Assemble the status for this cycle, upserting conditions by type into the
/// previously observed set so kinds not touched this cycle keep their state.
pub fn build_status(
    previous: Option<&RegistryStatus>,
    generation: Option<i64>,
    incoming: Vec<Condition>,
) -> RegistryStatus {
    let mut conditions: Vec<Condition> = previous
        .and_then(|s| s.conditions.clone())
        .unwrap_or_default();
    for inc in incoming {
        if let Some(idx) =
            conditions.iter().position(|c| c.type_ == inc.type_)
        {
            conditions[idx] = inc;
        } else {
            conditions.push(inc);
        }
    }
    // Stable order reduces patch churn.
    conditions.sort_by(|a, b| a.type_.cmp(&b.type_));
    RegistryStatus {
        observed_generation: generation,
        last_updated: Some(Utc::now().to_rfc3339()),
        conditions: Some(conditions),
    }
}

/// Compare two status objects for material differences, ignoring the
/// timestamp-only fields that would otherwise patch on every cycle.
pub fn should_patch_status(
    current: Option<&RegistryStatus>,
    desired: &RegistryStatus,
) -> bool {
    match current {
        None => true,
        Some(cur) => normalize_status(cur) != normalize_status(desired),
    }
}

fn normalize_status(s: &RegistryStatus) -> Value {
    let mut v = serde_json::to_value(s).unwrap_or_else(|_| json!({}));
    if let Value::Object(ref mut map) = v {
        map.remove("lastUpdated");
        if let Some(Value::Array(conds)) = map.get_mut("conditions") {
            for c in conds.iter_mut() {
                if let Some(obj) = c.as_object_mut() {
                    obj.remove("lastTransitionTime");
                }
            }
        }
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cond(type_: &str, status: ConditionStatus) -> Condition {
        Condition {
            type_: type_.into(),
            status,
            reason: None,
            message: None,
            last_transition_time: Some("t0".into()),
        }
    }

    #[test]
    fn upsert_replaces_same_type_and_keeps_others() {
        let prev = RegistryStatus {
            observed_generation: Some(1),
            last_updated: None,
            conditions: Some(vec![
                cond("AppDeploymentReady", ConditionStatus::False),
                cond("AppServiceReady", ConditionStatus::True),
            ]),
        };
        let status = build_status(
            Some(&prev),
            Some(2),
            vec![cond("AppDeploymentReady", ConditionStatus::True)],
        );
        let conds = status.conditions.expect("conditions");
        assert_eq!(conds.len(), 2);
        assert!(conds.iter().all(|c| c.status == ConditionStatus::True));
    }

    #[test]
    fn timestamp_only_change_does_not_patch() {
        let a = RegistryStatus {
            observed_generation: Some(2),
            last_updated: Some("2026-01-01T00:00:00Z".into()),
            conditions: Some(vec![cond(
                "AppDeploymentReady",
                ConditionStatus::True,
            )]),
        };
        let mut b = a.clone();
        b.last_updated = Some("2026-01-01T00:05:00Z".into());
        if let Some(conds) = b.conditions.as_mut() {
            conds[0].last_transition_time = Some("t1".into());
        }
        assert!(!should_patch_status(Some(&a), &b));
    }

    #[test]
    fn status_change_patches() {
        let a = RegistryStatus {
            observed_generation: Some(2),
            last_updated: None,
            conditions: Some(vec![cond(
                "AppDeploymentReady",
                ConditionStatus::True,
            )]),
        };
        let mut b = a.clone();
        if let Some(conds) = b.conditions.as_mut() {
            conds[0].status = ConditionStatus::False;
        }
        assert!(should_patch_status(Some(&a), &b));
        assert!(should_patch_status(None, &a));
    }
}
