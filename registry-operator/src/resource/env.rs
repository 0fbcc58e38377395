use std::collections::HashSet;

use k8s_openapi::api::core::v1::EnvVar;

/// Merge user-declared environment entries with platform defaults.
///
/// User entries come first, in declared order; the first occurrence of a
/// duplicated name wins. Defaults follow in their registration order, skipped
/// when the name is already taken. A default never overwrites a user value.
///
/// The resulting order is part of the contract: diffing compares the full env
/// list structurally, so a stable order is what makes an unchanged owner a
/// no-op cycle.
pub fn merge(user: Vec<EnvVar>, defaults: Vec<EnvVar>) -> Vec<EnvVar> {
    let mut out: Vec<EnvVar> = Vec::with_capacity(user.len() + defaults.len());
    let mut seen: HashSet<String> = HashSet::new();
    for var in user.into_iter().chain(defaults) {
        if seen.insert(var.name.clone()) {
            out.push(var);
        }
    }
    out
}

/// Plain name/value pair, the shape every platform default has.
pub fn simple(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        ..Default::default()
    }
}
