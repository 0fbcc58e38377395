use std::time::Duration;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::{
    Client,
    api::{Api, DeleteParams, ListParams},
};

// DNS-1123 safe numeric suffix for unique names
const DIGITS: [char; 10] =
    ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];

pub fn uniq(prefix: &str) -> String {
    format!("{prefix}-{}", nanoid::nanoid!(6, &DIGITS))
}

pub fn owner_selector(name: &str) -> String {
    format!(
        "app.kubernetes.io/name=apicurio-registry,app.kubernetes.io/instance={name}"
    )
}

pub async fn wait_for_labeled<F>(
    client: Client,
    ns: &str,
    selector: &str,
    attempts: u32,
    mut check: F,
) -> bool
where
    F: FnMut(&[Deployment], &[Service]) -> bool,
{
    let dep_api: Api<Deployment> = Api::namespaced(client.clone(), ns);
    let svc_api: Api<Service> = Api::namespaced(client, ns);
    let lp = ListParams::default().labels(selector);
    for _ in 0..attempts {
        let deps = dep_api
            .list(&lp)
            .await
            .map(|l| l.items)
            .unwrap_or_default();
        let svcs = svc_api
            .list(&lp)
            .await
            .map(|l| l.items)
            .unwrap_or_default();
        if check(&deps, &svcs) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(1000)).await;
    }
    false
}

pub async fn cleanup_children(client: Client, ns: &str, name: &str) {
    let dep_api: Api<Deployment> = Api::namespaced(client.clone(), ns);
    let svc_api: Api<Service> = Api::namespaced(client, ns);
    let lp = ListParams::default().labels(&owner_selector(name));
    if let Ok(list) = dep_api.list(&lp).await {
        for d in list {
            if let Some(n) = d.metadata.name {
                let _ = dep_api.delete(&n, &DeleteParams::default()).await;
            }
        }
    }
    if let Ok(list) = svc_api.list(&lp).await {
        for s in list {
            if let Some(n) = s.metadata.name {
                let _ = svc_api.delete(&n, &DeleteParams::default()).await;
            }
        }
    }
}
