use std::collections::BTreeMap;

use super::factory::{APP_NAME, LABEL_COMPONENT, LABEL_INSTANCE, LABEL_NAME};

/// Label-derived identity distinguishing multiple children of the same kind
/// under one owner. Two workload roles exist today: the backend ("app") and
/// the web console.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Discriminator {
    component: &'static str,
}

impl Discriminator {
    pub fn app() -> Self {
        Self { component: "app" }
    }

    pub fn console() -> Self {
        Self {
            component: "console",
        }
    }

    pub fn component(&self) -> &'static str {
        self.component
    }

    /// Label selector matching exactly the live objects this registration
    /// owns for the given owner.
    pub fn selector(&self, owner_name: &str) -> String {
        format!(
            "{LABEL_NAME}={APP_NAME},{LABEL_INSTANCE}={owner_name},{LABEL_COMPONENT}={}",
            self.component
        )
    }

    /// Pure, total match against an observed candidate's labels.
    pub fn matches(
        &self,
        owner_name: &str,
        labels: &BTreeMap<String, String>,
    ) -> bool {
        labels.get(LABEL_NAME).map(String::as_str) == Some(APP_NAME)
            && labels.get(LABEL_INSTANCE).map(String::as_str) == Some(owner_name)
            && labels.get(LABEL_COMPONENT).map(String::as_str)
                == Some(self.component)
    }
}

impl std::fmt::Display for Discriminator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{LABEL_COMPONENT}={}", self.component)
    }
}
