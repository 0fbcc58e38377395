use envconfig::Envconfig;

/// Operator configuration, read once at startup and passed into the
/// controller context. Defaults:
///
/// | Env                               | Default                                         |
/// |-----------------------------------|-------------------------------------------------|
/// | REGISTRY_OPERATOR_APP_IMAGE       | quay.io/apicurio/apicurio-registry:3.0.6        |
/// | REGISTRY_OPERATOR_CONSOLE_IMAGE   | quay.io/apicurio/apicurio-registry-ui:3.0.6     |
/// | REGISTRY_OPERATOR_RESYNC_SECS     | 300                                             |
/// | REGISTRY_OPERATOR_CONFLICT_RETRIES| 3                                               |
/// | REGISTRY_OPERATOR_BACKOFF_BASE_MS | 500                                             |
/// | REGISTRY_OPERATOR_BACKOFF_CAP_SECS| 300                                             |
#[derive(Envconfig, Clone, Debug)]
pub struct OperatorConfig {
    #[envconfig(
        from = "REGISTRY_OPERATOR_APP_IMAGE",
        default = "quay.io/apicurio/apicurio-registry:3.0.6"
    )]
    pub app_image: String,

    #[envconfig(
        from = "REGISTRY_OPERATOR_CONSOLE_IMAGE",
        default = "quay.io/apicurio/apicurio-registry-ui:3.0.6"
    )]
    pub console_image: String,

    /// Periodic resync interval for otherwise idle owners.
    #[envconfig(from = "REGISTRY_OPERATOR_RESYNC_SECS", default = "300")]
    pub resync_secs: u64,

    /// Bounded in-cycle retries on a 409 write conflict before the cycle fails.
    #[envconfig(from = "REGISTRY_OPERATOR_CONFLICT_RETRIES", default = "3")]
    pub conflict_retries: u32,

    #[envconfig(from = "REGISTRY_OPERATOR_BACKOFF_BASE_MS", default = "500")]
    pub backoff_base_ms: u64,

    #[envconfig(from = "REGISTRY_OPERATOR_BACKOFF_CAP_SECS", default = "300")]
    pub backoff_cap_secs: u64,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            app_image: "quay.io/apicurio/apicurio-registry:3.0.6".into(),
            console_image: "quay.io/apicurio/apicurio-registry-ui:3.0.6".into(),
            resync_secs: 300,
            conflict_retries: 3,
            backoff_base_ms: 500,
            backoff_cap_secs: 300,
        }
    }
}
