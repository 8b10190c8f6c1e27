use std::time::Duration;

use backend::config::config_model::{Database, Storefront};

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub database: Database,
    pub stripe: StripeApi,
    pub storefront: Storefront,
    pub reconciliation: ReconciliationConfig,
}

/// The worker only reads sessions, so webhook settings are not needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripeApi {
    pub secret_key: String,
}

/// How the stale checkout sweep is paced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationConfig {
    pub interval: Duration,
    /// Pending orders younger than this are left to their webhooks.
    pub stale_after: chrono::Duration,
    pub batch_size: i64,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            stale_after: chrono::Duration::minutes(60),
            batch_size: 50,
        }
    }
}
