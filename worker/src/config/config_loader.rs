use anyhow::{Result, ensure};
use backend::config::{
    config_loader::{optional_parsed, required},
    config_model::{Database, Storefront},
};

use super::config_model::{DotEnvyConfig, ReconciliationConfig, StripeApi};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let database = Database {
        url: required("DATABASE_URL")?,
    };

    let stripe = load_stripe_api()?;

    // Only session creation uses the redirect URLs, which the worker never does.
    let storefront = Storefront {
        base_url: std::env::var("STOREFRONT_BASE_URL").unwrap_or_default(),
    };

    Ok(DotEnvyConfig {
        database,
        stripe,
        storefront,
        reconciliation: load_reconciliation()?,
    })
}

pub fn load_stripe_api() -> Result<StripeApi> {
    Ok(StripeApi {
        secret_key: required("STRIPE_SECRET_KEY")?,
    })
}

pub fn load_reconciliation() -> Result<ReconciliationConfig> {
    let defaults = ReconciliationConfig::default();

    let interval_seconds: u64 =
        optional_parsed("RECONCILE_INTERVAL_SECONDS", defaults.interval.as_secs())?;
    let stale_after_minutes: i64 = optional_parsed(
        "RECONCILE_STALE_AFTER_MINUTES",
        defaults.stale_after.num_minutes(),
    )?;
    let batch_size: i64 = optional_parsed("RECONCILE_BATCH_SIZE", defaults.batch_size)?;

    ensure!(interval_seconds > 0, "RECONCILE_INTERVAL_SECONDS must be positive");
    ensure!(stale_after_minutes >= 0, "RECONCILE_STALE_AFTER_MINUTES must not be negative");
    ensure!(batch_size > 0, "RECONCILE_BATCH_SIZE must be positive");

    Ok(ReconciliationConfig {
        interval: std::time::Duration::from_secs(interval_seconds),
        stale_after: chrono::Duration::minutes(stale_after_minutes),
        batch_size,
    })
}
