use crate::config::{
    config_model::{AdminSecret, BackendServer, Database, Storefront, Stripe},
    stage::Stage,
};
use anyhow::{Context, Result};
use gallery::payments::stripe_client::DEFAULT_WEBHOOK_TOLERANCE_SECONDS;

use super::config_model::DotEnvyConfig;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let backend_server = BackendServer {
        port: required("SERVER_PORT_BACKEND")?
            .parse()
            .context("SERVER_PORT_BACKEND is invalid")?,
        body_limit: required("SERVER_BODY_LIMIT")?
            .parse()
            .context("SERVER_BODY_LIMIT is invalid")?,
        timeout: required("SERVER_TIMEOUT")?
            .parse()
            .context("SERVER_TIMEOUT is invalid")?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
    };

    let stripe = load_stripe()?;

    let storefront = Storefront {
        base_url: required("STOREFRONT_BASE_URL")?,
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        stripe,
        storefront,
    })
}

fn load_stripe() -> Result<Stripe> {
    dotenvy::dotenv().ok();

    Ok(Stripe {
        secret_key: required("STRIPE_SECRET_KEY")?,
        webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
        currency: std::env::var("STRIPE_CURRENCY")
            .map(|value| value.trim().to_ascii_lowercase())
            .unwrap_or_else(|_| "eur".to_string()),
        webhook_tolerance_seconds: optional_parsed(
            "STRIPE_WEBHOOK_TOLERANCE_SECONDS",
            DEFAULT_WEBHOOK_TOLERANCE_SECONDS,
        )?,
    })
}

pub fn get_stage() -> Stage {
    dotenvy::dotenv().ok();

    let stage_str = std::env::var("STAGE").unwrap_or("".to_string());
    Stage::try_from(&stage_str).unwrap_or_default()
}

pub fn get_admin_secret() -> Result<AdminSecret> {
    dotenvy::dotenv().ok();

    Ok(AdminSecret {
        secret: required("JWT_ADMIN_SECRET")?,
        token_ttl_hours: optional_parsed("JWT_ADMIN_TTL_HOURS", 24 * 7)?,
    })
}

pub fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{key} is invalid"))
}

pub fn optional_parsed<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} is invalid")),
        _ => Ok(default),
    }
}
