use std::env;
use tracing::Level;
use url::Url;

#[derive(Debug, Clone)]
pub(crate) struct ServiceContext {
    pub(crate) service_name: String,
    pub(crate) environment: String,
    pub(crate) component: String,
}

#[derive(Debug, Clone)]
pub(crate) struct AlertSinkConfig {
    pub(crate) webhook_url: Url,
    pub(crate) min_level: Level,
}

#[derive(Debug, Clone)]
pub(crate) struct ObservabilityConfig {
    pub(crate) service_context: ServiceContext,
    pub(crate) alerts: Option<AlertSinkConfig>,
    /// Collected while parsing; logged once tracing is up.
    pub(crate) warnings: Vec<String>,
}

impl ObservabilityConfig {
    pub(crate) fn from_env(component: &str) -> Self {
        Self::from_lookup(component, |key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(component: &str, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let component = component.trim().to_string();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let service_context = ServiceContext {
            service_name: non_empty("SERVICE_NAME").unwrap_or_else(|| component.clone()),
            environment: non_empty("STAGE").unwrap_or_else(|| "unknown".to_string()),
            component,
        };

        let mut warnings = Vec::new();
        let alerts = alert_sink_from(&non_empty, &mut warnings);

        Self {
            service_context,
            alerts,
            warnings,
        }
    }
}

fn alert_sink_from(
    lookup: &impl Fn(&str) -> Option<String>,
    warnings: &mut Vec<String>,
) -> Option<AlertSinkConfig> {
    if lookup("ALERT_NOTIFY_ENABLED").and_then(|raw| parse_bool(&raw)) == Some(false) {
        return None;
    }

    let raw_url = lookup("ALERT_WEBHOOK_URL")?;
    let webhook_url = match Url::parse(raw_url.trim()) {
        Ok(url) => url,
        Err(err) => {
            // The URL embeds a token, so only the parse error is reported.
            warnings.push(format!(
                "ALERT_WEBHOOK_URL is set but invalid; alerts disabled (parse error: {err})"
            ));
            return None;
        }
    };

    let min_level = match lookup("ALERT_NOTIFY_LEVEL") {
        Some(raw) => parse_level(&raw).unwrap_or_else(|| {
            warnings.push(format!(
                "ALERT_NOTIFY_LEVEL is invalid (value: {raw}); defaulting to ERROR"
            ));
            Level::ERROR
        }),
        None => Level::ERROR,
    };

    Some(AlertSinkConfig {
        webhook_url,
        min_level,
    })
}

pub(crate) fn parse_level(input: &str) -> Option<Level> {
    match input.trim().to_ascii_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}
