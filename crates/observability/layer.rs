use super::config::ServiceContext;
use super::notifier::{AlertDispatcher, AlertEvent};
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

/// Forwards events at or above `min_level` to the alert dispatcher.
pub(crate) struct AlertLayer {
    dispatcher: AlertDispatcher,
    service_context: ServiceContext,
    min_level: Level,
}

impl AlertLayer {
    pub(crate) fn new(
        dispatcher: AlertDispatcher,
        service_context: ServiceContext,
        min_level: Level,
    ) -> Self {
        Self {
            dispatcher,
            service_context,
            min_level,
        }
    }
}

#[derive(Default)]
struct RedactingVisitor {
    values: BTreeMap<String, String>,
}

impl RedactingVisitor {
    fn insert(&mut self, field: &Field, value: String) {
        let name = field.name();
        self.values.insert(name.to_string(), redact(name, value));
    }
}

impl Visit for RedactingVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.insert(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, value.to_string());
    }
}

impl<S> Layer<S> for AlertLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if *metadata.level() > self.min_level {
            return;
        }
        // Failures of the alert pipeline itself must not loop back into it.
        if metadata.target().starts_with(module_path!().trim_end_matches("::layer")) {
            return;
        }

        let mut visitor = RedactingVisitor::default();
        event.record(&mut visitor);
        let message = visitor
            .values
            .remove("message")
            .map(|raw| unquote(&raw));

        let spans = ctx
            .event_span(event)
            .map(|span| {
                span.scope()
                    .from_root()
                    .map(|s| s.metadata().name().to_string())
                    .collect()
            })
            .unwrap_or_default();

        self.dispatcher.dispatch(AlertEvent {
            level: *metadata.level(),
            timestamp: Utc::now(),
            service_name: self.service_context.service_name.clone(),
            environment: self.service_context.environment.clone(),
            component: self.service_context.component.clone(),
            target: metadata.target().to_string(),
            message,
            fields: visitor.values,
            spans,
        });
    }
}

fn unquote(input: &str) -> String {
    let trimmed = input.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(trimmed)
        .to_string()
}

pub(crate) fn redact(field_name: &str, value: String) -> String {
    const SENSITIVE: [&str; 10] = [
        "secret",
        "password",
        "token",
        "authorization",
        "signature",
        "webhook_url",
        "email",
        "phone",
        "address",
        "payload",
    ];

    let field = field_name.to_ascii_lowercase();
    if SENSITIVE.iter().any(|needle| field.contains(needle)) {
        "[REDACTED]".to_string()
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_pii_and_secrets_are_redacted() {
        for field in [
            "customer_email",
            "customer_phone",
            "shipping_address",
            "stripe_signature",
            "webhook_secret",
            "jwt_token",
            "payload",
        ] {
            assert_eq!(redact(field, "value".to_string()), "[REDACTED]", "{field}");
        }
    }

    #[test]
    fn operational_identifiers_are_kept() {
        assert_eq!(redact("stripe_session_id", "cs_1".to_string()), "cs_1");
        assert_eq!(redact("order_id", "42".to_string()), "42");
        assert_eq!(redact("anomaly", "unmatched_session".to_string()), "unmatched_session");
    }

    #[test]
    fn debug_quotes_are_stripped_from_messages() {
        assert_eq!(unquote("\"hello\""), "hello");
        assert_eq!(unquote("plain"), "plain");
        assert_eq!(unquote("\""), "\"");
    }
}
