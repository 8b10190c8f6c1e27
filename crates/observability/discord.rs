use super::notifier::{AlertEvent, AlertSink};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use url::Url;

const DISCORD_CONTENT_LIMIT: usize = 2000;

pub(crate) struct DiscordAlertSink {
    webhook_url: Url,
    client: Client,
}

impl DiscordAlertSink {
    pub(crate) fn new(webhook_url: Url) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(3)).build()?;

        Ok(Self {
            webhook_url,
            client,
        })
    }
}

/// Anomalies and security events get their own headline so operators can triage from the channel.
pub(crate) fn format_content(event: &AlertEvent) -> String {
    let mut lines = Vec::new();

    let headline = event
        .fields
        .get("anomaly")
        .map(|anomaly| format!("anomaly `{anomaly}`"))
        .or_else(|| {
            event
                .fields
                .get("security_event")
                .map(|kind| format!("security `{kind}`"))
        })
        .unwrap_or_else(|| event.level.as_str().to_string());

    lines.push(format!(
        "**{}** [{}] {} ({})",
        event.service_name, event.environment, headline, event.component
    ));
    lines.push(format!(
        "`{}` `{}`",
        event.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        event.target
    ));

    if let Some(message) = event.message.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        lines.push(format!("> {message}"));
    }

    if !event.spans.is_empty() {
        lines.push(format!("in `{}`", event.spans.join(" > ")));
    }

    for (key, value) in &event.fields {
        lines.push(format!("- `{key}` = `{value}`"));
    }

    truncate(lines.join("\n"), DISCORD_CONTENT_LIMIT)
}

fn truncate(content: String, limit: usize) -> String {
    const SUFFIX: &str = "\n… (truncated)";

    if content.chars().count() <= limit {
        return content;
    }

    let keep = limit.saturating_sub(SUFFIX.chars().count());
    let mut truncated: String = content.chars().take(keep).collect();
    truncated.push_str(SUFFIX);
    truncated
}

#[async_trait]
impl AlertSink for DiscordAlertSink {
    async fn send(&self, event: &AlertEvent) -> Result<()> {
        let response = self
            .client
            .post(self.webhook_url.clone())
            .json(&json!({ "content": format_content(event) }))
            .send()
            .await
            // reqwest errors carry the URL, which carries the webhook token.
            .map_err(|error| {
                if error.is_timeout() {
                    anyhow!("discord webhook request timed out")
                } else if error.is_connect() {
                    anyhow!("discord webhook connection failed")
                } else {
                    anyhow!("discord webhook request failed")
                }
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(anyhow!(
                "discord webhook returned non-success status: {}",
                response.status()
            ))
        }
    }

    fn sink_name(&self) -> &'static str {
        "discord"
    }
}
