use std::collections::HashMap;

use anyhow::{Result, anyhow};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use tracing::error;

type HmacSha256 = Hmac<Sha256>;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Default window Stripe's own SDKs accept between the signed timestamp and now.
pub const DEFAULT_WEBHOOK_TOLERANCE_SECONDS: i64 = 300;

/// Minimal Stripe client built on reqwest.
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    webhook_secret: String,
    webhook_tolerance_seconds: i64,
    success_url: String,
    cancel_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_: String,
    pub created: Option<i64>,
    pub livemode: Option<bool>,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: Option<String>,
    pub url: Option<String>,
    pub mode: Option<String>,
    /// `open`, `complete` or `expired`.
    pub status: Option<String>,
    /// `paid`, `unpaid` or `no_payment_required`.
    pub payment_status: Option<String>,
    pub payment_intent: Option<String>,
    pub amount_total: Option<i64>,
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StripePaymentIntent {
    pub id: Option<String>,
    pub last_payment_error: Option<StripeLastPaymentError>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StripeLastPaymentError {
    pub code: Option<String>,
    pub message: Option<String>,
}

/// One-item payment-mode checkout priced inline.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSessionRequest {
    pub currency: String,
    pub unit_amount: i64,
    pub product_name: String,
    pub product_description: Option<String>,
    pub product_image: Option<String>,
    pub customer_email: String,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedCheckoutSession {
    pub id: String,
    pub url: String,
}

/// A non-2xx answer from the Stripe API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Stripe API request failed: {context} (status {status}, request_id={request_id:?})")]
pub struct StripeApiError {
    pub status: u16,
    pub code: Option<String>,
    pub request_id: Option<String>,
    pub context: String,
}

impl StripeApiError {
    /// The object does not exist for this API key and never will.
    pub fn is_missing_resource(&self) -> bool {
        self.status == 404 || self.code.as_deref() == Some("resource_missing")
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    #[serde(rename = "type")]
    type_: Option<String>,
    code: Option<String>,
    message: Option<String>,
    param: Option<String>,
}

impl StripeClient {
    pub fn new(
        secret_key: String,
        webhook_secret: String,
        success_url: String,
        cancel_url: String,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key,
            webhook_secret,
            webhook_tolerance_seconds: DEFAULT_WEBHOOK_TOLERANCE_SECONDS,
            success_url,
            cancel_url,
        }
    }

    pub fn with_webhook_tolerance(mut self, seconds: i64) -> Self {
        self.webhook_tolerance_seconds = seconds;
        self
    }

    async fn ensure_success(
        resp: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("request-id")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let details = serde_json::from_str::<StripeErrorEnvelope>(&body)
            .ok()
            .map(|envelope| envelope.error);

        error!(
            status = %status,
            stripe_request_id = ?request_id,
            stripe_error_type = ?details.as_ref().and_then(|d| d.type_.as_deref()),
            stripe_error_code = ?details.as_ref().and_then(|d| d.code.as_deref()),
            stripe_error_param = ?details.as_ref().and_then(|d| d.param.as_deref()),
            stripe_error_message = ?details.as_ref().and_then(|d| d.message.as_deref()),
            context = %context,
            "stripe api request failed"
        );

        Err(StripeApiError {
            status: status.as_u16(),
            code: details.and_then(|d| d.code),
            request_id,
            context: context.to_string(),
        }
        .into())
    }

    /// Form body for `POST /v1/checkout/sessions`.
    pub fn checkout_session_form(&self, request: &CheckoutSessionRequest) -> Vec<(String, String)> {
        let mut body: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            (
                "line_items[0][price_data][currency]".to_string(),
                request.currency.clone(),
            ),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                request.unit_amount.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                request.product_name.clone(),
            ),
            ("customer_email".to_string(), request.customer_email.clone()),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
        ];

        if let Some(description) = request.product_description.as_ref() {
            body.push((
                "line_items[0][price_data][product_data][description]".to_string(),
                description.clone(),
            ));
        }

        if let Some(image) = request.product_image.as_ref() {
            body.push((
                "line_items[0][price_data][product_data][images][0]".to_string(),
                image.clone(),
            ));
        }

        let mut metadata: Vec<_> = request.metadata.iter().collect();
        metadata.sort();
        for (key, value) in metadata {
            body.push((format!("metadata[{}]", key), value.clone()));
        }

        body
    }

    /// Creates a payment-mode Checkout Session. https://stripe.com/docs/api/checkout/sessions/create
    pub async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CreatedCheckoutSession> {
        let body = self.checkout_session_form(request);

        let resp = self
            .http
            .post(format!("{STRIPE_API_BASE}/checkout/sessions"))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create checkout session").await?;

        let session: StripeCheckoutSession = resp.json().await?;
        let id = session
            .id
            .ok_or_else(|| anyhow!("Stripe Checkout session id is missing"))?;
        let url = session
            .url
            .ok_or_else(|| anyhow!("Stripe Checkout session URL is missing"))?;

        Ok(CreatedCheckoutSession { id, url })
    }

    /// Expires an open Checkout Session so it can no longer be paid.
    /// https://stripe.com/docs/api/checkout/sessions/expire
    pub async fn expire_checkout_session(&self, session_id: &str) -> Result<()> {
        let resp = self
            .http
            .post(format!(
                "{STRIPE_API_BASE}/checkout/sessions/{}/expire",
                session_id
            ))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .send()
            .await?;
        Self::ensure_success(resp, "expire checkout session").await?;

        Ok(())
    }

    /// https://stripe.com/docs/api/checkout/sessions/retrieve
    pub async fn retrieve_checkout_session(&self, session_id: &str) -> Result<StripeCheckoutSession> {
        let resp = self
            .http
            .get(format!("{STRIPE_API_BASE}/checkout/sessions/{}", session_id))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "retrieve checkout session").await?;

        let session: StripeCheckoutSession = resp.json().await?;
        Ok(session)
    }

    /// Verifies the webhook signature and only then parses the event.
    /// https://stripe.com/docs/webhooks/signatures
    pub fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent> {
        self.verify_webhook_signature_at(payload, signature_header, Utc::now().timestamp())
    }

    fn verify_webhook_signature_at(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> Result<StripeEvent> {
        let mut timestamp: Option<&str> = None;
        let mut signatures: Vec<&str> = Vec::new();

        for part in signature_header.split(',') {
            let part = part.trim();
            if let Some(rest) = part.strip_prefix("t=") {
                timestamp = Some(rest);
            } else if let Some(rest) = part.strip_prefix("v1=") {
                signatures.push(rest);
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| anyhow!("missing timestamp in stripe-signature"))?;
        if signatures.is_empty() {
            anyhow::bail!("missing v1 in stripe-signature");
        }

        let signed_at: i64 = timestamp
            .parse()
            .map_err(|_| anyhow!("invalid timestamp in stripe-signature"))?;
        if now.abs_diff(signed_at) > self.webhook_tolerance_seconds.unsigned_abs() {
            anyhow::bail!("stripe-signature timestamp outside tolerance");
        }

        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);

        let matched = signatures.iter().any(|candidate| {
            hex::decode(candidate)
                .map(|provided| mac.clone().verify_slice(&provided).is_ok())
                .unwrap_or(false)
        });

        if !matched {
            anyhow::bail!("invalid webhook signature");
        }

        let event: StripeEvent = serde_json::from_slice(payload)?;
        Ok(event)
    }

    pub fn extract_checkout_session(event: &StripeEvent) -> Option<StripeCheckoutSession> {
        serde_json::from_value(event.data.object.clone()).ok()
    }

    pub fn extract_payment_intent(event: &StripeEvent) -> Option<StripePaymentIntent> {
        serde_json::from_value(event.data.object.clone()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_gallery";
    const NOW: i64 = 1_735_000_000;

    fn client() -> StripeClient {
        StripeClient::new(
            "sk_test_xxx".to_string(),
            SECRET.to_string(),
            "https://gallery.test/checkout/success?session_id={CHECKOUT_SESSION_ID}".to_string(),
            "https://gallery.test/checkout/cancel".to_string(),
        )
    }

    fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        let signature = hex::encode(mac.finalize().into_bytes());
        format!("t={timestamp},v1={signature}")
    }

    const COMPLETED: &[u8] = br#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{"id":"cs_test_1","payment_intent":"pi_1","metadata":{"artworkId":"1"}}}}"#;

    #[test]
    fn accepts_a_correctly_signed_event() {
        let header = sign(COMPLETED, SECRET, NOW);
        let event = client()
            .verify_webhook_signature_at(COMPLETED, &header, NOW)
            .unwrap();

        assert_eq!(event.type_, "checkout.session.completed");
        let session = StripeClient::extract_checkout_session(&event).unwrap();
        assert_eq!(session.id.as_deref(), Some("cs_test_1"));
        assert_eq!(session.payment_intent.as_deref(), Some("pi_1"));
    }

    #[test]
    fn rejects_a_signature_made_with_another_secret() {
        let header = sign(COMPLETED, "whsec_wrong", NOW);
        assert!(
            client()
                .verify_webhook_signature_at(COMPLETED, &header, NOW)
                .is_err()
        );
    }

    #[test]
    fn rejects_a_tampered_body() {
        let header = sign(COMPLETED, SECRET, NOW);
        let tampered = br#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{"id":"cs_test_2"}}}"#;
        assert!(
            client()
                .verify_webhook_signature_at(tampered, &header, NOW)
                .is_err()
        );
    }

    #[test]
    fn rejects_stale_timestamps() {
        let header = sign(COMPLETED, SECRET, NOW - DEFAULT_WEBHOOK_TOLERANCE_SECONDS - 1);
        assert!(
            client()
                .verify_webhook_signature_at(COMPLETED, &header, NOW)
                .is_err()
        );
    }

    #[test]
    fn accepts_when_any_v1_signature_matches() {
        let valid = sign(COMPLETED, SECRET, NOW);
        let header = format!("{valid},v1=deadbeef,v0=ignored");
        assert!(
            client()
                .verify_webhook_signature_at(COMPLETED, &header, NOW)
                .is_ok()
        );
    }

    #[test]
    fn rejects_malformed_headers() {
        let client = client();
        assert!(client.verify_webhook_signature_at(COMPLETED, "garbage", NOW).is_err());
        assert!(client.verify_webhook_signature_at(COMPLETED, "t=123", NOW).is_err());
        assert!(client.verify_webhook_signature_at(COMPLETED, "v1=abcd", NOW).is_err());
        assert!(
            client
                .verify_webhook_signature_at(COMPLETED, "t=abc,v1=zz", NOW)
                .is_err()
        );
    }

    #[test]
    fn rejects_timestamps_at_the_edges_of_i64() {
        let client = client();
        for header in [
            "t=-9223372036854775808,v1=00",
            "t=9223372036854775807,v1=00",
        ] {
            assert!(
                client.verify_webhook_signature_at(COMPLETED, header, NOW).is_err(),
                "{header}"
            );
            assert!(client.verify_webhook_signature(COMPLETED, header).is_err(), "{header}");
        }
    }

    #[test]
    fn signature_is_checked_before_the_body_is_parsed() {
        let not_json = b"definitely not json";
        let bad_header = sign(not_json, "whsec_wrong", NOW);
        let err = client()
            .verify_webhook_signature_at(not_json, &bad_header, NOW)
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid webhook signature");
    }

    #[test]
    fn only_unknown_objects_count_as_missing() {
        let error = |status: u16, code: Option<&str>| StripeApiError {
            status,
            code: code.map(str::to_string),
            request_id: None,
            context: "retrieve checkout session".to_string(),
        };

        assert!(error(404, Some("resource_missing")).is_missing_resource());
        assert!(error(400, Some("resource_missing")).is_missing_resource());
        assert!(!error(401, None).is_missing_resource());
        assert!(!error(429, Some("rate_limit")).is_missing_resource());
        assert!(!error(500, None).is_missing_resource());
    }

    #[test]
    fn checkout_form_prices_inline_in_minor_units() {
        let request = CheckoutSessionRequest {
            currency: "eur".to_string(),
            unit_amount: 120_000,
            product_name: "Atardecer en el Mar".to_string(),
            product_description: Some("Óleo sobre lienzo - 80 x 60 cm".to_string()),
            product_image: None,
            customer_email: "ana@example.com".to_string(),
            metadata: HashMap::from([("artworkId".to_string(), "1".to_string())]),
        };

        let form = client().checkout_session_form(&request);
        let get = |key: &str| {
            form.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("mode"), Some("payment"));
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("120000"));
        assert_eq!(get("line_items[0][price_data][currency]"), Some("eur"));
        assert_eq!(get("customer_email"), Some("ana@example.com"));
        assert_eq!(get("metadata[artworkId]"), Some("1"));
        assert_eq!(get("line_items[0][price_data][product_data][images][0]"), None);
    }
}
