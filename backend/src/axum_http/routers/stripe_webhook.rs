use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::post,
};
use gallery::{
    domain::repositories::orders::OrderRepository,
    infra::db::{postgres::postgres_connection::PgPoolSquad, repositories::orders::OrderPostgres},
    payments::stripe_client::StripeClient,
};

use crate::usecases::{
    payment_reconciliation::PaymentReconciliationUseCase, stripe_gateway::StripeGateway,
};

const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

pub fn routes(db_pool: Arc<PgPoolSquad>, stripe_client: Arc<StripeClient>) -> Router {
    let order_repository = OrderPostgres::new(Arc::clone(&db_pool));
    let usecase = PaymentReconciliationUseCase::new(Arc::new(order_repository), stripe_client);

    router(Arc::new(usecase))
}

pub fn router<O, S>(usecase: Arc<PaymentReconciliationUseCase<O, S>>) -> Router
where
    O: OrderRepository + Send + Sync + 'static,
    S: StripeGateway + 'static,
{
    Router::new()
        .route("/stripe", post(stripe_webhook))
        .with_state(usecase)
}

/// The body is taken as raw bytes: the signature covers the exact payload Stripe sent.
pub async fn stripe_webhook<O, S>(
    State(usecase): State<Arc<PaymentReconciliationUseCase<O, S>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    O: OrderRepository + Send + Sync + 'static,
    S: StripeGateway + 'static,
{
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    match usecase.handle_stripe_webhook(&body, signature).await {
        Ok(ack) => Json(ack).into_response(),
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axum_http::error_responses::ErrorBody;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use gallery::domain::{
        repositories::orders::MockOrderRepository,
        value_objects::{
            enums::order_statuses::OrderStatus,
            order_transitions::{PaymentEvent, TransitionDecision},
            orders::{PaymentEventOutcome, WebhookAck},
        },
    };
    use hmac::{Hmac, Mac};
    use sha2::Sha256;
    use tower::ServiceExt;
    use uuid::Uuid;

    const WEBHOOK_SECRET: &str = "whsec_router_tests";
    const COMPLETED: &str = r#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{"id":"cs_test_1","payment_intent":"pi_1","metadata":{"artworkId":"1"}}}}"#;

    fn stripe_client() -> StripeClient {
        StripeClient::new(
            "sk_test_xxx".to_string(),
            WEBHOOK_SECRET.to_string(),
            "https://gallery.test/checkout/success".to_string(),
            "https://gallery.test/checkout/cancel".to_string(),
        )
    }

    fn sign(payload: &str, secret: &str) -> String {
        let timestamp = chrono::Utc::now().timestamp();
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.{payload}").as_bytes());
        format!(
            "t={timestamp},v1={}",
            hex::encode(mac.finalize().into_bytes())
        )
    }

    fn app(orders: MockOrderRepository) -> Router {
        router(Arc::new(PaymentReconciliationUseCase::new(
            Arc::new(orders),
            Arc::new(stripe_client()),
        )))
    }

    fn webhook_request(payload: &str, signature: Option<String>) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri("/stripe");
        if let Some(signature) = signature {
            builder = builder.header(STRIPE_SIGNATURE_HEADER, signature);
        }
        builder.body(Body::from(payload.to_string())).unwrap()
    }

    async fn read<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn signed_completion_is_applied_and_acknowledged() {
        let mut orders = MockOrderRepository::new();
        orders
            .expect_apply_payment_event()
            .withf(|session_id, event| {
                session_id == "cs_test_1"
                    && *event
                        == PaymentEvent::Completed {
                            payment_intent_id: Some("pi_1".to_string()),
                        }
            })
            .times(1)
            .returning(|_, _| {
                Ok(PaymentEventOutcome::Applied {
                    order_id: Uuid::new_v4(),
                    artwork_id: 1,
                    from: OrderStatus::Pending,
                    to: OrderStatus::Paid,
                    artwork_marked_unavailable: true,
                })
            });

        let response = app(orders)
            .oneshot(webhook_request(COMPLETED, Some(sign(COMPLETED, WEBHOOK_SECRET))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let ack: WebhookAck = read(response).await;
        assert!(ack.received);
    }

    #[tokio::test]
    async fn forged_signature_is_rejected_with_no_state_change() {
        let mut orders = MockOrderRepository::new();
        orders.expect_apply_payment_event().never();

        let response = app(orders)
            .oneshot(webhook_request(COMPLETED, Some(sign(COMPLETED, "whsec_attacker"))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorBody = read(response).await;
        assert_eq!(body.error, "Invalid signature");
    }

    #[tokio::test]
    async fn missing_signature_header_is_rejected() {
        let mut orders = MockOrderRepository::new();
        orders.expect_apply_payment_event().never();

        let response = app(orders)
            .oneshot(webhook_request(COMPLETED, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn duplicate_delivery_still_returns_received() {
        let mut orders = MockOrderRepository::new();
        orders.expect_apply_payment_event().returning(|_, _| {
            Ok(PaymentEventOutcome::Unchanged {
                order_id: Uuid::new_v4(),
                status: OrderStatus::Paid,
                decision: TransitionDecision::Duplicate,
            })
        });

        let response = app(orders)
            .oneshot(webhook_request(COMPLETED, Some(sign(COMPLETED, WEBHOOK_SECRET))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ledger_outage_returns_500_for_retry() {
        let mut orders = MockOrderRepository::new();
        orders
            .expect_apply_payment_event()
            .returning(|_, _| Err(anyhow::anyhow!("pool exhausted")));

        let response = app(orders)
            .oneshot(webhook_request(COMPLETED, Some(sign(COMPLETED, WEBHOOK_SECRET))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
