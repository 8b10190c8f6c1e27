use anyhow::Result as AnyResult;
use async_trait::async_trait;
use gallery::payments::stripe_client::{
    CheckoutSessionRequest, CreatedCheckoutSession, StripeCheckoutSession, StripeClient,
    StripeEvent,
};

/// The slice of Stripe the order lifecycle depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StripeGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> AnyResult<CreatedCheckoutSession>;

    async fn expire_checkout_session(&self, session_id: &str) -> AnyResult<()>;

    async fn retrieve_checkout_session(&self, session_id: &str)
    -> AnyResult<StripeCheckoutSession>;

    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> AnyResult<StripeEvent>;
}

#[async_trait]
impl StripeGateway for StripeClient {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> AnyResult<CreatedCheckoutSession> {
        StripeClient::create_checkout_session(self, &request).await
    }

    async fn expire_checkout_session(&self, session_id: &str) -> AnyResult<()> {
        StripeClient::expire_checkout_session(self, session_id).await
    }

    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> AnyResult<StripeCheckoutSession> {
        StripeClient::retrieve_checkout_session(self, session_id).await
    }

    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> AnyResult<StripeEvent> {
        StripeClient::verify_webhook_signature(self, payload, signature)
    }
}
