use std::{collections::HashMap, sync::Arc};

use gallery::{
    domain::{
        entities::{artworks::ArtworkEntity, orders::InsertOrderEntity},
        repositories::{artworks::ArtworkRepository, orders::OrderRepository},
        value_objects::{
            enums::order_statuses::OrderStatus,
            money::to_minor_units,
            orders::{CheckoutRequest, CheckoutResponse},
        },
    },
    payments::stripe_client::CheckoutSessionRequest,
};
use thiserror::Error;
use tracing::{error, info, warn};
use validator::Validate;

use crate::usecases::stripe_gateway::StripeGateway;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("artwork not found")]
    ArtworkNotFound,
    #[error("artwork is no longer available")]
    ArtworkUnavailable,
    #[error("invalid checkout request: {0}")]
    InvalidRequest(String),
    #[error("payment could not be initiated")]
    PaymentInitiationFailed(#[source] anyhow::Error),
}

impl CheckoutError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            CheckoutError::ArtworkNotFound => StatusCode::NOT_FOUND,
            CheckoutError::ArtworkUnavailable | CheckoutError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            CheckoutError::PaymentInitiationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type CheckoutResult<T> = std::result::Result<T, CheckoutError>;

pub struct CheckoutUseCase<A, O, Stripe>
where
    A: ArtworkRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
    Stripe: StripeGateway + 'static,
{
    artwork_repo: Arc<A>,
    order_repo: Arc<O>,
    stripe_client: Arc<Stripe>,
    currency: String,
}

impl<A, O, Stripe> CheckoutUseCase<A, O, Stripe>
where
    A: ArtworkRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
    Stripe: StripeGateway + 'static,
{
    pub fn new(
        artwork_repo: Arc<A>,
        order_repo: Arc<O>,
        stripe_client: Arc<Stripe>,
        currency: String,
    ) -> Self {
        Self {
            artwork_repo,
            order_repo,
            stripe_client,
            currency,
        }
    }

    /// Opens a Stripe session for one artwork and records the matching pending order.
    ///
    /// The order is written only once the session exists. If that write fails the
    /// session is expired again so nobody can pay for an order we never recorded.
    pub async fn create_checkout(&self, request: CheckoutRequest) -> CheckoutResult<CheckoutResponse> {
        let artwork_id = request.artwork_id;
        info!(artwork_id, "checkout: session requested");

        request.validate().map_err(|err| {
            warn!(artwork_id, error = %err, "checkout: invalid request");
            CheckoutError::InvalidRequest(err.to_string())
        })?;
        let customer_phone = non_blank(request.customer_phone);
        let shipping_address = non_blank(request.shipping_address);

        let artwork = self
            .artwork_repo
            .find_by_id(artwork_id)
            .await
            .map_err(|err| {
                error!(artwork_id, db_error = ?err, "checkout: failed to load artwork");
                CheckoutError::PaymentInitiationFailed(err)
            })?
            .ok_or_else(|| {
                warn!(artwork_id, "checkout: artwork not found");
                CheckoutError::ArtworkNotFound
            })?;

        if !artwork.available {
            warn!(artwork_id, "checkout: artwork already sold");
            return Err(CheckoutError::ArtworkUnavailable);
        }

        let unit_amount = to_minor_units(artwork.price).map_err(|err| {
            error!(artwork_id, price = %artwork.price, error = ?err, "checkout: unusable artwork price");
            CheckoutError::PaymentInitiationFailed(err)
        })?;

        let session_request = CheckoutSessionRequest {
            currency: self.currency.clone(),
            unit_amount,
            product_name: artwork.title.clone(),
            product_description: product_description(&artwork),
            product_image: artwork.image_url.clone(),
            customer_email: request.customer_email.clone(),
            metadata: checkout_metadata(
                &artwork,
                &request.customer_name,
                customer_phone.as_deref(),
                shipping_address.as_deref(),
            ),
        };

        let session = self
            .stripe_client
            .create_checkout_session(session_request)
            .await
            .map_err(|err| {
                error!(artwork_id, unit_amount, error = ?err, "checkout: stripe session creation failed");
                CheckoutError::PaymentInitiationFailed(err)
            })?;

        info!(
            artwork_id,
            stripe_session_id = %session.id,
            unit_amount,
            "checkout: stripe session created"
        );

        let order = InsertOrderEntity {
            stripe_session_id: session.id.clone(),
            customer_email: request.customer_email,
            customer_name: request.customer_name,
            customer_phone,
            shipping_address,
            artwork_id: artwork.id,
            artwork_title: artwork.title,
            artwork_price: artwork.price,
            status: OrderStatus::Pending.to_string(),
        };

        let order_id = match self.order_repo.create_pending_order(order).await {
            Ok(order_id) => order_id,
            Err(err) => {
                error!(
                    artwork_id,
                    stripe_session_id = %session.id,
                    db_error = ?err,
                    "checkout: failed to record pending order; expiring session"
                );
                self.expire_orphaned_session(&session.id).await;
                return Err(CheckoutError::PaymentInitiationFailed(err));
            }
        };

        info!(
            artwork_id,
            %order_id,
            stripe_session_id = %session.id,
            "checkout: pending order recorded"
        );

        Ok(CheckoutResponse {
            session_id: session.id,
            url: session.url,
        })
    }

    async fn expire_orphaned_session(&self, session_id: &str) {
        if let Err(err) = self.stripe_client.expire_checkout_session(session_id).await {
            error!(
                stripe_session_id = %session_id,
                anomaly = "orphaned_checkout_session",
                error = ?err,
                "checkout: session has no order and could not be expired"
            );
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn product_description(artwork: &ArtworkEntity) -> Option<String> {
    match (artwork.technique.as_deref(), artwork.dimensions.as_deref()) {
        (Some(technique), Some(dimensions)) => Some(format!("{technique} - {dimensions}")),
        (Some(one), None) | (None, Some(one)) => Some(one.to_string()),
        (None, None) => None,
    }
}

/// Lets the webhook side identify the purchase without re-reading application state.
fn checkout_metadata(
    artwork: &ArtworkEntity,
    customer_name: &str,
    customer_phone: Option<&str>,
    shipping_address: Option<&str>,
) -> HashMap<String, String> {
    HashMap::from([
        ("artworkId".to_string(), artwork.id.to_string()),
        ("artworkTitle".to_string(), artwork.title.clone()),
        ("customerName".to_string(), customer_name.to_string()),
        (
            "customerPhone".to_string(),
            customer_phone.unwrap_or_default().to_string(),
        ),
        (
            "shippingAddress".to_string(),
            shipping_address.unwrap_or_default().to_string(),
        ),
    ])
}
