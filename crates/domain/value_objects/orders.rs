use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::{
    entities::orders::OrderEntity,
    value_objects::{enums::order_statuses::OrderStatus, order_transitions::TransitionDecision},
};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub artwork_id: i32,
    #[validate(email(message = "a valid email is required"))]
    pub customer_email: String,
    #[validate(length(min = 1, max = 200, message = "a name is required"))]
    pub customer_name: String,
    #[validate(length(max = 50))]
    pub customer_phone: Option<String>,
    #[validate(length(max = 1000))]
    pub shipping_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
}

impl WebhookAck {
    pub fn received() -> Self {
        Self { received: true }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderModel {
    pub id: Uuid,
    pub status: OrderStatus,
    #[validate(range(min = 0, max = 365))]
    pub estimated_days: Option<i32>,
    #[validate(length(max = 100))]
    pub tracking_number: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDto {
    pub id: Uuid,
    pub stripe_session_id: String,
    pub stripe_payment_id: Option<String>,
    pub customer_email: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub shipping_address: Option<String>,
    pub artwork_id: i32,
    pub artwork_title: String,
    pub artwork_price: Decimal,
    pub status: String,
    pub estimated_days: Option<i32>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<OrderEntity> for OrderDto {
    fn from(value: OrderEntity) -> Self {
        Self {
            id: value.id,
            stripe_session_id: value.stripe_session_id,
            stripe_payment_id: value.stripe_payment_id,
            customer_email: value.customer_email,
            customer_name: value.customer_name,
            customer_phone: value.customer_phone,
            shipping_address: value.shipping_address,
            artwork_id: value.artwork_id,
            artwork_title: value.artwork_title,
            artwork_price: value.artwork_price,
            status: value.status,
            estimated_days: value.estimated_days,
            tracking_number: value.tracking_number,
            notes: value.notes,
            created_at: value.created_at,
        }
    }
}

/// What happened when a payment event was applied to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEventOutcome {
    /// No order carries this checkout session id.
    UnmatchedSession,
    Applied {
        order_id: Uuid,
        artwork_id: i32,
        from: OrderStatus,
        to: OrderStatus,
        /// Only meaningful for completions: false when the artwork row no longer exists.
        artwork_marked_unavailable: bool,
    },
    Unchanged {
        order_id: Uuid,
        status: OrderStatus,
        decision: TransitionDecision,
    },
}
