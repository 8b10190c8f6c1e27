//! Order lifecycle rules.
//!
//! Payment events coming from Stripe and administrative edits go through
//! separate tables: only the processor can settle or expire an order, and
//! only an admin can move a settled order through fulfilment.

use thiserror::Error;

use super::enums::order_statuses::OrderStatus;

/// A payment lifecycle occurrence reported by the processor for one checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEvent {
    Completed { payment_intent_id: Option<String> },
    Expired,
}

impl PaymentEvent {
    pub fn target_status(&self) -> OrderStatus {
        match self {
            PaymentEvent::Completed { .. } => OrderStatus::Paid,
            PaymentEvent::Expired => OrderStatus::Expired,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PaymentEvent::Completed { .. } => "checkout_completed",
            PaymentEvent::Expired => "checkout_expired",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionDecision {
    /// Move the order to the given status.
    Apply(OrderStatus),
    /// The event was already applied; redelivery must not repeat side effects.
    Duplicate,
    /// A later state already won (e.g. expiry delivered after the payment).
    Superseded,
    /// The event contradicts the stored state and needs an operator.
    Anomalous,
}

pub fn decide_payment_transition(current: OrderStatus, event: &PaymentEvent) -> TransitionDecision {
    match (current, event) {
        (OrderStatus::Pending, event) => TransitionDecision::Apply(event.target_status()),

        (OrderStatus::Paid | OrderStatus::Shipped | OrderStatus::Delivered, PaymentEvent::Completed { .. }) => {
            TransitionDecision::Duplicate
        }
        (OrderStatus::Expired, PaymentEvent::Expired) => TransitionDecision::Duplicate,

        (OrderStatus::Paid | OrderStatus::Shipped | OrderStatus::Delivered, PaymentEvent::Expired) => {
            TransitionDecision::Superseded
        }
        (OrderStatus::Expired, PaymentEvent::Completed { .. }) => TransitionDecision::Anomalous,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("order status cannot change from {from} to {to}")]
pub struct AdminTransitionError {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

/// Administrative edits may only advance fulfilment; they never create payment truth.
pub fn check_admin_transition(from: OrderStatus, to: OrderStatus) -> Result<(), AdminTransitionError> {
    let allowed = from == to
        || matches!(
            (from, to),
            (OrderStatus::Paid, OrderStatus::Shipped)
                | (OrderStatus::Paid, OrderStatus::Delivered)
                | (OrderStatus::Shipped, OrderStatus::Delivered)
        );

    if allowed {
        Ok(())
    } else {
        Err(AdminTransitionError { from, to })
    }
}
