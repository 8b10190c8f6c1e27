use std::sync::Arc;

use chrono::{DateTime, Utc};
use gallery::{
    domain::{
        repositories::orders::OrderRepository,
        value_objects::{
            enums::order_statuses::OrderStatus,
            order_transitions::{PaymentEvent, TransitionDecision},
            orders::{PaymentEventOutcome, WebhookAck},
        },
    },
    payments::stripe_client::{StripeApiError, StripeCheckoutSession, StripeClient, StripeEvent},
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::usecases::stripe_gateway::StripeGateway;

#[derive(Debug, Error)]
pub enum ReconciliationError {
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("order ledger unavailable")]
    Persistence(#[source] anyhow::Error),
}

impl ReconciliationError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            ReconciliationError::InvalidSignature => StatusCode::BAD_REQUEST,
            ReconciliationError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type ReconciliationResult<T> = std::result::Result<T, ReconciliationError>;

/// Counters for one pass over stale pending orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    pub paid: usize,
    pub expired: usize,
    pub still_open: usize,
    pub unchanged: usize,
    /// Sessions Stripe no longer knows about; their orders are closed as expired.
    pub missing: usize,
    pub failed: usize,
}

pub struct PaymentReconciliationUseCase<O, Stripe>
where
    O: OrderRepository + Send + Sync + 'static,
    Stripe: StripeGateway + 'static,
{
    order_repo: Arc<O>,
    stripe_client: Arc<Stripe>,
}

impl<O, Stripe> PaymentReconciliationUseCase<O, Stripe>
where
    O: OrderRepository + Send + Sync + 'static,
    Stripe: StripeGateway + 'static,
{
    pub fn new(order_repo: Arc<O>, stripe_client: Arc<Stripe>) -> Self {
        Self {
            order_repo,
            stripe_client,
        }
    }

    /// Authenticates a Stripe delivery and folds it into the order ledger.
    ///
    /// Anything past the signature check is acknowledged unless the ledger itself
    /// failed, in which case Stripe is asked to retry.
    pub async fn handle_stripe_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> ReconciliationResult<WebhookAck> {
        debug!(payload_bytes = payload.len(), "payments: stripe webhook received");

        let event = self
            .stripe_client
            .verify_webhook_signature(payload, signature)
            .map_err(|err| {
                warn!(
                    security_event = "invalid_webhook_signature",
                    error = %err,
                    "payments: stripe webhook rejected"
                );
                ReconciliationError::InvalidSignature
            })?;

        info!(
            event_id = ?event.id,
            event_type = %event.type_,
            livemode = ?event.livemode,
            "payments: stripe webhook verified"
        );

        match event.type_.as_str() {
            "checkout.session.completed" => {
                let Some((session_id, session)) = session_of(&event) else {
                    return Ok(WebhookAck::received());
                };
                let payment_event = PaymentEvent::Completed {
                    payment_intent_id: session.payment_intent,
                };
                self.reconcile(&session_id, payment_event).await?;
            }
            "checkout.session.expired" => {
                let Some((session_id, _)) = session_of(&event) else {
                    return Ok(WebhookAck::received());
                };
                self.reconcile(&session_id, PaymentEvent::Expired).await?;
            }
            "payment_intent.payment_failed" => {
                let intent = StripeClient::extract_payment_intent(&event).unwrap_or_default();
                let last_error = intent.last_payment_error.unwrap_or_default();
                warn!(
                    event_id = ?event.id,
                    payment_intent_id = ?intent.id,
                    failure_code = ?last_error.code,
                    failure_message = ?last_error.message,
                    "payments: payment attempt failed"
                );
            }
            other => {
                debug!(event_type = %other, "payments: unhandled stripe event type");
            }
        }

        Ok(WebhookAck::received())
    }

    /// Applies one payment event for a checkout session. Safe to call any number of
    /// times for the same session and event.
    pub async fn reconcile(
        &self,
        stripe_session_id: &str,
        event: PaymentEvent,
    ) -> ReconciliationResult<PaymentEventOutcome> {
        let event_name = event.name();

        let outcome = self
            .order_repo
            .apply_payment_event(stripe_session_id, event)
            .await
            .map_err(|err| {
                error!(
                    stripe_session_id,
                    event = event_name,
                    db_error = ?err,
                    "payments: failed to apply payment event"
                );
                ReconciliationError::Persistence(err)
            })?;

        log_outcome(stripe_session_id, event_name, &outcome);
        Ok(outcome)
    }

    /// Settles pending orders whose webhooks may have been lost by asking Stripe for
    /// the current session state.
    pub async fn sweep_stale_checkouts(
        &self,
        created_before: DateTime<Utc>,
        limit: i64,
    ) -> ReconciliationResult<SweepReport> {
        let orders = self
            .order_repo
            .list_stale_pending_orders(created_before, limit)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "payments: failed to list stale pending orders");
                ReconciliationError::Persistence(err)
            })?;

        let mut report = SweepReport {
            examined: orders.len(),
            ..SweepReport::default()
        };

        for order in orders {
            let session_id = order.stripe_session_id.as_str();

            if let Err(err) = self
                .order_repo
                .mark_reconcile_checked(order.id, Utc::now())
                .await
            {
                warn!(
                    order_id = %order.id,
                    db_error = ?err,
                    "payments: failed to record reconcile check"
                );
            }

            let session = match self.stripe_client.retrieve_checkout_session(session_id).await {
                Ok(session) => session,
                Err(err) if is_missing_session(&err) => {
                    error!(
                        order_id = %order.id,
                        stripe_session_id = session_id,
                        error = %err,
                        anomaly = "checkout_session_missing",
                        "payments: stripe has no such checkout session, closing order"
                    );
                    report.missing += 1;
                    if self.reconcile(session_id, PaymentEvent::Expired).await.is_err() {
                        report.failed += 1;
                    }
                    continue;
                }
                Err(err) => {
                    warn!(
                        order_id = %order.id,
                        stripe_session_id = session_id,
                        error = ?err,
                        "payments: could not retrieve checkout session"
                    );
                    report.failed += 1;
                    continue;
                }
            };

            let Some(event) = payment_event_from_session(&session) else {
                report.still_open += 1;
                continue;
            };

            match self.reconcile(session_id, event).await {
                Ok(PaymentEventOutcome::Applied { to: OrderStatus::Paid, .. }) => report.paid += 1,
                Ok(PaymentEventOutcome::Applied { .. }) => report.expired += 1,
                Ok(_) => report.unchanged += 1,
                Err(_) => report.failed += 1,
            }
        }

        Ok(report)
    }
}

fn session_of(event: &StripeEvent) -> Option<(String, StripeCheckoutSession)> {
    let session = StripeClient::extract_checkout_session(event)
        .and_then(|session| session.id.clone().map(|id| (id, session)));
    if session.is_none() {
        error!(
            event_id = ?event.id,
            event_type = %event.type_,
            anomaly = "malformed_event",
            "payments: checkout session missing from verified event"
        );
    }
    session
}

fn is_missing_session(err: &anyhow::Error) -> bool {
    err.downcast_ref::<StripeApiError>()
        .is_some_and(StripeApiError::is_missing_resource)
}

/// Maps a retrieved session onto the event its webhook would have carried.
fn payment_event_from_session(session: &StripeCheckoutSession) -> Option<PaymentEvent> {
    match (session.status.as_deref(), session.payment_status.as_deref()) {
        (Some("complete"), Some("paid" | "no_payment_required")) => Some(PaymentEvent::Completed {
            payment_intent_id: session.payment_intent.clone(),
        }),
        (Some("expired"), _) => Some(PaymentEvent::Expired),
        _ => None,
    }
}

fn log_outcome(stripe_session_id: &str, event: &str, outcome: &PaymentEventOutcome) {
    match outcome {
        PaymentEventOutcome::UnmatchedSession => {
            error!(
                stripe_session_id,
                event,
                anomaly = "unknown_session",
                "payments: no order for checkout session"
            );
        }
        PaymentEventOutcome::Applied {
            order_id,
            artwork_id,
            from,
            to,
            artwork_marked_unavailable,
        } => {
            info!(
                stripe_session_id,
                event,
                %order_id,
                artwork_id,
                %from,
                %to,
                "payments: order transitioned"
            );
            if *to == OrderStatus::Paid && !artwork_marked_unavailable {
                error!(
                    %order_id,
                    artwork_id,
                    anomaly = "artwork_missing",
                    "payments: paid order references a missing artwork"
                );
            }
        }
        PaymentEventOutcome::Unchanged {
            order_id,
            status,
            decision,
        } => match decision {
            TransitionDecision::Anomalous => {
                error!(
                    stripe_session_id,
                    event,
                    %order_id,
                    %status,
                    anomaly = "payment_on_closed_order",
                    "payments: event contradicts order state"
                );
            }
            TransitionDecision::Superseded => {
                info!(
                    stripe_session_id,
                    event,
                    %order_id,
                    %status,
                    "payments: event superseded by later state"
                );
            }
            _ => {
                info!(
                    stripe_session_id,
                    event,
                    %order_id,
                    %status,
                    "payments: duplicate event ignored"
                );
            }
        },
    }
}
