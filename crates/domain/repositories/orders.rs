use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::orders::{InsertOrderEntity, OrderEntity, UpdateOrderFulfilmentEntity},
    value_objects::{
        enums::order_statuses::OrderStatus, order_transitions::PaymentEvent,
        orders::PaymentEventOutcome,
    },
};

#[automock]
#[async_trait]
pub trait OrderRepository {
    async fn create_pending_order(&self, order: InsertOrderEntity) -> Result<Uuid>;

    async fn find_by_id(&self, order_id: Uuid) -> Result<Option<OrderEntity>>;

    /// Newest first.
    async fn list_orders(&self) -> Result<Vec<OrderEntity>>;

    /// Pending orders created before `created_before`. Orders the sweep has never
    /// looked at come first, then the least recently checked, oldest first within each.
    async fn list_stale_pending_orders(
        &self,
        created_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<OrderEntity>>;

    /// Records that the sweep examined the order, moving it behind unchecked rows.
    async fn mark_reconcile_checked(&self, order_id: Uuid, checked_at: DateTime<Utc>)
    -> Result<()>;

    /// Applies a processor event to the order owning `stripe_session_id`. The order
    /// transition and any artwork availability change commit together or not at all.
    async fn apply_payment_event(
        &self,
        stripe_session_id: &str,
        event: PaymentEvent,
    ) -> Result<PaymentEventOutcome>;

    /// Writes fulfilment fields only if the order is still in `expected_status`.
    /// Returns `None` when the row was not updated.
    async fn update_fulfilment(
        &self,
        order_id: Uuid,
        expected_status: OrderStatus,
        changes: UpdateOrderFulfilmentEntity,
    ) -> Result<Option<OrderEntity>>;
}
