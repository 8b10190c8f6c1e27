use std::sync::Arc;

use chrono::Utc;
use gallery::domain::{
    entities::orders::{OrderEntity, UpdateOrderFulfilmentEntity},
    repositories::orders::OrderRepository,
    value_objects::{
        order_transitions::{AdminTransitionError, check_admin_transition},
        orders::{OrderDto, UpdateOrderModel},
    },
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Error)]
pub enum OrderAdminError {
    #[error("order not found")]
    OrderNotFound,
    #[error("invalid order update: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    InvalidTransition(#[from] AdminTransitionError),
    #[error("order was modified concurrently, reload and retry")]
    ConcurrentUpdate,
    #[error("internal server error")]
    Internal(#[source] anyhow::Error),
}

impl OrderAdminError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            OrderAdminError::OrderNotFound => StatusCode::NOT_FOUND,
            OrderAdminError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            OrderAdminError::InvalidTransition(_) | OrderAdminError::ConcurrentUpdate => {
                StatusCode::CONFLICT
            }
            OrderAdminError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type OrderAdminResult<T> = std::result::Result<T, OrderAdminError>;

pub struct OrderAdminUseCase<O>
where
    O: OrderRepository + Send + Sync + 'static,
{
    order_repo: Arc<O>,
}

impl<O> OrderAdminUseCase<O>
where
    O: OrderRepository + Send + Sync + 'static,
{
    pub fn new(order_repo: Arc<O>) -> Self {
        Self { order_repo }
    }

    pub async fn list_orders(&self) -> OrderAdminResult<Vec<OrderDto>> {
        let orders = self.order_repo.list_orders().await.map_err(|err| {
            error!(db_error = ?err, "orders: failed to list orders");
            OrderAdminError::Internal(err)
        })?;

        info!(order_count = orders.len(), "orders: listed");
        Ok(orders.into_iter().map(OrderDto::from).collect())
    }

    /// Edits fulfilment details. Status changes go through the admin transition
    /// table and are written only if nobody moved the order in the meantime.
    pub async fn update_order(
        &self,
        admin_id: i32,
        update: UpdateOrderModel,
    ) -> OrderAdminResult<OrderDto> {
        let order_id = update.id;

        update.validate().map_err(|err| {
            warn!(%order_id, admin_id, error = %err, "orders: invalid update");
            OrderAdminError::InvalidRequest(err.to_string())
        })?;

        let current = self.load(order_id).await?;
        let from = current.order_status().map_err(|err| {
            error!(%order_id, error = ?err, "orders: stored status is unreadable");
            OrderAdminError::Internal(err)
        })?;
        let to = update.status;

        check_admin_transition(from, to).inspect_err(|err| {
            warn!(%order_id, admin_id, error = %err, "orders: transition refused");
        })?;

        let changes = UpdateOrderFulfilmentEntity {
            status: to.to_string(),
            estimated_days: update.estimated_days,
            tracking_number: blank_to_none(update.tracking_number),
            notes: blank_to_none(update.notes),
            updated_at: Utc::now(),
        };

        let updated = self
            .order_repo
            .update_fulfilment(order_id, from, changes)
            .await
            .map_err(|err| {
                error!(%order_id, db_error = ?err, "orders: failed to update order");
                OrderAdminError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(%order_id, admin_id, expected = %from, "orders: status changed during update");
                OrderAdminError::ConcurrentUpdate
            })?;

        info!(%order_id, admin_id, %from, %to, "orders: order updated");
        Ok(updated.into())
    }

    async fn load(&self, order_id: Uuid) -> OrderAdminResult<OrderEntity> {
        self.order_repo
            .find_by_id(order_id)
            .await
            .map_err(|err| {
                error!(%order_id, db_error = ?err, "orders: failed to load order");
                OrderAdminError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(%order_id, "orders: order not found");
                OrderAdminError::OrderNotFound
            })
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
