use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use gallery::{
    domain::{repositories::orders::OrderRepository, value_objects::orders::UpdateOrderModel},
    infra::db::{postgres::postgres_connection::PgPoolSquad, repositories::orders::OrderPostgres},
};
use tracing::warn;

use crate::{
    auth::AdminUser, axum_http::error_responses::error_body, usecases::orders::OrderAdminUseCase,
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let order_repository = OrderPostgres::new(Arc::clone(&db_pool));
    router(Arc::new(OrderAdminUseCase::new(Arc::new(order_repository))))
}

pub fn router<O>(usecase: Arc<OrderAdminUseCase<O>>) -> Router
where
    O: OrderRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(list_orders).put(update_order))
        .with_state(usecase)
}

pub async fn list_orders<O>(
    State(usecase): State<Arc<OrderAdminUseCase<O>>>,
    _admin: AdminUser,
) -> Response
where
    O: OrderRepository + Send + Sync + 'static,
{
    match usecase.list_orders().await {
        Ok(orders) => Json(orders).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn update_order<O>(
    State(usecase): State<Arc<OrderAdminUseCase<O>>>,
    AdminUser { admin_id, .. }: AdminUser,
    payload: Result<Json<UpdateOrderModel>, JsonRejection>,
) -> Response
where
    O: OrderRepository + Send + Sync + 'static,
{
    let Json(update) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!(admin_id, error = %rejection, "orders router: malformed body");
            return error_body(StatusCode::BAD_REQUEST, "Invalid order update");
        }
    };

    match usecase.update_order(admin_id, update).await {
        Ok(order) => Json(order).into_response(),
        Err(err) => err.into_response(),
    }
}
