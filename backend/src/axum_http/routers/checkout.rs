use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use gallery::{
    domain::{
        repositories::{artworks::ArtworkRepository, orders::OrderRepository},
        value_objects::orders::CheckoutRequest,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{artworks::ArtworkPostgres, orders::OrderPostgres},
    },
    payments::stripe_client::StripeClient,
};
use tracing::warn;

use crate::{
    axum_http::error_responses::error_body,
    usecases::{checkout::CheckoutUseCase, stripe_gateway::StripeGateway},
};

pub fn routes(db_pool: Arc<PgPoolSquad>, stripe_client: Arc<StripeClient>, currency: String) -> Router {
    let artwork_repository = ArtworkPostgres::new(Arc::clone(&db_pool));
    let order_repository = OrderPostgres::new(Arc::clone(&db_pool));

    let usecase = CheckoutUseCase::new(
        Arc::new(artwork_repository),
        Arc::new(order_repository),
        stripe_client,
        currency,
    );

    router(Arc::new(usecase))
}

pub fn router<A, O, S>(usecase: Arc<CheckoutUseCase<A, O, S>>) -> Router
where
    A: ArtworkRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
    S: StripeGateway + 'static,
{
    Router::new()
        .route("/", post(create_checkout))
        .with_state(usecase)
}

pub async fn create_checkout<A, O, S>(
    State(usecase): State<Arc<CheckoutUseCase<A, O, S>>>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Response
where
    A: ArtworkRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
    S: StripeGateway + 'static,
{
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!(error = %rejection, "checkout router: malformed body");
            return error_body(StatusCode::BAD_REQUEST, "Invalid checkout request");
        }
    };

    match usecase.create_checkout(request).await {
        Ok(response) => Json(response).into_response(),
        Err(err) => err.into_response(),
    }
}
