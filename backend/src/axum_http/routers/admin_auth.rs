use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use gallery::{
    domain::repositories::admin_users::AdminUserRepository,
    infra::db::{
        postgres::postgres_connection::PgPoolSquad, repositories::admin_users::AdminUserPostgres,
    },
};

use crate::{
    axum_http::error_responses::error_body,
    config::config_model::AdminSecret,
    usecases::admin_auth::{AdminAuthUseCase, LoginRequest},
};

pub fn routes(db_pool: Arc<PgPoolSquad>, admin_secret: AdminSecret) -> Router {
    let admin_user_repository = AdminUserPostgres::new(Arc::clone(&db_pool));
    router(Arc::new(AdminAuthUseCase::new(
        Arc::new(admin_user_repository),
        admin_secret,
    )))
}

pub fn router<U>(usecase: Arc<AdminAuthUseCase<U>>) -> Router
where
    U: AdminUserRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/login", post(login))
        .with_state(usecase)
}

pub async fn login<U>(
    State(usecase): State<Arc<AdminAuthUseCase<U>>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response
where
    U: AdminUserRepository + Send + Sync + 'static,
{
    let Ok(Json(request)) = payload else {
        return error_body(StatusCode::BAD_REQUEST, "Username and password are required");
    };

    match usecase.login(request).await {
        Ok(response) => Json(response).into_response(),
        Err(err) => err.into_response(),
    }
}
