use crate::{
    axum_http::{default_routers, routers},
    config::{config_loader, config_model::DotEnvyConfig},
};
use anyhow::Result;
use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use gallery::{
    infra::db::postgres::postgres_connection::PgPoolSquad, payments::stripe_client::StripeClient,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

pub async fn start(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Result<()> {
    let stripe_client = Arc::new(
        StripeClient::new(
            config.stripe.secret_key.clone(),
            config.stripe.webhook_secret.clone(),
            config.storefront.checkout_success_url(),
            config.storefront.checkout_cancel_url(),
        )
        .with_webhook_tolerance(config.stripe.webhook_tolerance_seconds),
    );
    let admin_secret = config_loader::get_admin_secret()?;

    let app = Router::new()
        .fallback(default_routers::not_found)
        .nest(
            "/api/checkout",
            routers::checkout::routes(
                Arc::clone(&db_pool),
                Arc::clone(&stripe_client),
                config.stripe.currency.clone(),
            ),
        )
        .nest(
            "/api/webhook",
            routers::stripe_webhook::routes(Arc::clone(&db_pool), Arc::clone(&stripe_client)),
        )
        .nest("/api/orders", routers::orders::routes(Arc::clone(&db_pool)))
        .nest(
            "/api/auth",
            routers::admin_auth::routes(Arc::clone(&db_pool), admin_secret),
        )
        .route("/api/health-check", get(default_routers::health_check))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.backend_server.timeout,
        )))
        .layer(RequestBodyLimitLayer::new(
            (config.backend_server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::PUT])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.backend_server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
