use anyhow::Result;
use backend::usecases::payment_reconciliation::PaymentReconciliationUseCase;
use gallery::{
    infra::db::{postgres::postgres_connection, repositories::orders::OrderPostgres},
    payments::stripe_client::StripeClient,
};
use std::sync::Arc;
use tracing::{error, info};
use worker::{config, services::checkout_reconciliation};

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(error) = run().await {
        error!("Worker exited with error: {}", error);
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    gallery::observability::init_observability("worker")?;

    let dotenvy_env = config::config_loader::load()?;
    info!("ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(&dotenvy_env.database.url)?;
    info!("Postgres connection has been established");

    let order_repository = OrderPostgres::new(Arc::new(postgres_pool));
    // No webhook secret: the worker never verifies deliveries.
    let stripe_client = StripeClient::new(
        dotenvy_env.stripe.secret_key.clone(),
        String::new(),
        dotenvy_env.storefront.checkout_success_url(),
        dotenvy_env.storefront.checkout_cancel_url(),
    );

    let usecase = Arc::new(PaymentReconciliationUseCase::new(
        Arc::new(order_repository),
        Arc::new(stripe_client),
    ));

    let reconciliation_loop = tokio::spawn(checkout_reconciliation::run(
        usecase,
        dotenvy_env.reconciliation.clone(),
    ));

    tokio::select! {
        result = reconciliation_loop => result??,
        _ = tokio::signal::ctrl_c() => info!("Received ctrl+C signal"),
    };

    Ok(())
}
