use std::sync::Arc;

use anyhow::Result;
use backend::usecases::{
    payment_reconciliation::{PaymentReconciliationUseCase, SweepReport},
    stripe_gateway::StripeGateway,
};
use chrono::Utc;
use gallery::domain::repositories::orders::OrderRepository;
use tracing::{error, info};

use crate::config::config_model::ReconciliationConfig;

/// Periodically settles pending orders whose Stripe webhooks never arrived.
pub async fn run<O, S>(
    usecase: Arc<PaymentReconciliationUseCase<O, S>>,
    config: ReconciliationConfig,
) -> Result<()>
where
    O: OrderRepository + Send + Sync + 'static,
    S: StripeGateway + 'static,
{
    info!(
        interval_seconds = config.interval.as_secs(),
        stale_after_minutes = config.stale_after.num_minutes(),
        batch_size = config.batch_size,
        "checkout_reconciliation: starting worker loop"
    );

    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if let Err(err) = run_pass(&usecase, &config).await {
            error!(error = %err, "checkout_reconciliation: pass failed");
        }
    }
}

pub async fn run_pass<O, S>(
    usecase: &PaymentReconciliationUseCase<O, S>,
    config: &ReconciliationConfig,
) -> Result<SweepReport>
where
    O: OrderRepository + Send + Sync + 'static,
    S: StripeGateway + 'static,
{
    let created_before = Utc::now() - config.stale_after;

    let report = usecase
        .sweep_stale_checkouts(created_before, config.batch_size)
        .await?;

    if report.examined == 0 {
        info!("checkout_reconciliation: no stale pending orders");
    } else {
        info!(
            examined = report.examined,
            paid = report.paid,
            expired = report.expired,
            still_open = report.still_open,
            unchanged = report.unchanged,
            missing = report.missing,
            failed = report.failed,
            "checkout_reconciliation: pass finished"
        );
    }

    Ok(report)
}
