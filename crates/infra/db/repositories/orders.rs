use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{Connection, OptionalExtension, RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{artworks, orders},
    },
};
use domain::{
    entities::orders::{InsertOrderEntity, OrderEntity, UpdateOrderFulfilmentEntity},
    repositories::orders::OrderRepository,
    value_objects::{
        enums::order_statuses::OrderStatus,
        order_transitions::{PaymentEvent, TransitionDecision, decide_payment_transition},
        orders::PaymentEventOutcome,
    },
};

pub struct OrderPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl OrderPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl OrderRepository for OrderPostgres {
    async fn create_pending_order(&self, order: InsertOrderEntity) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let order_id = insert_into(orders::table)
            .values(&order)
            .returning(orders::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(order_id)
    }

    async fn find_by_id(&self, order_id: Uuid) -> Result<Option<OrderEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let order = orders::table
            .find(order_id)
            .select(OrderEntity::as_select())
            .first::<OrderEntity>(&mut conn)
            .optional()?;

        Ok(order)
    }

    async fn list_orders(&self) -> Result<Vec<OrderEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = orders::table
            .select(OrderEntity::as_select())
            .order(orders::created_at.desc())
            .load::<OrderEntity>(&mut conn)?;

        Ok(results)
    }

    async fn list_stale_pending_orders(
        &self,
        created_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<OrderEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = orders::table
            .select(OrderEntity::as_select())
            .filter(orders::status.eq(OrderStatus::Pending.as_str()))
            .filter(orders::created_at.lt(created_before))
            .order((
                orders::reconcile_checked_at.asc().nulls_first(),
                orders::created_at.asc(),
            ))
            .limit(limit)
            .load::<OrderEntity>(&mut conn)?;

        Ok(results)
    }

    async fn mark_reconcile_checked(
        &self,
        order_id: Uuid,
        checked_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(orders::table.find(order_id))
            .set(orders::reconcile_checked_at.eq(Some(checked_at)))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn apply_payment_event(
        &self,
        stripe_session_id: &str,
        event: PaymentEvent,
    ) -> Result<PaymentEventOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let outcome = conn.transaction::<PaymentEventOutcome, anyhow::Error, _>(|tx| {
            // Row lock serialises concurrent deliveries of the same session.
            let order = orders::table
                .filter(orders::stripe_session_id.eq(stripe_session_id))
                .select(OrderEntity::as_select())
                .for_update()
                .first::<OrderEntity>(tx)
                .optional()?;

            let Some(order) = order else {
                return Ok(PaymentEventOutcome::UnmatchedSession);
            };

            let current = order.order_status()?;
            let next = match decide_payment_transition(current, &event) {
                TransitionDecision::Apply(next) => next,
                decision => {
                    return Ok(PaymentEventOutcome::Unchanged {
                        order_id: order.id,
                        status: current,
                        decision,
                    });
                }
            };

            let now = Utc::now();
            let artwork_marked_unavailable = match &event {
                PaymentEvent::Completed { payment_intent_id } => {
                    update(orders::table.find(order.id))
                        .set((
                            orders::status.eq(next.as_str()),
                            orders::stripe_payment_id.eq(payment_intent_id.as_deref()),
                            orders::updated_at.eq(now),
                        ))
                        .execute(tx)?;

                    let artwork_rows = update(artworks::table.find(order.artwork_id))
                        .set((
                            artworks::available.eq(false),
                            artworks::updated_at.eq(now),
                        ))
                        .execute(tx)?;

                    artwork_rows == 1
                }
                PaymentEvent::Expired => {
                    update(orders::table.find(order.id))
                        .set((
                            orders::status.eq(next.as_str()),
                            orders::updated_at.eq(now),
                        ))
                        .execute(tx)?;

                    false
                }
            };

            Ok(PaymentEventOutcome::Applied {
                order_id: order.id,
                artwork_id: order.artwork_id,
                from: current,
                to: next,
                artwork_marked_unavailable,
            })
        })?;

        Ok(outcome)
    }

    async fn update_fulfilment(
        &self,
        order_id: Uuid,
        expected_status: OrderStatus,
        changes: UpdateOrderFulfilmentEntity,
    ) -> Result<Option<OrderEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let updated = update(
            orders::table
                .filter(orders::id.eq(order_id))
                .filter(orders::status.eq(expected_status.as_str())),
        )
        .set(&changes)
        .returning(OrderEntity::as_select())
        .get_result::<OrderEntity>(&mut conn)
        .optional()?;

        Ok(updated)
    }
}

/// These run against a migrated database and are skipped when `DATABASE_URL` is unset.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::db::postgres::postgres_connection::establish_connection;
    use diesel::delete;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn test_pool() -> Option<Arc<PgPoolSquad>> {
        dotenvy::dotenv().ok();
        let url = std::env::var("DATABASE_URL").ok()?;
        Some(Arc::new(
            establish_connection(&url).expect("DATABASE_URL is set but unreachable"),
        ))
    }

    fn seed_artwork(pool: &PgPoolSquad, title: &str, price: Decimal) -> i32 {
        let mut conn = pool.get().unwrap();
        insert_into(artworks::table)
            .values((
                artworks::title.eq(title),
                artworks::price.eq(price),
                artworks::available.eq(true),
            ))
            .returning(artworks::id)
            .get_result::<i32>(&mut conn)
            .unwrap()
    }

    async fn seed_pending_order(
        repo: &OrderPostgres,
        artwork_id: i32,
        title: &str,
        price: Decimal,
    ) -> (Uuid, String) {
        let session_id = format!("cs_test_{}", Uuid::new_v4().simple());
        let order_id = repo
            .create_pending_order(InsertOrderEntity {
                stripe_session_id: session_id.clone(),
                customer_email: "ana@example.com".to_string(),
                customer_name: "Ana García".to_string(),
                customer_phone: None,
                shipping_address: Some("Calle Mayor 1, Madrid".to_string()),
                artwork_id,
                artwork_title: title.to_string(),
                artwork_price: price,
                status: OrderStatus::Pending.to_string(),
            })
            .await
            .unwrap();
        (order_id, session_id)
    }

    fn artwork_available(pool: &PgPoolSquad, artwork_id: i32) -> bool {
        let mut conn = pool.get().unwrap();
        artworks::table
            .find(artwork_id)
            .select(artworks::available)
            .first::<bool>(&mut conn)
            .unwrap()
    }

    fn set_artwork_available(pool: &PgPoolSquad, artwork_id: i32, available: bool) {
        let mut conn = pool.get().unwrap();
        update(artworks::table.find(artwork_id))
            .set(artworks::available.eq(available))
            .execute(&mut conn)
            .unwrap();
    }

    fn cleanup(pool: &PgPoolSquad, order_id: Uuid, artwork_id: i32) {
        let mut conn = pool.get().unwrap();
        delete(orders::table.find(order_id))
            .execute(&mut conn)
            .unwrap();
        delete(artworks::table.find(artwork_id))
            .execute(&mut conn)
            .unwrap();
    }

    fn completed(payment_intent_id: &str) -> PaymentEvent {
        PaymentEvent::Completed {
            payment_intent_id: Some(payment_intent_id.to_string()),
        }
    }

    #[tokio::test]
    async fn repeated_completion_flips_the_artwork_only_once() {
        let Some(pool) = test_pool() else { return };
        let repo = OrderPostgres::new(Arc::clone(&pool));
        let artwork_id = seed_artwork(&pool, "Atardecer en el Mar", dec!(1200.00));
        let (order_id, session_id) =
            seed_pending_order(&repo, artwork_id, "Atardecer en el Mar", dec!(1200.00)).await;

        let first = repo
            .apply_payment_event(&session_id, completed("pi_first"))
            .await
            .unwrap();
        assert_eq!(
            first,
            PaymentEventOutcome::Applied {
                order_id,
                artwork_id,
                from: OrderStatus::Pending,
                to: OrderStatus::Paid,
                artwork_marked_unavailable: true,
            }
        );
        assert!(!artwork_available(&pool, artwork_id));

        // Relisted by hand so a second flip would be visible.
        set_artwork_available(&pool, artwork_id, true);

        let second = repo
            .apply_payment_event(&session_id, completed("pi_second"))
            .await
            .unwrap();
        assert_eq!(
            second,
            PaymentEventOutcome::Unchanged {
                order_id,
                status: OrderStatus::Paid,
                decision: TransitionDecision::Duplicate,
            }
        );
        assert!(artwork_available(&pool, artwork_id));

        let order = repo.find_by_id(order_id).await.unwrap().unwrap();
        assert_eq!(order.status, "paid");
        assert_eq!(order.stripe_payment_id.as_deref(), Some("pi_first"));

        cleanup(&pool, order_id, artwork_id);
    }

    #[tokio::test]
    async fn expiry_keeps_the_artwork_for_sale() {
        let Some(pool) = test_pool() else { return };
        let repo = OrderPostgres::new(Arc::clone(&pool));
        let artwork_id = seed_artwork(&pool, "Bosque en Otoño", dec!(850.00));
        let (order_id, session_id) =
            seed_pending_order(&repo, artwork_id, "Bosque en Otoño", dec!(850.00)).await;

        let outcome = repo
            .apply_payment_event(&session_id, PaymentEvent::Expired)
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            PaymentEventOutcome::Applied {
                to: OrderStatus::Expired,
                artwork_marked_unavailable: false,
                ..
            }
        ));
        assert!(artwork_available(&pool, artwork_id));

        let late_payment = repo
            .apply_payment_event(&session_id, completed("pi_late"))
            .await
            .unwrap();
        assert!(matches!(
            late_payment,
            PaymentEventOutcome::Unchanged {
                status: OrderStatus::Expired,
                decision: TransitionDecision::Anomalous,
                ..
            }
        ));
        assert!(artwork_available(&pool, artwork_id));

        cleanup(&pool, order_id, artwork_id);
    }

    #[tokio::test]
    async fn unknown_session_is_unmatched() {
        let Some(pool) = test_pool() else { return };
        let repo = OrderPostgres::new(pool);

        let outcome = repo
            .apply_payment_event(
                &format!("cs_unknown_{}", Uuid::new_v4().simple()),
                completed("pi_unknown"),
            )
            .await
            .unwrap();

        assert_eq!(outcome, PaymentEventOutcome::UnmatchedSession);
    }

    #[tokio::test]
    async fn order_keeps_its_snapshot_when_the_artwork_is_edited() {
        let Some(pool) = test_pool() else { return };
        let repo = OrderPostgres::new(Arc::clone(&pool));
        let artwork_id = seed_artwork(&pool, "Retrato de Luz", dec!(640.50));
        let (order_id, _) =
            seed_pending_order(&repo, artwork_id, "Retrato de Luz", dec!(640.50)).await;

        {
            let mut conn = pool.get().unwrap();
            update(artworks::table.find(artwork_id))
                .set((
                    artworks::title.eq("Retrato de Luz (revisado)"),
                    artworks::price.eq(dec!(990.00)),
                ))
                .execute(&mut conn)
                .unwrap();
        }

        let order = repo.find_by_id(order_id).await.unwrap().unwrap();
        assert_eq!(order.artwork_title, "Retrato de Luz");
        assert_eq!(order.artwork_price, dec!(640.50));

        cleanup(&pool, order_id, artwork_id);
    }

    #[tokio::test]
    async fn snapshot_columns_cannot_be_rewritten() {
        let Some(pool) = test_pool() else { return };
        let repo = OrderPostgres::new(Arc::clone(&pool));
        let artwork_id = seed_artwork(&pool, "Marina", dec!(300.00));
        let (order_id, _) = seed_pending_order(&repo, artwork_id, "Marina", dec!(300.00)).await;

        {
            let mut conn = pool.get().unwrap();
            let price_rewrite = update(orders::table.find(order_id))
                .set(orders::artwork_price.eq(dec!(1.00)))
                .execute(&mut conn);
            assert!(price_rewrite.is_err());

            let title_rewrite = update(orders::table.find(order_id))
                .set(orders::artwork_title.eq("Otra obra"))
                .execute(&mut conn);
            assert!(title_rewrite.is_err());
        }

        let order = repo.find_by_id(order_id).await.unwrap().unwrap();
        assert_eq!(order.artwork_title, "Marina");
        assert_eq!(order.artwork_price, dec!(300.00));

        cleanup(&pool, order_id, artwork_id);
    }

    #[tokio::test]
    async fn fulfilment_update_requires_the_expected_status() {
        let Some(pool) = test_pool() else { return };
        let repo = OrderPostgres::new(Arc::clone(&pool));
        let artwork_id = seed_artwork(&pool, "Nocturno", dec!(450.00));
        let (order_id, session_id) =
            seed_pending_order(&repo, artwork_id, "Nocturno", dec!(450.00)).await;

        let changes = UpdateOrderFulfilmentEntity {
            status: OrderStatus::Shipped.to_string(),
            estimated_days: Some(4),
            tracking_number: Some("ES987654321".to_string()),
            notes: None,
            updated_at: Utc::now(),
        };

        let stale = repo
            .update_fulfilment(order_id, OrderStatus::Paid, changes.clone())
            .await
            .unwrap();
        assert!(stale.is_none());

        repo.apply_payment_event(&session_id, completed("pi_nocturno"))
            .await
            .unwrap();
        let shipped = repo
            .update_fulfilment(order_id, OrderStatus::Paid, changes)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(shipped.status, "shipped");
        assert_eq!(shipped.tracking_number.as_deref(), Some("ES987654321"));

        cleanup(&pool, order_id, artwork_id);
    }

    #[tokio::test]
    async fn reconcile_check_is_recorded() {
        let Some(pool) = test_pool() else { return };
        let repo = OrderPostgres::new(Arc::clone(&pool));
        let artwork_id = seed_artwork(&pool, "Horizonte", dec!(275.00));
        let (order_id, _) = seed_pending_order(&repo, artwork_id, "Horizonte", dec!(275.00)).await;

        let checked_at = Utc::now();
        repo.mark_reconcile_checked(order_id, checked_at)
            .await
            .unwrap();

        let stored = {
            let mut conn = pool.get().unwrap();
            orders::table
                .find(order_id)
                .select(orders::reconcile_checked_at)
                .first::<Option<DateTime<Utc>>>(&mut conn)
                .unwrap()
        };
        let stored = stored.unwrap();
        assert!((stored - checked_at).num_milliseconds().abs() < 1);

        cleanup(&pool, order_id, artwork_id);
    }
}
