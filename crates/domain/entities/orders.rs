use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    domain::value_objects::enums::order_statuses::OrderStatus,
    infra::db::postgres::schema::orders,
};

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderEntity {
    pub id: Uuid,
    pub stripe_session_id: String,
    pub stripe_payment_id: Option<String>,
    pub customer_email: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub shipping_address: Option<String>,
    pub artwork_id: i32,
    pub artwork_title: String,
    pub artwork_price: Decimal,
    pub status: String,
    pub estimated_days: Option<i32>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderEntity {
    /// Rows are constrained by a CHECK on `status`, so an unknown value means schema drift.
    pub fn order_status(&self) -> anyhow::Result<OrderStatus> {
        self.status
            .parse::<OrderStatus>()
            .map_err(|err| anyhow::anyhow!("order {}: {}", self.id, err))
    }
}

/// The artwork title and price are copied here once and never written again.
#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = orders)]
pub struct InsertOrderEntity {
    pub stripe_session_id: String,
    pub customer_email: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub shipping_address: Option<String>,
    pub artwork_id: i32,
    pub artwork_title: String,
    pub artwork_price: Decimal,
    pub status: String,
}

/// Fulfilment fields edited from the back office. `None` clears the column.
#[derive(Debug, Clone, PartialEq, AsChangeset)]
#[diesel(table_name = orders)]
#[diesel(treat_none_as_null = true)]
pub struct UpdateOrderFulfilmentEntity {
    pub status: String,
    pub estimated_days: Option<i32>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}
