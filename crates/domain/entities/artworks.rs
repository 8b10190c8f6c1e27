use diesel::prelude::*;
use rust_decimal::Decimal;

use crate::infra::db::postgres::schema::artworks;

/// The slice of an artwork the checkout flow reads. The catalogue itself is managed elsewhere.
#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = artworks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ArtworkEntity {
    pub id: i32,
    pub title: String,
    pub technique: Option<String>,
    pub dimensions: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub available: bool,
}
