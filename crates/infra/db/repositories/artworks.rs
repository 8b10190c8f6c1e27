use anyhow::Result;
use async_trait::async_trait;
use diesel::{OptionalExtension, RunQueryDsl, prelude::*};
use std::sync::Arc;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::artworks},
};
use domain::{entities::artworks::ArtworkEntity, repositories::artworks::ArtworkRepository};

pub struct ArtworkPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl ArtworkPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl ArtworkRepository for ArtworkPostgres {
    async fn find_by_id(&self, artwork_id: i32) -> Result<Option<ArtworkEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let artwork = artworks::table
            .find(artwork_id)
            .select(ArtworkEntity::as_select())
            .first::<ArtworkEntity>(&mut conn)
            .optional()?;

        Ok(artwork)
    }
}
