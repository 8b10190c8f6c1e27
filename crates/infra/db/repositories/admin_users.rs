use anyhow::Result;
use async_trait::async_trait;
use diesel::{OptionalExtension, RunQueryDsl, prelude::*};
use std::sync::Arc;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::admin_users},
};
use domain::{
    entities::admin_users::AdminUserEntity, repositories::admin_users::AdminUserRepository,
};

pub struct AdminUserPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl AdminUserPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl AdminUserRepository for AdminUserPostgres {
    async fn find_by_username(&self, username: &str) -> Result<Option<AdminUserEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let user = admin_users::table
            .filter(admin_users::username.eq(username))
            .select(AdminUserEntity::as_select())
            .first::<AdminUserEntity>(&mut conn)
            .optional()?;

        Ok(user)
    }
}
