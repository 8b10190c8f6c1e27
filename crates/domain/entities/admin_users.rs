use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::infra::db::postgres::schema::admin_users;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = admin_users)]
pub struct AdminUserEntity {
    pub id: i32,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}
