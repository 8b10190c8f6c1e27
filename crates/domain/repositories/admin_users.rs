use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::entities::admin_users::AdminUserEntity;

#[automock]
#[async_trait]
pub trait AdminUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<AdminUserEntity>>;
}
