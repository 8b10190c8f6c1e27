use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::entities::artworks::ArtworkEntity;

#[automock]
#[async_trait]
pub trait ArtworkRepository {
    async fn find_by_id(&self, artwork_id: i32) -> Result<Option<ArtworkEntity>>;
}
