use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::models::{ChainOfCommand, User};

use super::{DirectoryStore, NewUser, StoreError, UserPatch};

#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DirectoryStore for PgDirectory {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(db::users::find_by_email(&self.pool, email).await?)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(db::users::find_by_id(&self.pool, id).await?)
    }

    async fn insert_user(&self, user: NewUser) -> Result<Uuid, StoreError> {
        let created = db::users::create(&self.pool, &user).await?;
        Ok(created.id)
    }

    async fn update_user(&self, email: &str, patch: &UserPatch) -> Result<(), StoreError> {
        db::users::update_by_email(&self.pool, email, patch).await?;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(db::users::list_all(&self.pool).await?)
    }

    async fn find_chain(&self, user_id: Uuid) -> Result<Option<ChainOfCommand>, StoreError> {
        Ok(db::chains::find_by_user(&self.pool, user_id).await?)
    }

    async fn replace_chain(&self, user_id: Uuid, managers: &[Uuid]) -> Result<(), StoreError> {
        db::chains::replace(&self.pool, user_id, managers).await?;
        Ok(())
    }
}
