//! Persistence seam for the user directory.
//!
//! Reconciliation only needs point lookups, insert, partial update keyed by
//! normalized email, and chain upserts. Postgres backs production; the
//! in-memory directory backs local runs without a database and the tests.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{ChainOfCommand, User};

pub use memory::MemoryDirectory;
pub use postgres::PgDirectory;

/// Fields of a user about to be inserted. The store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub normalized_email: String,
    pub manager_id: Option<Uuid>,
    pub salary: Option<i64>,
    pub hire_date: Option<NaiveDate>,
    pub password_hash: String,
}

/// Partial update of an existing user. The name is always written; for the
/// other columns `None` leaves the stored value alone and `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub name: String,
    pub manager_id: Option<Option<Uuid>>,
    pub salary: Option<Option<i64>>,
    pub hire_date: Option<Option<NaiveDate>>,
}

#[derive(Debug)]
pub enum StoreError {
    Conflict(String),
    Database(sqlx::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            StoreError::Database(err) => write!(f, "Database Error: {err}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StoreError::Conflict(db_err.message().to_string())
            }
            _ => StoreError::Database(err),
        }
    }
}

#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Insert a user, failing with `Conflict` if the email is taken.
    async fn insert_user(&self, user: NewUser) -> Result<Uuid, StoreError>;

    /// Apply a patch to the user with this email. Missing users are ignored.
    async fn update_user(&self, email: &str, patch: &UserPatch) -> Result<(), StoreError>;

    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    async fn find_chain(&self, user_id: Uuid) -> Result<Option<ChainOfCommand>, StoreError>;

    /// Upsert the chain for a user, replacing any previous record.
    async fn replace_chain(&self, user_id: Uuid, managers: &[Uuid]) -> Result<(), StoreError>;
}
