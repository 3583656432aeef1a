use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ancestor managers of one user, nearest first.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ChainOfCommand {
    pub user_id: Uuid,
    pub managers: Vec<Uuid>,
    pub updated_at: DateTime<Utc>,
}
