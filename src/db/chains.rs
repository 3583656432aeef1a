use sqlx::PgPool;
use uuid::Uuid;

use crate::models::ChainOfCommand;

pub async fn find_by_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<ChainOfCommand>, sqlx::Error> {
    sqlx::query_as::<_, ChainOfCommand>("SELECT * FROM chains_of_command WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn replace(
    pool: &PgPool,
    user_id: Uuid,
    managers: &[Uuid],
) -> Result<ChainOfCommand, sqlx::Error> {
    sqlx::query_as::<_, ChainOfCommand>(
        "INSERT INTO chains_of_command (user_id, managers) VALUES ($1, $2)
         ON CONFLICT (user_id) DO UPDATE SET managers = EXCLUDED.managers, updated_at = now()
         RETURNING *",
    )
    .bind(user_id)
    .bind(managers)
    .fetch_one(pool)
    .await
}
