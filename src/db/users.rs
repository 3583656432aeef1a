use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::User;
use crate::store::{NewUser, UserPatch};

pub async fn create(pool: &PgPool, user: &NewUser) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (id, name, normalized_email, manager_id, salary, hire_date, is_active, password_hash)
         VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&user.name)
    .bind(&user.normalized_email)
    .bind(user.manager_id)
    .bind(user.salary)
    .bind(user.hire_date)
    .bind(&user.password_hash)
    .fetch_one(pool)
    .await
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE normalized_email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_all(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at, id")
        .fetch_all(pool)
        .await
}

/// Partial update keyed by email. Each optional column carries a flag saying
/// whether it is written at all; a set flag with a NULL value clears it.
pub async fn update_by_email(
    pool: &PgPool,
    email: &str,
    patch: &UserPatch,
) -> Result<(), sqlx::Error> {
    let (set_manager, manager_id) = split(patch.manager_id);
    let (set_salary, salary) = split(patch.salary);
    let (set_hire_date, hire_date): (bool, Option<NaiveDate>) = split(patch.hire_date);

    sqlx::query(
        "UPDATE users SET
            name = $2,
            manager_id = CASE WHEN $3 THEN $4 ELSE manager_id END,
            salary = CASE WHEN $5 THEN $6 ELSE salary END,
            hire_date = CASE WHEN $7 THEN $8 ELSE hire_date END,
            updated_at = now()
         WHERE normalized_email = $1",
    )
    .bind(email)
    .bind(&patch.name)
    .bind(set_manager)
    .bind(manager_id)
    .bind(set_salary)
    .bind(salary)
    .bind(set_hire_date)
    .bind(hire_date)
    .execute(pool)
    .await?;
    Ok(())
}

fn split<T>(change: Option<Option<T>>) -> (bool, Option<T>) {
    match change {
        Some(value) => (true, value),
        None => (false, None),
    }
}
