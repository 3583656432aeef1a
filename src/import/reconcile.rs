use chrono::NaiveDate;
use uuid::Uuid;

use crate::credentials;
use crate::store::{DirectoryStore, NewUser, UserPatch};

use super::fields::Field;
use super::ImportError;

/// A row whose identity fields passed validation.
#[derive(Debug, Clone)]
pub struct ValidRow {
    pub name: String,
    pub email: String,
    pub manager_id: Field<Uuid>,
    pub salary: Field<i64>,
    pub hire_date: Field<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created(Uuid),
    Updated { id: Uuid, manager_changed: bool },
}

/// Create the user if the email is new, otherwise patch the existing record.
pub async fn apply(
    store: &dyn DirectoryStore,
    row: ValidRow,
    initial_password: &str,
) -> Result<Outcome, ImportError> {
    match store.find_user_by_email(&row.email).await? {
        None => {
            let password_hash =
                credentials::hash(initial_password).map_err(ImportError::Credentials)?;
            let id = store
                .insert_user(NewUser {
                    name: row.name,
                    normalized_email: row.email,
                    manager_id: row.manager_id.into_option(),
                    salary: row.salary.into_option(),
                    hire_date: row.hire_date.into_option(),
                    password_hash,
                })
                .await?;
            Ok(Outcome::Created(id))
        }
        Some(existing) => {
            let patch = UserPatch {
                name: row.name,
                manager_id: row.manager_id.into_change(),
                salary: row.salary.into_change(),
                hire_date: row.hire_date.into_change(),
            };
            let manager_changed = patch
                .manager_id
                .is_some_and(|manager| manager != existing.manager_id);

            store.update_user(&row.email, &patch).await?;
            Ok(Outcome::Updated {
                id: existing.id,
                manager_changed,
            })
        }
    }
}
