use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::credentials;
use crate::store::{DirectoryStore, NewUser};

use super::fields::{self, Field, FieldError};
use super::parser::Row;
use super::ImportError;

#[derive(Debug, Clone, PartialEq)]
pub enum ManagerLookup {
    /// The row names no manager.
    Blank,
    Invalid(FieldError),
    Found(Uuid),
    /// Well-formed email with no matching user yet.
    NotFound(String),
}

/// Look a manager reference up by its normalized email.
pub async fn process_manager_id(
    store: &dyn DirectoryStore,
    raw: &str,
) -> Result<ManagerLookup, ImportError> {
    let email = match check_manager_email(raw) {
        Field::Value(email) => email,
        Field::Blank => return Ok(ManagerLookup::Blank),
        Field::Invalid(err) => return Ok(ManagerLookup::Invalid(err)),
    };

    Ok(match store.find_user_by_email(&email).await? {
        Some(manager) => ManagerLookup::Found(manager.id),
        None => ManagerLookup::NotFound(email),
    })
}

/// Syntax-only check of a manager reference.
pub fn check_manager_email(raw: &str) -> Field<String> {
    match fields::validate_email(raw) {
        Field::Invalid(_) => Field::Invalid(FieldError::InvalidManager(raw.to_string())),
        other => other,
    }
}

/// Which emails a batch vouches for, built once before the row loop.
///
/// An unknown manager email is corroborated when the batch contains a row for
/// that person, or when more than one row names them as manager (the row being
/// resolved accounts for one of those references). Rows with an invalid name or
/// email are skipped by the import, so they count for neither.
#[derive(Debug, Default)]
pub struct ManagerIndex {
    own_emails: HashSet<String>,
    manager_refs: HashMap<String, usize>,
}

impl ManagerIndex {
    pub fn build(rows: &[Row]) -> Self {
        let mut index = Self::default();
        for row in rows {
            let identity = (
                fields::validate_name(&row.name),
                fields::validate_user_email(&row.email),
            );
            let (Field::Value(_), Field::Value(email)) = identity else {
                continue;
            };
            index.own_emails.insert(email);
            let manager = fields::normalize_email(&row.manager);
            if !manager.is_empty() {
                *index.manager_refs.entry(manager).or_insert(0) += 1;
            }
        }
        index
    }

    pub fn corroborates(&self, email: &str) -> bool {
        self.own_emails.contains(email)
            || self.manager_refs.get(email).is_some_and(|count| *count > 1)
    }
}

/// Insert a skeleton user for a manager the batch refers to before (or
/// without) listing them. A later row for the same email fills it in.
pub async fn create_placeholder(
    store: &dyn DirectoryStore,
    email: &str,
    initial_password: &str,
) -> Result<Uuid, ImportError> {
    let password_hash = credentials::hash(initial_password).map_err(ImportError::Credentials)?;
    let id = store
        .insert_user(NewUser {
            name: String::new(),
            normalized_email: email.to_string(),
            manager_id: None,
            salary: None,
            hire_date: None,
            password_hash,
        })
        .await?;
    tracing::warn!("Created placeholder user {id} for manager {email}");
    Ok(id)
}
