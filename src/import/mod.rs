pub mod chain;
pub mod fields;
pub mod manager;
pub mod parser;
pub mod pipeline;
pub mod reconcile;

use uuid::Uuid;

use crate::store::StoreError;

/// Failures that abort a whole upload. Bad cells never end up here; they are
/// collected into the batch result instead.
#[derive(Debug)]
pub enum ImportError {
    Csv(String),
    Store(StoreError),
    ManagementCycle(Uuid),
    UnknownUser(String),
    Credentials(String),
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Csv(msg) => write!(f, "Malformed CSV: {msg}"),
            ImportError::Store(err) => write!(f, "{err}"),
            ImportError::ManagementCycle(id) => {
                write!(f, "Management cycle detected involving user {id}")
            }
            ImportError::UnknownUser(email) => write!(f, "No user with email {email}"),
            ImportError::Credentials(msg) => write!(f, "Credential error: {msg}"),
        }
    }
}

impl std::error::Error for ImportError {}

impl From<StoreError> for ImportError {
    fn from(err: StoreError) -> Self {
        ImportError::Store(err)
    }
}
