use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::{ChainOfCommand, User};

use super::{DirectoryStore, NewUser, StoreError, UserPatch};

/// Process-local directory. Email uniqueness is enforced through the
/// `emails` index, which is always written before `users`.
#[derive(Default)]
pub struct MemoryDirectory {
    users: DashMap<Uuid, User>,
    /// normalized_email -> user id
    emails: DashMap<String, Uuid>,
    chains: DashMap<Uuid, ChainOfCommand>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DirectoryStore for MemoryDirectory {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let Some(id) = self.emails.get(email).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|user| user.value().clone()))
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(&id).map(|user| user.value().clone()))
    }

    async fn insert_user(&self, user: NewUser) -> Result<Uuid, StoreError> {
        let id = Uuid::now_v7();
        match self.emails.entry(user.normalized_email.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "A user with email {} already exists",
                user.normalized_email
            ))),
            Entry::Vacant(slot) => {
                slot.insert(id);
                let now = Utc::now();
                self.users.insert(
                    id,
                    User {
                        id,
                        name: user.name,
                        normalized_email: user.normalized_email,
                        manager_id: user.manager_id,
                        salary: user.salary,
                        hire_date: user.hire_date,
                        is_active: true,
                        password_hash: user.password_hash,
                        created_at: now,
                        updated_at: now,
                    },
                );
                Ok(id)
            }
        }
    }

    async fn update_user(&self, email: &str, patch: &UserPatch) -> Result<(), StoreError> {
        let Some(id) = self.emails.get(email).map(|entry| *entry.value()) else {
            return Ok(());
        };
        if let Some(mut user) = self.users.get_mut(&id) {
            user.name = patch.name.clone();
            if let Some(manager_id) = patch.manager_id {
                user.manager_id = manager_id;
            }
            if let Some(salary) = patch.salary {
                user.salary = salary;
            }
            if let Some(hire_date) = patch.hire_date {
                user.hire_date = hire_date;
            }
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.users.iter().map(|entry| entry.value().clone()).collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn find_chain(&self, user_id: Uuid) -> Result<Option<ChainOfCommand>, StoreError> {
        Ok(self.chains.get(&user_id).map(|chain| chain.value().clone()))
    }

    async fn replace_chain(&self, user_id: Uuid, managers: &[Uuid]) -> Result<(), StoreError> {
        self.chains.insert(
            user_id,
            ChainOfCommand {
                user_id,
                managers: managers.to_vec(),
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }
}
