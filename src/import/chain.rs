use std::collections::{HashMap, HashSet, VecDeque};

use uuid::Uuid;

use crate::config::ChainPolicy;
use crate::models::User;
use crate::store::DirectoryStore;

use super::ImportError;

/// Walk live manager pointers upward from `start_manager_id`.
///
/// Returns ancestors nearest first. Stops at an ancestor without a manager or
/// one that no longer exists; revisiting an id is a management cycle.
pub async fn get_chain_of_command(
    store: &dyn DirectoryStore,
    start_manager_id: Uuid,
) -> Result<Vec<Uuid>, ImportError> {
    let mut chain = vec![start_manager_id];
    let mut seen = HashSet::from([start_manager_id]);
    let mut current = start_manager_id;

    while let Some(ancestor) = store.find_user_by_id(current).await? {
        let Some(next) = ancestor.manager_id else {
            break;
        };
        if !seen.insert(next) {
            return Err(ImportError::ManagementCycle(next));
        }
        chain.push(next);
        current = next;
    }

    Ok(chain)
}

/// Recompute and store the chain of command for the user with this email.
pub async fn create_chain_of_command(
    store: &dyn DirectoryStore,
    user_email: &str,
    manager_id: Option<Uuid>,
) -> Result<Vec<Uuid>, ImportError> {
    let user = store
        .find_user_by_email(user_email)
        .await?
        .ok_or_else(|| ImportError::UnknownUser(user_email.to_string()))?;

    let managers = match manager_id {
        Some(manager_id) => get_chain_of_command(store, manager_id).await?,
        None => Vec::new(),
    };

    store.replace_chain(user.id, &managers).await?;
    Ok(managers)
}

/// Refresh stored chains after a batch. Returns how many were rewritten.
///
/// `touched` holds users created in the batch or whose manager changed; it is
/// only consulted by `ChainPolicy::Changed`, which widens it to every
/// transitive report.
pub async fn rebuild(
    store: &dyn DirectoryStore,
    policy: ChainPolicy,
    touched: &HashSet<Uuid>,
) -> Result<usize, ImportError> {
    let users = store.list_users().await?;

    let targets: Vec<&User> = match policy {
        ChainPolicy::All => users.iter().collect(),
        ChainPolicy::Changed => {
            let affected = with_reports(&users, touched);
            users.iter().filter(|user| affected.contains(&user.id)).collect()
        }
    };

    for user in &targets {
        create_chain_of_command(store, &user.normalized_email, user.manager_id).await?;
    }

    Ok(targets.len())
}

/// `roots` plus everyone who reports to one of them, directly or not.
fn with_reports(users: &[User], roots: &HashSet<Uuid>) -> HashSet<Uuid> {
    let mut reports: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for user in users {
        if let Some(manager_id) = user.manager_id {
            reports.entry(manager_id).or_default().push(user.id);
        }
    }

    let mut affected = roots.clone();
    let mut queue: VecDeque<Uuid> = roots.iter().copied().collect();
    while let Some(id) = queue.pop_front() {
        for report in reports.get(&id).into_iter().flatten() {
            if affected.insert(*report) {
                queue.push_back(*report);
            }
        }
    }
    affected
}
