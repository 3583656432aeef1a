use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ImportOptions;
use crate::store::DirectoryStore;

use super::chain;
use super::fields::{self, Field, FieldError};
use super::manager::{self, ManagerIndex, ManagerLookup};
use super::parser;
use super::reconcile::{self, Outcome, ValidRow};
use super::ImportError;

/// Summary returned for one upload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub num_created: u64,
    pub num_updated: u64,
    pub errors: Vec<String>,
}

impl BatchResult {
    /// Record the field's error, if any, and hand the field back.
    pub fn track<T>(&mut self, field: Field<T>) -> Field<T> {
        if let Field::Invalid(err) = &field {
            self.errors.push(err.to_string());
        }
        field
    }
}

/// Reconcile one CSV upload against the directory, then refresh chains of
/// command. Rows are applied one at a time and stay applied if a later storage
/// error aborts the batch.
pub async fn run(
    store: &dyn DirectoryStore,
    options: &ImportOptions,
    text: &str,
) -> Result<BatchResult, ImportError> {
    let rows = parser::parse_csv(text)?;
    let index = ManagerIndex::build(&rows);

    let mut result = BatchResult::default();
    let mut touched: HashSet<Uuid> = HashSet::new();

    for (n, row) in rows.iter().enumerate() {
        let name = result.track(fields::validate_name(&row.name));
        let email = result.track(fields::validate_user_email(&row.email));

        let (Field::Value(name), Field::Value(email)) = (name, email) else {
            result.track(manager::check_manager_email(&row.manager));
            result.track(fields::process_salary(&row.salary));
            result.track(fields::process_hire_date(&row.hire_date));
            tracing::debug!("Row {}: invalid name or email, skipped", n + 1);
            continue;
        };

        let manager_id = result.track(
            resolve_manager(store, options, &index, &row.manager, &email, &mut touched).await?,
        );
        let salary = result.track(fields::process_salary(&row.salary));
        let hire_date = result.track(fields::process_hire_date(&row.hire_date));

        let valid = ValidRow {
            name,
            email,
            manager_id,
            salary,
            hire_date,
        };
        match reconcile::apply(store, valid, &options.initial_password).await? {
            Outcome::Created(id) => {
                result.num_created += 1;
                touched.insert(id);
                tracing::debug!("Row {}: created user {id}", n + 1);
            }
            Outcome::Updated { id, manager_changed } => {
                result.num_updated += 1;
                if manager_changed {
                    touched.insert(id);
                }
                tracing::debug!("Row {}: updated user {id}", n + 1);
            }
        }
    }

    let rebuilt = chain::rebuild(store, options.chain_policy, &touched).await?;

    tracing::info!(
        "CSV upload reconciled: {} rows, {} created, {} updated, {} errors, {rebuilt} chains rebuilt",
        rows.len(),
        result.num_created,
        result.num_updated,
        result.errors.len()
    );

    Ok(result)
}

/// Resolve a row's manager cell, creating a placeholder for a manager the
/// batch vouches for but the directory does not know yet. Placeholders join
/// `touched` so they get a chain even if no later row fills them in.
async fn resolve_manager(
    store: &dyn DirectoryStore,
    options: &ImportOptions,
    index: &ManagerIndex,
    raw: &str,
    own_email: &str,
    touched: &mut HashSet<Uuid>,
) -> Result<Field<Uuid>, ImportError> {
    if fields::normalize_email(raw) == own_email {
        return Ok(Field::Invalid(FieldError::SelfManaged(own_email.to_string())));
    }

    Ok(match manager::process_manager_id(store, raw).await? {
        ManagerLookup::Blank => Field::Blank,
        ManagerLookup::Invalid(err) => Field::Invalid(err),
        ManagerLookup::Found(id) => Field::Value(id),
        ManagerLookup::NotFound(email) if index.corroborates(&email) => {
            let id = manager::create_placeholder(store, &email, &options.initial_password).await?;
            touched.insert(id);
            Field::Value(id)
        }
        ManagerLookup::NotFound(email) => Field::Invalid(FieldError::InvalidManager(email)),
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::config::ChainPolicy;
    use crate::models::User;
    use crate::store::MemoryDirectory;

    const HEADER: &str = "Name,Email,Manager,Salary,Hire Date\n";

    async fn upload(store: &MemoryDirectory, rows: &str) -> BatchResult {
        upload_with(store, ChainPolicy::All, rows).await
    }

    async fn upload_with(store: &MemoryDirectory, policy: ChainPolicy, rows: &str) -> BatchResult {
        let options = ImportOptions {
            chain_policy: policy,
            ..ImportOptions::default()
        };
        run(store, &options, &format!("{HEADER}{rows}")).await.unwrap()
    }

    async fn user(store: &MemoryDirectory, email: &str) -> User {
        store.find_user_by_email(email).await.unwrap().unwrap()
    }

    async fn chain_of(store: &MemoryDirectory, email: &str) -> Vec<Uuid> {
        let id = user(store, email).await.id;
        store.find_chain(id).await.unwrap().unwrap().managers
    }

    /// Stored chain as manager emails, comparable across stores.
    async fn chain_emails(store: &MemoryDirectory, email: &str) -> Vec<String> {
        let mut emails = Vec::new();
        for id in chain_of(store, email).await {
            let manager = store.find_user_by_id(id).await.unwrap().unwrap();
            emails.push(manager.normalized_email);
        }
        emails
    }

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    /// Brad (root) and Ted reporting to Brad.
    async fn seeded() -> MemoryDirectory {
        let store = MemoryDirectory::new();
        upload(
            &store,
            "Brad Jones,bjones@performyard.com,,90000,02/10/2010\n\
             Ted Harrison,tharrison@performyard.com,bjones@performyard.com,50000,10/20/2012\n",
        )
        .await;
        store
    }

    #[tokio::test]
    async fn creates_users_and_chains_in_an_empty_store() {
        let store = MemoryDirectory::new();
        let result = upload(
            &store,
            "Brad Jones,bjones@x.com,,100000,02/10/2010\n\
             John Smith,jsmith@x.com,bjones@x.com,80000,07/16/2018\n",
        )
        .await;

        assert_eq!(result, BatchResult { num_created: 2, num_updated: 0, errors: vec![] });

        let brad = user(&store, "bjones@x.com").await;
        let john = user(&store, "jsmith@x.com").await;
        assert_eq!(john.manager_id, Some(brad.id));
        assert_eq!(john.salary, Some(80000));
        assert_eq!(john.hire_date, date(2018, 7, 16));
        assert_eq!(chain_of(&store, "jsmith@x.com").await, vec![brad.id]);
        assert!(chain_of(&store, "bjones@x.com").await.is_empty());
    }

    #[tokio::test]
    async fn updates_existing_and_creates_new() {
        let store = seeded().await;
        let result = upload(
            &store,
            "Brad Jones,bjones@performyard.com,,100000,02/10/2010\n\
             John Smith,jsmith@performyard.com,bjones@performyard.com,80000,07/16/2018\n",
        )
        .await;

        assert_eq!(result.num_created, 1);
        assert_eq!(result.num_updated, 1);
        assert!(result.errors.is_empty());
        assert_eq!(store.list_users().await.unwrap().len(), 3);
        assert_eq!(user(&store, "bjones@performyard.com").await.salary, Some(100000));
    }

    #[tokio::test]
    async fn invalid_salary_leaves_stored_salary_untouched() {
        let store = seeded().await;
        let result = upload(
            &store,
            "Bradley Jones,bjones@performyard.com,,NOT A NUMBER,02/10/2010\n",
        )
        .await;

        assert_eq!(result.num_updated, 1);
        assert_eq!(result.errors, vec!["NOT A NUMBER: is not a valid salary"]);
        let brad = user(&store, "bjones@performyard.com").await;
        assert_eq!(brad.name, "Bradley Jones");
        assert_eq!(brad.salary, Some(90000));
    }

    #[tokio::test]
    async fn blank_cells_clear_fields_on_update() {
        let store = seeded().await;
        let result = upload(
            &store,
            "Brad Jones,bjones@performyard.com,,,02/10/2010\n\
             Ted Harrison,tharrison@performyard.com,,50000,\n",
        )
        .await;

        assert_eq!(result.num_updated, 2);
        assert!(result.errors.is_empty());
        assert_eq!(user(&store, "bjones@performyard.com").await.salary, None);
        let ted = user(&store, "tharrison@performyard.com").await;
        assert_eq!(ted.manager_id, None);
        assert_eq!(ted.hire_date, None);
        assert!(chain_of(&store, "tharrison@performyard.com").await.is_empty());
    }

    #[tokio::test]
    async fn bad_cells_are_reported_in_row_then_field_order() {
        let store = MemoryDirectory::new();
        let result = upload(
            &store,
            ",jdoe@performyard.com,,90000,02/10/2010\n\
             Jane Doe,,,90000,02/10/2010\n\
             J@ne Doe,jdoe@performyard.com,,90000,02/10/2010\n\
             Jane Doe,jdoe@performyardcom,,90000,02/10/2010\n\
             Jane Doe,jdoe@performyard.com,NOT EMAIL,90000,02/10/2010\n\
             Joe Book,jbook@performyard.com,,NUM,02/10/2010\n\
             Bob Dylan,bdylan@performyard.com,jbook@performyard.com,90000,02/101/2010\n\
             Mr Nothing,mnothing@performyard.com,bdylan@performyard.com,,\n    ",
        )
        .await;

        assert_eq!(result.num_created, 4);
        assert_eq!(result.num_updated, 0);
        assert_eq!(
            result.errors,
            vec![
                "user name was blank",
                "user email was blank",
                "J@ne Doe: is not a valid name",
                "jdoe@performyardcom: is not a valid user email",
                "NOT EMAIL: is not a valid manager id",
                "NUM: is not a valid salary",
                "02/101/2010: is not a valid date",
            ]
        );

        let jane = user(&store, "jdoe@performyard.com").await;
        assert_eq!(jane.name, "Jane Doe");
        assert_eq!(jane.manager_id, None);
        let joe = user(&store, "jbook@performyard.com").await;
        assert_eq!(joe.salary, None);
        let bob = user(&store, "bdylan@performyard.com").await;
        assert_eq!(bob.manager_id, Some(joe.id));
        assert_eq!(bob.hire_date, None);
        assert_eq!(chain_of(&store, "mnothing@performyard.com").await, vec![bob.id, joe.id]);
    }

    #[tokio::test]
    async fn skipped_rows_do_not_touch_the_store() {
        let store = MemoryDirectory::new();
        let result = upload(&store, ",ghost@x.com,boss@x.com,NUM,\n").await;

        assert_eq!(result.num_created + result.num_updated, 0);
        assert_eq!(result.errors, vec!["user name was blank", "NUM: is not a valid salary"]);
        assert!(store.list_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn skipped_rows_do_not_vouch_for_managers() {
        let store = MemoryDirectory::new();
        let result = upload(
            &store,
            "Ann Lee,alee@x.com,ghost@x.com,,\n\
             Gh0st,ghost@x.com,,,\n",
        )
        .await;

        assert_eq!(result.num_created, 1);
        assert_eq!(
            result.errors,
            vec!["ghost@x.com: is not a valid manager id", "Gh0st: is not a valid name"]
        );
        assert_eq!(user(&store, "alee@x.com").await.manager_id, None);
        assert!(store.find_user_by_email("ghost@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn forward_manager_reference_creates_a_placeholder() {
        let store = MemoryDirectory::new();
        let result = upload(
            &store,
            "Jane Doe,jdoe@performyard.com,,90000,02/10/2010\n\
             Joe Book,jbook@performyard.com,mnothing@performyard.com,,02/10/2010\n\
             Bob Dylan,bdylan@performyard.com,,90000,\n\
             Mr Nothing,mnothing@performyard.com,bdylan@performyard.com,,\n",
        )
        .await;

        // The placeholder made for Joe's manager turns Mr Nothing's row into an update.
        assert_eq!(result, BatchResult { num_created: 3, num_updated: 1, errors: vec![] });

        let bob = user(&store, "bdylan@performyard.com").await;
        let mr = user(&store, "mnothing@performyard.com").await;
        let joe = user(&store, "jbook@performyard.com").await;
        assert_eq!(mr.name, "Mr Nothing");
        assert_eq!(mr.manager_id, Some(bob.id));
        assert_eq!(joe.manager_id, Some(mr.id));
        assert_eq!(chain_of(&store, "jbook@performyard.com").await, vec![mr.id, bob.id]);
        assert_eq!(chain_of(&store, "mnothing@performyard.com").await, vec![bob.id]);
    }

    #[tokio::test]
    async fn manager_listed_after_report_counts_as_update() {
        let store = MemoryDirectory::new();
        let result = upload(
            &store,
            "Ann Lee,alee@x.com,bkim@x.com,,\n\
             Ben Kim,bkim@x.com,,,\n",
        )
        .await;

        assert_eq!(result.num_created, 1);
        assert_eq!(result.num_updated, 1);
        assert_eq!(user(&store, "bkim@x.com").await.name, "Ben Kim");
    }

    #[tokio::test]
    async fn unknown_manager_without_corroboration_is_an_error() {
        let store = MemoryDirectory::new();
        let result = upload(&store, "Ann Lee,alee@x.com,ghost@x.com,,\n").await;

        assert_eq!(result.num_created, 1);
        assert_eq!(result.errors, vec!["ghost@x.com: is not a valid manager id"]);
        assert_eq!(user(&store, "alee@x.com").await.manager_id, None);
        assert!(store.find_user_by_email("ghost@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn managers_named_twice_are_corroborated() {
        let store = MemoryDirectory::new();
        let result = upload(
            &store,
            "Ann Lee,alee@x.com,ghost@x.com,,\n\
             Cal Ray,cray@x.com,ghost@x.com,,\n",
        )
        .await;

        assert!(result.errors.is_empty());
        let ghost = user(&store, "ghost@x.com").await;
        assert_eq!(user(&store, "cray@x.com").await.manager_id, Some(ghost.id));
    }

    #[tokio::test]
    async fn self_management_is_rejected() {
        let store = seeded().await;
        let result = upload(&store, "Brad Jones,bjones@performyard.com,BJones@performyard.com,,\n").await;

        assert_eq!(
            result.errors,
            vec!["bjones@performyard.com: cannot be their own manager"]
        );
        assert_eq!(user(&store, "bjones@performyard.com").await.manager_id, None);
    }

    #[tokio::test]
    async fn reuploading_is_idempotent() {
        let store = MemoryDirectory::new();
        let csv = "Bob Dylan,bdylan@performyard.com,,90000,02/10/2010\n\
                   John Smith,jsmith@performyard.com,bdylan@performyard.com,80000,07/16/2018\n\
                   Bill Joe,BjOe@performyard.com,jsmith@performyard.com,,05-30-2020\n\
                   ,nobody@performyard.com,,,\n";
        let first = upload(&store, csv).await;
        let second = upload(&store, csv).await;

        assert_eq!(first.num_created, 3);
        assert_eq!(second.num_created, 0);
        assert_eq!(second.num_updated, 3);
        assert_eq!(first.errors, second.errors);

        let bob = user(&store, "bdylan@performyard.com").await.id;
        let john = user(&store, "jsmith@performyard.com").await.id;
        assert_eq!(chain_of(&store, "bjoe@performyard.com").await, vec![john, bob]);
    }

    #[tokio::test]
    async fn cycles_abort_the_batch() {
        let store = MemoryDirectory::new();
        let options = ImportOptions::default();
        let err = run(
            &store,
            &options,
            &format!("{HEADER}Ann Lee,alee@x.com,bkim@x.com,,\nBen Kim,bkim@x.com,alee@x.com,,\n"),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ImportError::ManagementCycle(_)));
        // Row writes before the failure stay applied.
        assert_eq!(store.list_users().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn changed_policy_matches_full_rebuild() {
        let csv = "Jane Doe,jdoe@performyard.com,,90000,02/10/2010\n\
                   Joe Book,jbook@performyard.com,mnothing@performyard.com,,02/10/2010\n\
                   Bob Dylan,bdylan@performyard.com,,90000,\n\
                   Mr Nothing,mnothing@performyard.com,bdylan@performyard.com,,\n";

        let full = MemoryDirectory::new();
        upload_with(&full, ChainPolicy::All, csv).await;
        let incremental = MemoryDirectory::new();
        upload_with(&incremental, ChainPolicy::Changed, csv).await;

        assert!(chain_of(&incremental, "jdoe@performyard.com").await.is_empty());
        for email in ["jbook@performyard.com", "mnothing@performyard.com"] {
            let expected = chain_emails(&full, email).await;
            assert!(!expected.is_empty(), "{email} should have managers");
            assert_eq!(expected, chain_emails(&incremental, email).await);
        }
        assert_eq!(
            chain_emails(&full, "jbook@performyard.com").await,
            vec!["mnothing@performyard.com", "bdylan@performyard.com"]
        );
    }

    #[tokio::test]
    async fn changed_policy_refreshes_reports_of_a_moved_manager() {
        let store = seeded().await;
        upload_with(
            &store,
            ChainPolicy::Changed,
            "Ann Lee,alee@performyard.com,,,\n\
             Brad Jones,bjones@performyard.com,alee@performyard.com,90000,02/10/2010\n",
        )
        .await;

        let ann = user(&store, "alee@performyard.com").await.id;
        let brad = user(&store, "bjones@performyard.com").await.id;
        assert_eq!(chain_of(&store, "tharrison@performyard.com").await, vec![brad, ann]);
    }

    #[test]
    fn batch_result_serializes_in_camel_case() {
        let json = serde_json::to_value(BatchResult {
            num_created: 1,
            num_updated: 2,
            errors: vec!["x".to_string()],
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"numCreated": 1, "numUpdated": 2, "errors": ["x"]}));
    }
}
