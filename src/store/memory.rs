use std::collections::BTreeMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::{CrmStore, StoreError, StoreResult, INVOICE_EXISTS, USER_EXISTS};
use crate::auth::repo_types::User;
use crate::models::{
    BacklogItem, BacklogItemPatch, Contact, ContactPatch, Deal, DealPatch, DealStage, Invoice,
    InvoicePatch, NewBacklogItem, NewContact, NewDeal, NewTask, Task, TaskPatch,
};

/// Rows keyed by a serial id that is never reused.
struct Table<T> {
    rows: BTreeMap<i32, T>,
    last_id: i32,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }
}

impl<T: Clone> Table<T> {
    fn insert_with(&mut self, build: impl FnOnce(i32) -> T) -> T {
        self.last_id += 1;
        let row = build(self.last_id);
        self.rows.insert(self.last_id, row.clone());
        row
    }

    fn list(&self) -> Vec<T> {
        self.rows.values().cloned().collect()
    }

    fn update(&mut self, id: i32, apply: impl FnOnce(&mut T)) -> Option<T> {
        let row = self.rows.get_mut(&id)?;
        apply(row);
        Some(row.clone())
    }

    fn delete(&mut self, id: i32) -> bool {
        self.rows.remove(&id).is_some()
    }
}

#[derive(Default)]
struct Tables {
    users: Table<User>,
    contacts: Table<Contact>,
    deals: Table<Deal>,
    tasks: Table<Task>,
    backlog: Table<BacklogItem>,
    invoices: BTreeMap<String, Invoice>,
}

/// Process-local store; contents are lost when it is dropped.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CrmStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.rows.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: i32) -> StoreResult<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.rows.get(&id).cloned())
    }

    async fn create_user(&self, name: &str, email: &str, password_hash: &str) -> StoreResult<User> {
        let mut t = self.tables.write().await;
        if t.users.rows.values().any(|u| u.email == email) {
            return Err(StoreError::Conflict(USER_EXISTS));
        }
        Ok(t.users.insert_with(|id| User {
            id,
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: OffsetDateTime::now_utc(),
        }))
    }

    async fn update_user_profile(
        &self,
        id: i32,
        name: Option<&str>,
        email: Option<&str>,
    ) -> StoreResult<Option<User>> {
        let mut t = self.tables.write().await;
        if let Some(email) = email {
            if t.users.rows.values().any(|u| u.email == email && u.id != id) {
                return Err(StoreError::Conflict(USER_EXISTS));
            }
        }
        Ok(t.users.update(id, |u| {
            if let Some(name) = name {
                u.name = name.to_string();
            }
            if let Some(email) = email {
                u.email = email.to_string();
            }
        }))
    }

    async fn count_users(&self) -> StoreResult<i64> {
        Ok(self.tables.read().await.users.rows.len() as i64)
    }

    async fn list_contacts(&self) -> StoreResult<Vec<Contact>> {
        Ok(self.tables.read().await.contacts.list())
    }

    async fn create_contact(&self, new: NewContact) -> StoreResult<Contact> {
        let mut t = self.tables.write().await;
        Ok(t.contacts.insert_with(|id| new.into_record(id)))
    }

    async fn update_contact(&self, id: i32, patch: ContactPatch) -> StoreResult<Option<Contact>> {
        let mut t = self.tables.write().await;
        Ok(t.contacts.update(id, |c| patch.apply(c)))
    }

    async fn delete_contact(&self, id: i32) -> StoreResult<bool> {
        Ok(self.tables.write().await.contacts.delete(id))
    }

    async fn list_deals(&self) -> StoreResult<Vec<Deal>> {
        Ok(self.tables.read().await.deals.list())
    }

    async fn create_deal(&self, new: NewDeal) -> StoreResult<Deal> {
        let mut t = self.tables.write().await;
        Ok(t.deals.insert_with(|id| new.into_record(id)))
    }

    async fn update_deal(&self, id: i32, patch: DealPatch) -> StoreResult<Option<Deal>> {
        let mut t = self.tables.write().await;
        Ok(t.deals.update(id, |d| patch.apply(d)))
    }

    async fn delete_deal(&self, id: i32) -> StoreResult<bool> {
        Ok(self.tables.write().await.deals.delete(id))
    }

    async fn recent_deals(&self, limit: i64) -> StoreResult<Vec<Deal>> {
        let t = self.tables.read().await;
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(t.deals.rows.values().rev().take(limit).cloned().collect())
    }

    async fn deal_value_in_stage(&self, stage: DealStage) -> StoreResult<f64> {
        let t = self.tables.read().await;
        Ok(t.deals
            .rows
            .values()
            .filter(|d| d.stage == stage)
            .map(|d| d.value)
            .sum())
    }

    async fn count_deals_in_stage(&self, stage: DealStage) -> StoreResult<i64> {
        let t = self.tables.read().await;
        Ok(t.deals.rows.values().filter(|d| d.stage == stage).count() as i64)
    }

    async fn list_tasks(&self) -> StoreResult<Vec<Task>> {
        Ok(self.tables.read().await.tasks.list())
    }

    async fn create_task(&self, new: NewTask) -> StoreResult<Task> {
        let mut t = self.tables.write().await;
        Ok(t.tasks.insert_with(|id| new.into_record(id)))
    }

    async fn update_task(&self, id: i32, patch: TaskPatch) -> StoreResult<Option<Task>> {
        let mut t = self.tables.write().await;
        Ok(t.tasks.update(id, |task| patch.apply(task)))
    }

    async fn delete_task(&self, id: i32) -> StoreResult<bool> {
        Ok(self.tables.write().await.tasks.delete(id))
    }

    async fn list_backlog(&self) -> StoreResult<Vec<BacklogItem>> {
        Ok(self.tables.read().await.backlog.list())
    }

    async fn create_backlog_item(&self, new: NewBacklogItem) -> StoreResult<BacklogItem> {
        let mut t = self.tables.write().await;
        Ok(t.backlog.insert_with(|id| new.into_record(id)))
    }

    async fn update_backlog_item(
        &self,
        id: i32,
        patch: BacklogItemPatch,
    ) -> StoreResult<Option<BacklogItem>> {
        let mut t = self.tables.write().await;
        Ok(t.backlog.update(id, |b| patch.apply(b)))
    }

    async fn delete_backlog_item(&self, id: i32) -> StoreResult<bool> {
        Ok(self.tables.write().await.backlog.delete(id))
    }

    async fn list_invoices(&self) -> StoreResult<Vec<Invoice>> {
        Ok(self.tables.read().await.invoices.values().cloned().collect())
    }

    async fn create_invoice(&self, invoice: Invoice) -> StoreResult<Invoice> {
        let mut t = self.tables.write().await;
        if t.invoices.contains_key(&invoice.id) {
            return Err(StoreError::Conflict(INVOICE_EXISTS));
        }
        t.invoices.insert(invoice.id.clone(), invoice.clone());
        Ok(invoice)
    }

    async fn update_invoice(&self, id: &str, patch: InvoicePatch) -> StoreResult<Option<Invoice>> {
        let mut t = self.tables.write().await;
        Ok(t.invoices.get_mut(id).map(|inv| {
            patch.apply(inv);
            inv.clone()
        }))
    }

    async fn delete_invoice(&self, id: &str) -> StoreResult<bool> {
        Ok(self.tables.write().await.invoices.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStage;

    #[tokio::test]
    async fn ids_are_assigned_in_order_and_never_reused() {
        let store = MemoryStore::new();
        let first = store
            .create_deal(NewDeal {
                title: "A".into(),
                company: "Acme".into(),
                value: 1.0,
                stage: DealStage::Lead,
            })
            .await
            .unwrap();
        assert!(store.delete_deal(first.id).await.unwrap());
        let second = store
            .create_deal(NewDeal {
                title: "B".into(),
                company: "Acme".into(),
                value: 2.0,
                stage: DealStage::Won,
            })
            .await
            .unwrap();
        assert!(second.id > first.id);
        assert_eq!(store.list_deals().await.unwrap(), vec![second]);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict_and_keeps_the_first_hash() {
        let store = MemoryStore::new();
        store.create_user("Ann", "ann@example.com", "hash-1").await.unwrap();
        let err = store
            .create_user("Impostor", "ann@example.com", "hash-2")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(USER_EXISTS)));
        let user = store.find_user_by_email("ann@example.com").await.unwrap().unwrap();
        assert_eq!(user.password_hash, "hash-1");
        assert_eq!(user.name, "Ann");
    }

    #[tokio::test]
    async fn profile_update_refuses_someone_elses_email() {
        let store = MemoryStore::new();
        let ann = store.create_user("Ann", "ann@example.com", "h").await.unwrap();
        store.create_user("Bob", "bob@example.com", "h").await.unwrap();
        let err = store
            .update_user_profile(ann.id, None, Some("bob@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let renamed = store
            .update_user_profile(ann.id, Some("Ann B."), Some("ann@example.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.name, "Ann B.");
        assert!(store.update_user_profile(99, Some("x"), None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn updating_a_missing_row_returns_none() {
        let store = MemoryStore::new();
        let patch = TaskPatch {
            stage: Some(TaskStage::Done),
            ..Default::default()
        };
        assert!(store.update_task(42, patch).await.unwrap().is_none());
        assert!(!store.delete_task(42).await.unwrap());
    }

    #[tokio::test]
    async fn recent_deals_are_newest_first() {
        let store = MemoryStore::new();
        for title in ["one", "two", "three"] {
            store
                .create_deal(NewDeal {
                    title: title.into(),
                    company: "Acme".into(),
                    value: 10.0,
                    stage: DealStage::Won,
                })
                .await
                .unwrap();
        }
        let recent = store.recent_deals(2).await.unwrap();
        let titles: Vec<_> = recent.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, ["three", "two"]);
        assert_eq!(store.deal_value_in_stage(DealStage::Won).await.unwrap(), 30.0);
        assert_eq!(store.count_deals_in_stage(DealStage::Lead).await.unwrap(), 0);
    }
}
