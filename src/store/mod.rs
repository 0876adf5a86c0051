//! Persistence seam for the API.
//!
//! Handlers only see [`CrmStore`]; `PgStore` backs it with Postgres and
//! `MemoryStore` keeps everything in process for tests and local runs.

use async_trait::async_trait;
use thiserror::Error;

use crate::auth::repo_types::User;
use crate::models::{
    BacklogItem, BacklogItemPatch, Contact, ContactPatch, Deal, DealPatch, DealStage, Invoice,
    InvoicePatch, NewBacklogItem, NewContact, NewDeal, NewTask, Task, TaskPatch,
};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Error, Debug)]
pub enum StoreError {
    /// A unique key is already taken.
    #[error("{0}")]
    Conflict(&'static str),

    /// A stored row cannot be mapped back to a record.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Conflict message for a duplicate user email.
pub const USER_EXISTS: &str = "User already exists";
/// Conflict message for a duplicate invoice id.
pub const INVOICE_EXISTS: &str = "Invoice already exists";

#[async_trait]
pub trait CrmStore: Send + Sync {
    // users
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_id(&self, id: i32) -> StoreResult<Option<User>>;
    /// Fails with [`StoreError::Conflict`] when the email is taken.
    async fn create_user(&self, name: &str, email: &str, password_hash: &str) -> StoreResult<User>;
    async fn update_user_profile(
        &self,
        id: i32,
        name: Option<&str>,
        email: Option<&str>,
    ) -> StoreResult<Option<User>>;
    async fn count_users(&self) -> StoreResult<i64>;

    // contacts
    async fn list_contacts(&self) -> StoreResult<Vec<Contact>>;
    async fn create_contact(&self, new: NewContact) -> StoreResult<Contact>;
    async fn update_contact(&self, id: i32, patch: ContactPatch) -> StoreResult<Option<Contact>>;
    async fn delete_contact(&self, id: i32) -> StoreResult<bool>;

    // deals
    async fn list_deals(&self) -> StoreResult<Vec<Deal>>;
    async fn create_deal(&self, new: NewDeal) -> StoreResult<Deal>;
    async fn update_deal(&self, id: i32, patch: DealPatch) -> StoreResult<Option<Deal>>;
    async fn delete_deal(&self, id: i32) -> StoreResult<bool>;
    /// Newest deals first.
    async fn recent_deals(&self, limit: i64) -> StoreResult<Vec<Deal>>;
    async fn deal_value_in_stage(&self, stage: DealStage) -> StoreResult<f64>;
    async fn count_deals_in_stage(&self, stage: DealStage) -> StoreResult<i64>;

    // tasks
    async fn list_tasks(&self) -> StoreResult<Vec<Task>>;
    async fn create_task(&self, new: NewTask) -> StoreResult<Task>;
    async fn update_task(&self, id: i32, patch: TaskPatch) -> StoreResult<Option<Task>>;
    async fn delete_task(&self, id: i32) -> StoreResult<bool>;

    // backlog
    async fn list_backlog(&self) -> StoreResult<Vec<BacklogItem>>;
    async fn create_backlog_item(&self, new: NewBacklogItem) -> StoreResult<BacklogItem>;
    async fn update_backlog_item(
        &self,
        id: i32,
        patch: BacklogItemPatch,
    ) -> StoreResult<Option<BacklogItem>>;
    async fn delete_backlog_item(&self, id: i32) -> StoreResult<bool>;

    // invoices
    async fn list_invoices(&self) -> StoreResult<Vec<Invoice>>;
    /// Fails with [`StoreError::Conflict`] when the id is taken.
    async fn create_invoice(&self, invoice: Invoice) -> StoreResult<Invoice>;
    async fn update_invoice(&self, id: &str, patch: InvoicePatch) -> StoreResult<Option<Invoice>>;
    async fn delete_invoice(&self, id: &str) -> StoreResult<bool>;
}
