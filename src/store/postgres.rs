use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};

use super::{CrmStore, StoreError, StoreResult, INVOICE_EXISTS, USER_EXISTS};
use crate::auth::repo_types::User;
use crate::models::{
    BacklogItem, BacklogItemPatch, Contact, ContactPatch, Deal, DealPatch, DealStage, Invoice,
    InvoicePatch, NewBacklogItem, NewContact, NewDeal, NewTask, Task, TaskPatch,
};

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

/// Maps a unique-key violation to a conflict, anything else to a database error.
fn unique_or(e: sqlx::Error, conflict: &'static str) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(conflict),
        _ => StoreError::Database(e),
    }
}

fn corrupt(e: crate::models::UnknownVariant) -> StoreError {
    StoreError::Corrupt(e.to_string())
}

// ---- rows: enum columns come back as text ----

#[derive(Debug, FromRow)]
struct ContactRow {
    id: i32,
    name: String,
    email: String,
    phone: Option<String>,
    company: Option<String>,
    status: String,
    avatar: Option<String>,
}

impl TryFrom<ContactRow> for Contact {
    type Error = StoreError;

    fn try_from(r: ContactRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            name: r.name,
            email: r.email,
            phone: r.phone,
            company: r.company,
            status: r.status.parse().map_err(corrupt)?,
            avatar: r.avatar,
        })
    }
}

#[derive(Debug, FromRow)]
struct DealRow {
    id: i32,
    title: String,
    company: String,
    value: f64,
    stage: String,
}

impl TryFrom<DealRow> for Deal {
    type Error = StoreError;

    fn try_from(r: DealRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            title: r.title,
            company: r.company,
            value: r.value,
            stage: r.stage.parse().map_err(corrupt)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct TaskRow {
    id: i32,
    title: String,
    tag: String,
    stage: String,
    priority: String,
    color: Option<String>,
}

impl TryFrom<TaskRow> for Task {
    type Error = StoreError;

    fn try_from(r: TaskRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            title: r.title,
            tag: r.tag,
            stage: r.stage.parse().map_err(corrupt)?,
            priority: r.priority.parse().map_err(corrupt)?,
            color: r.color,
        })
    }
}

#[derive(Debug, FromRow)]
struct BacklogRow {
    id: i32,
    title: String,
    kind: String,
    points: i32,
}

impl From<BacklogRow> for BacklogItem {
    fn from(r: BacklogRow) -> Self {
        Self {
            id: r.id,
            title: r.title,
            kind: r.kind,
            points: r.points,
        }
    }
}

#[derive(Debug, FromRow)]
struct InvoiceRow {
    id: String,
    client: String,
    amount: f64,
    date: String,
    status: String,
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = StoreError;

    fn try_from(r: InvoiceRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            client: r.client,
            amount: r.amount,
            date: r.date,
            status: r.status.parse().map_err(corrupt)?,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

const USER_COLUMNS: &str = "id, name, email, password_hash, created_at";
const CONTACT_COLUMNS: &str = "id, name, email, phone, company, status, avatar";
const DEAL_COLUMNS: &str = "id, title, company, value, stage";
const TASK_COLUMNS: &str = "id, title, tag, stage, priority, color";
const BACKLOG_COLUMNS: &str = "id, title, kind, points";
const INVOICE_COLUMNS: &str = "id, client, amount, date, status";

#[async_trait]
impl CrmStore for PgStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_user_by_id(&self, id: i32) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create_user(&self, name: &str, email: &str, password_hash: &str) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| unique_or(e, USER_EXISTS))
    }

    async fn update_user_profile(
        &self,
        id: i32,
        name: Option<&str>,
        email: Option<&str>,
    ) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET name = COALESCE($2, name),
                   email = COALESCE($3, email)
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| unique_or(e, USER_EXISTS))
    }

    async fn count_users(&self) -> StoreResult<i64> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;
        Ok(n)
    }

    async fn list_contacts(&self) -> StoreResult<Vec<Contact>> {
        let rows = sqlx::query_as::<_, ContactRow>(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts ORDER BY id"
        ))
        .fetch_all(&self.db)
        .await?;
        convert_all(rows)
    }

    async fn create_contact(&self, new: NewContact) -> StoreResult<Contact> {
        sqlx::query_as::<_, ContactRow>(&format!(
            r#"
            INSERT INTO contacts (name, email, phone, company, status, avatar)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {CONTACT_COLUMNS}
            "#
        ))
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(&new.company)
        .bind(new.status.as_str())
        .bind(&new.avatar)
        .fetch_one(&self.db)
        .await?
        .try_into()
    }

    async fn update_contact(&self, id: i32, patch: ContactPatch) -> StoreResult<Option<Contact>> {
        let row = sqlx::query_as::<_, ContactRow>(&format!(
            r#"
            UPDATE contacts
               SET name = COALESCE($2, name),
                   email = COALESCE($3, email),
                   phone = COALESCE($4, phone),
                   company = COALESCE($5, company),
                   status = COALESCE($6, status),
                   avatar = COALESCE($7, avatar)
             WHERE id = $1
            RETURNING {CONTACT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.email)
        .bind(&patch.phone)
        .bind(&patch.company)
        .bind(patch.status.map(|s| s.as_str()))
        .bind(&patch.avatar)
        .fetch_optional(&self.db)
        .await?;
        row.map(Contact::try_from).transpose()
    }

    async fn delete_contact(&self, id: i32) -> StoreResult<bool> {
        let done = sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn list_deals(&self) -> StoreResult<Vec<Deal>> {
        let rows = sqlx::query_as::<_, DealRow>(&format!(
            "SELECT {DEAL_COLUMNS} FROM deals ORDER BY id"
        ))
        .fetch_all(&self.db)
        .await?;
        convert_all(rows)
    }

    async fn create_deal(&self, new: NewDeal) -> StoreResult<Deal> {
        sqlx::query_as::<_, DealRow>(&format!(
            r#"
            INSERT INTO deals (title, company, value, stage)
            VALUES ($1, $2, $3, $4)
            RETURNING {DEAL_COLUMNS}
            "#
        ))
        .bind(&new.title)
        .bind(&new.company)
        .bind(new.value)
        .bind(new.stage.as_str())
        .fetch_one(&self.db)
        .await?
        .try_into()
    }

    async fn update_deal(&self, id: i32, patch: DealPatch) -> StoreResult<Option<Deal>> {
        let row = sqlx::query_as::<_, DealRow>(&format!(
            r#"
            UPDATE deals
               SET title = COALESCE($2, title),
                   company = COALESCE($3, company),
                   value = COALESCE($4, value),
                   stage = COALESCE($5, stage)
             WHERE id = $1
            RETURNING {DEAL_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.company)
        .bind(patch.value)
        .bind(patch.stage.map(|s| s.as_str()))
        .fetch_optional(&self.db)
        .await?;
        row.map(Deal::try_from).transpose()
    }

    async fn delete_deal(&self, id: i32) -> StoreResult<bool> {
        let done = sqlx::query("DELETE FROM deals WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn recent_deals(&self, limit: i64) -> StoreResult<Vec<Deal>> {
        let rows = sqlx::query_as::<_, DealRow>(&format!(
            "SELECT {DEAL_COLUMNS} FROM deals ORDER BY id DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        convert_all(rows)
    }

    async fn deal_value_in_stage(&self, stage: DealStage) -> StoreResult<f64> {
        let (sum,): (f64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(value), 0)::DOUBLE PRECISION FROM deals WHERE stage = $1",
        )
                .bind(stage.as_str())
                .fetch_one(&self.db)
                .await?;
        Ok(sum)
    }

    async fn count_deals_in_stage(&self, stage: DealStage) -> StoreResult<i64> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM deals WHERE stage = $1")
            .bind(stage.as_str())
            .fetch_one(&self.db)
            .await?;
        Ok(n)
    }

    async fn list_tasks(&self) -> StoreResult<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks ORDER BY id"
        ))
        .fetch_all(&self.db)
        .await?;
        convert_all(rows)
    }

    async fn create_task(&self, new: NewTask) -> StoreResult<Task> {
        sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            INSERT INTO tasks (title, tag, stage, priority, color)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(&new.title)
        .bind(&new.tag)
        .bind(new.stage.as_str())
        .bind(new.priority.as_str())
        .bind(&new.color)
        .fetch_one(&self.db)
        .await?
        .try_into()
    }

    async fn update_task(&self, id: i32, patch: TaskPatch) -> StoreResult<Option<Task>> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            UPDATE tasks
               SET title = COALESCE($2, title),
                   tag = COALESCE($3, tag),
                   stage = COALESCE($4, stage),
                   priority = COALESCE($5, priority),
                   color = COALESCE($6, color)
             WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.tag)
        .bind(patch.stage.map(|s| s.as_str()))
        .bind(patch.priority.map(|p| p.as_str()))
        .bind(&patch.color)
        .fetch_optional(&self.db)
        .await?;
        row.map(Task::try_from).transpose()
    }

    async fn delete_task(&self, id: i32) -> StoreResult<bool> {
        let done = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn list_backlog(&self) -> StoreResult<Vec<BacklogItem>> {
        let rows = sqlx::query_as::<_, BacklogRow>(&format!(
            "SELECT {BACKLOG_COLUMNS} FROM backlog_items ORDER BY id"
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(BacklogItem::from).collect())
    }

    async fn create_backlog_item(&self, new: NewBacklogItem) -> StoreResult<BacklogItem> {
        let row = sqlx::query_as::<_, BacklogRow>(&format!(
            r#"
            INSERT INTO backlog_items (title, kind, points)
            VALUES ($1, $2, $3)
            RETURNING {BACKLOG_COLUMNS}
            "#
        ))
        .bind(&new.title)
        .bind(&new.kind)
        .bind(new.points)
        .fetch_one(&self.db)
        .await?;
        Ok(row.into())
    }

    async fn update_backlog_item(
        &self,
        id: i32,
        patch: BacklogItemPatch,
    ) -> StoreResult<Option<BacklogItem>> {
        let row = sqlx::query_as::<_, BacklogRow>(&format!(
            r#"
            UPDATE backlog_items
               SET title = COALESCE($2, title),
                   kind = COALESCE($3, kind),
                   points = COALESCE($4, points)
             WHERE id = $1
            RETURNING {BACKLOG_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.kind)
        .bind(patch.points)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(BacklogItem::from))
    }

    async fn delete_backlog_item(&self, id: i32) -> StoreResult<bool> {
        let done = sqlx::query("DELETE FROM backlog_items WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn list_invoices(&self) -> StoreResult<Vec<Invoice>> {
        let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices ORDER BY id"
        ))
        .fetch_all(&self.db)
        .await?;
        convert_all(rows)
    }

    async fn create_invoice(&self, invoice: Invoice) -> StoreResult<Invoice> {
        sqlx::query_as::<_, InvoiceRow>(&format!(
            r#"
            INSERT INTO invoices (id, client, amount, date, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(&invoice.id)
        .bind(&invoice.client)
        .bind(invoice.amount)
        .bind(&invoice.date)
        .bind(invoice.status.as_str())
        .fetch_one(&self.db)
        .await
        .map_err(|e| unique_or(e, INVOICE_EXISTS))?
        .try_into()
    }

    async fn update_invoice(&self, id: &str, patch: InvoicePatch) -> StoreResult<Option<Invoice>> {
        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            r#"
            UPDATE invoices
               SET client = COALESCE($2, client),
                   amount = COALESCE($3, amount),
                   date = COALESCE($4, date),
                   status = COALESCE($5, status)
             WHERE id = $1
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&patch.client)
        .bind(patch.amount)
        .bind(&patch.date)
        .bind(patch.status.map(|s| s.as_str()))
        .fetch_optional(&self.db)
        .await?;
        row.map(Invoice::try_from).transpose()
    }

    async fn delete_invoice(&self, id: &str) -> StoreResult<bool> {
        let done = sqlx::query("DELETE FROM invoices WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(done.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_stage_in_a_row_is_reported_as_corrupt() {
        let row = DealRow {
            id: 1,
            title: "Cloud Migration".into(),
            company: "MegaSoft".into(),
            value: 45000.0,
            stage: "Lost".into(),
        };
        let err = Deal::try_from(row).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(ref m) if m.contains("Lost")));
    }

    #[test]
    fn rows_with_known_text_map_to_records() {
        let row = TaskRow {
            id: 2,
            title: "User Testing".into(),
            tag: "QA".into(),
            stage: "Done".into(),
            priority: "Low".into(),
            color: None,
        };
        let task = Task::try_from(row).unwrap();
        assert_eq!(task.stage, crate::models::TaskStage::Done);
        assert_eq!(task.priority, crate::models::TaskPriority::Low);
    }
}
