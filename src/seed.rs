//! Demo data for a fresh store.
//!
//! The demo user is written with its password in plaintext, the way the
//! first deployments stored it. Logging in as that user goes through
//! [`crate::auth::password::legacy`].

use tracing::info;

use crate::models::{
    ContactStatus, DealStage, Invoice, InvoiceStatus, NewBacklogItem, NewContact, NewDeal,
    NewTask, TaskPriority, TaskStage,
};
use crate::store::{CrmStore, StoreResult};

pub const DEMO_EMAIL: &str = "user@example.com";
pub const DEMO_NAME: &str = "John Doe";
pub const DEMO_PASSWORD: &str = "password123";

/// Inserts the demo user and sample records. Returns `false` without
/// touching anything when the demo user already exists.
pub async fn seed(store: &dyn CrmStore) -> StoreResult<bool> {
    if store.find_user_by_email(DEMO_EMAIL).await?.is_some() {
        info!("demo data already present; skipping seed");
        return Ok(false);
    }
    store
        .create_user(DEMO_NAME, DEMO_EMAIL, DEMO_PASSWORD)
        .await?;

    let contacts = [
        (
            "Jane Cooper",
            "jane.cooper@example.com",
            "+1-202-555-0170",
            "Microsoft",
            ContactStatus::Active,
            "bg-emerald-500",
        ),
        (
            "Cody Fisher",
            "cody.fisher@example.com",
            "+1-202-555-0195",
            "Adobe",
            ContactStatus::Inactive,
            "bg-rose-500",
        ),
        (
            "Esther Howard",
            "esther.howard@example.com",
            "+1-202-555-0141",
            "Google",
            ContactStatus::Active,
            "bg-amber-500",
        ),
        (
            "Jenny Wilson",
            "jenny.wilson@example.com",
            "+1-202-555-0112",
            "Tesla",
            ContactStatus::Lead,
            "bg-blue-500",
        ),
        (
            "Kristin Watson",
            "kristin.watson@example.com",
            "+1-202-555-0165",
            "Facebook",
            ContactStatus::Active,
            "bg-purple-500",
        ),
    ];
    for (name, email, phone, company, status, avatar) in contacts {
        store
            .create_contact(NewContact {
                name: name.into(),
                email: email.into(),
                phone: Some(phone.into()),
                company: Some(company.into()),
                status,
                avatar: Some(avatar.into()),
            })
            .await?;
    }

    let deals = [
        ("Enterprise License", 12500.0, "TechCorp", DealStage::Discussion),
        ("Cloud Migration", 45000.0, "MegaSoft", DealStage::Proposal),
        ("Training Package", 3500.0, "Startup Inc", DealStage::Won),
        ("Consulting Audit", 8000.0, "Finance LLC", DealStage::Lead),
    ];
    for (title, value, company, stage) in deals {
        store
            .create_deal(NewDeal {
                title: title.into(),
                company: company.into(),
                value,
                stage,
            })
            .await?;
    }

    let tasks = [
        (
            "Design System Update",
            "Design",
            TaskStage::InProgress,
            TaskPriority::High,
            "bg-purple-500",
        ),
        (
            "API Integration",
            "Backend",
            TaskStage::ToDo,
            TaskPriority::Medium,
            "bg-blue-500",
        ),
        (
            "User Testing",
            "QA",
            TaskStage::Done,
            TaskPriority::Low,
            "bg-emerald-500",
        ),
    ];
    for (title, tag, stage, priority, color) in tasks {
        store
            .create_task(NewTask {
                title: title.into(),
                tag: tag.into(),
                stage,
                priority,
                color: Some(color.into()),
            })
            .await?;
    }

    let backlog = [
        ("Research Competitor Pricing", "Research", 3),
        ("Update Privacy Policy", "Legal", 1),
        ("Optimize Database Queries", "Performance", 8),
        ("Create Email Templates", "Marketing", 2),
    ];
    for (title, kind, points) in backlog {
        store
            .create_backlog_item(NewBacklogItem {
                title: title.into(),
                kind: kind.into(),
                points,
            })
            .await?;
    }

    let invoices = [
        ("INV-001", "Acme Corp", 12000.0, "2023-10-15", InvoiceStatus::Paid),
        ("INV-002", "Globex Inc", 8500.0, "2023-11-02", InvoiceStatus::Pending),
        ("INV-003", "Soylent Corp", 22000.0, "2023-11-20", InvoiceStatus::Overdue),
    ];
    for (id, client, amount, date, status) in invoices {
        store
            .create_invoice(Invoice {
                id: id.into(),
                client: client.into(),
                amount,
                date: date.into(),
                status,
            })
            .await?;
    }

    info!("database seeded");
    Ok(true)
}
