use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

pub mod backlog;
pub mod contacts;
pub mod dashboard;
pub mod deals;
pub mod health;
pub mod invoices;
pub mod tasks;

/// Body returned by every `DELETE /:id`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Deleted {
    pub message: String,
}

pub(crate) fn deleted() -> Json<Deleted> {
    Json(Deleted {
        message: "Deleted".into(),
    })
}

/// All resource routers; each one requires a bearer token.
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .merge(contacts::contacts_routes())
        .merge(deals::deals_routes())
        .merge(tasks::tasks_routes())
        .merge(backlog::backlog_routes())
        .merge(invoices::invoices_routes())
        .merge(dashboard::dashboard_routes())
}
