use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, put},
    Json, Router,
};
use time::{macros::format_description, Date, Duration, OffsetDateTime};
use tracing::{info, instrument, warn};

use super::{deleted, Deleted};
use crate::{
    error::AppError,
    models::{Invoice, InvoicePatch, NewInvoice},
    state::AppState,
    store::{CrmStore, StoreError},
};

/// Generated ids only cover 10 000 values, so a clash gets a few retries
/// with the clock nudged forward.
const ID_ATTEMPTS: i64 = 5;

pub fn invoices_routes() -> Router<AppState> {
    Router::new()
        .route("/invoices", get(list_invoices).post(create_invoice))
        .route("/invoices/:id", put(update_invoice).delete(delete_invoice))
}

/// `INV-` followed by the last four digits of the current unix millis.
fn generate_invoice_id(now: OffsetDateTime) -> String {
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    format!("INV-{:04}", millis.rem_euclid(10_000))
}

/// Inserts `invoice` under a generated id, moving on to the next id when
/// the store reports it taken.
async fn insert_with_generated_id(
    store: &dyn CrmStore,
    mut invoice: Invoice,
    now: OffsetDateTime,
) -> Result<Invoice, AppError> {
    let mut attempt = 0;
    loop {
        invoice.id = generate_invoice_id(now + Duration::milliseconds(attempt));
        match store.create_invoice(invoice.clone()).await {
            Err(StoreError::Conflict(_)) if attempt + 1 < ID_ATTEMPTS => {
                warn!(invoice_id = %invoice.id, attempt, "generated invoice id taken; retrying");
                attempt += 1;
            }
            other => return Ok(other?),
        }
    }
}

fn check_date(date: &str) -> Result<(), AppError> {
    Date::parse(date, format_description!("[year]-[month]-[day]"))
        .map(|_| ())
        .map_err(|_| AppError::Validation("date must be YYYY-MM-DD".into()))
}

fn today(now: OffsetDateTime) -> Result<String, AppError> {
    now.date()
        .format(format_description!("[year]-[month]-[day]"))
        .map_err(|e| AppError::Internal(e.into()))
}

#[instrument(skip(state))]
pub async fn list_invoices(State(state): State<AppState>) -> Result<Json<Vec<Invoice>>, AppError> {
    Ok(Json(state.store.list_invoices().await?))
}

#[instrument(skip(state, payload))]
pub async fn create_invoice(
    State(state): State<AppState>,
    payload: Result<Json<NewInvoice>, JsonRejection>,
) -> Result<Json<Invoice>, AppError> {
    let Json(new) = payload?;
    new.validate().map_err(AppError::Validation)?;

    let now = OffsetDateTime::now_utc();
    let date = match new.date {
        Some(d) => {
            check_date(&d)?;
            d
        }
        None => today(now)?,
    };
    let mut invoice = Invoice {
        id: String::new(),
        client: new.client,
        amount: new.amount,
        date,
        status: new.status,
    };

    // A caller-chosen id that is taken stays a 409.
    let invoice = match new.id {
        Some(id) => {
            invoice.id = id.trim().to_string();
            state.store.create_invoice(invoice).await?
        }
        None => insert_with_generated_id(state.store.as_ref(), invoice, now).await?,
    };
    info!(invoice_id = %invoice.id, "invoice created");
    Ok(Json(invoice))
}

#[instrument(skip(state, payload))]
pub async fn update_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<InvoicePatch>, JsonRejection>,
) -> Result<Json<Invoice>, AppError> {
    let Json(patch) = payload?;
    patch.validate().map_err(AppError::Validation)?;
    if let Some(date) = &patch.date {
        check_date(date)?;
    }
    let invoice = state
        .store
        .update_invoice(&id, patch)
        .await?
        .ok_or(AppError::NotFound("Invoice"))?;
    Ok(Json(invoice))
}

#[instrument(skip(state))]
pub async fn delete_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, AppError> {
    if !state.store.delete_invoice(&id).await? {
        return Err(AppError::NotFound("Invoice"));
    }
    info!(invoice_id = %id, "invoice deleted");
    Ok(deleted())
}
