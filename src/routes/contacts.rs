use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument};

use super::{deleted, Deleted};
use crate::{
    error::AppError,
    models::{Contact, ContactPatch, NewContact},
    state::AppState,
};

pub fn contacts_routes() -> Router<AppState> {
    Router::new()
        .route("/contacts", get(list_contacts).post(create_contact))
        .route("/contacts/:id", put(update_contact).delete(delete_contact))
}

#[instrument(skip(state))]
pub async fn list_contacts(State(state): State<AppState>) -> Result<Json<Vec<Contact>>, AppError> {
    Ok(Json(state.store.list_contacts().await?))
}

#[instrument(skip(state, payload))]
pub async fn create_contact(
    State(state): State<AppState>,
    payload: Result<Json<NewContact>, JsonRejection>,
) -> Result<Json<Contact>, AppError> {
    let Json(new) = payload?;
    new.validate().map_err(AppError::Validation)?;
    let contact = state.store.create_contact(new).await?;
    info!(contact_id = contact.id, "contact created");
    Ok(Json(contact))
}

#[instrument(skip(state, payload))]
pub async fn update_contact(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    payload: Result<Json<ContactPatch>, JsonRejection>,
) -> Result<Json<Contact>, AppError> {
    let Json(patch) = payload?;
    patch.validate().map_err(AppError::Validation)?;
    let contact = state
        .store
        .update_contact(id, patch)
        .await?
        .ok_or(AppError::NotFound("Contact"))?;
    Ok(Json(contact))
}

#[instrument(skip(state))]
pub async fn delete_contact(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Deleted>, AppError> {
    if !state.store.delete_contact(id).await? {
        return Err(AppError::NotFound("Contact"));
    }
    info!(contact_id = id, "contact deleted");
    Ok(deleted())
}
