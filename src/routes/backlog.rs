use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;

use super::{deleted, Deleted};
use crate::{
    error::AppError,
    models::{BacklogItem, BacklogItemPatch, NewBacklogItem},
    state::AppState,
};

pub fn backlog_routes() -> Router<AppState> {
    Router::new()
        .route("/backlog", get(list_backlog).post(create_backlog_item))
        .route("/backlog/:id", put(update_backlog_item).delete(delete_backlog_item))
}

#[instrument(skip(state))]
pub async fn list_backlog(
    State(state): State<AppState>,
) -> Result<Json<Vec<BacklogItem>>, AppError> {
    Ok(Json(state.store.list_backlog().await?))
}

#[instrument(skip(state, payload))]
pub async fn create_backlog_item(
    State(state): State<AppState>,
    payload: Result<Json<NewBacklogItem>, JsonRejection>,
) -> Result<Json<BacklogItem>, AppError> {
    let Json(new) = payload?;
    new.validate().map_err(AppError::Validation)?;
    Ok(Json(state.store.create_backlog_item(new).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_backlog_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    payload: Result<Json<BacklogItemPatch>, JsonRejection>,
) -> Result<Json<BacklogItem>, AppError> {
    let Json(patch) = payload?;
    patch.validate().map_err(AppError::Validation)?;
    let item = state
        .store
        .update_backlog_item(id, patch)
        .await?
        .ok_or(AppError::NotFound("Backlog item"))?;
    Ok(Json(item))
}

#[instrument(skip(state))]
pub async fn delete_backlog_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Deleted>, AppError> {
    if !state.store.delete_backlog_item(id).await? {
        return Err(AppError::NotFound("Backlog item"));
    }
    Ok(deleted())
}
