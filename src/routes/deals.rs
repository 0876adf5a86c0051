use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument};

use super::{deleted, Deleted};
use crate::{
    error::AppError,
    models::{Deal, DealPatch, NewDeal},
    state::AppState,
};

pub fn deals_routes() -> Router<AppState> {
    Router::new()
        .route("/deals", get(list_deals).post(create_deal))
        .route("/deals/:id", put(update_deal).delete(delete_deal))
}

#[instrument(skip(state))]
pub async fn list_deals(State(state): State<AppState>) -> Result<Json<Vec<Deal>>, AppError> {
    Ok(Json(state.store.list_deals().await?))
}

#[instrument(skip(state, payload))]
pub async fn create_deal(
    State(state): State<AppState>,
    payload: Result<Json<NewDeal>, JsonRejection>,
) -> Result<Json<Deal>, AppError> {
    let Json(new) = payload?;
    new.validate().map_err(AppError::Validation)?;
    let deal = state.store.create_deal(new).await?;
    info!(deal_id = deal.id, stage = %deal.stage, "deal created");
    Ok(Json(deal))
}

#[instrument(skip(state, payload))]
pub async fn update_deal(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    payload: Result<Json<DealPatch>, JsonRejection>,
) -> Result<Json<Deal>, AppError> {
    let Json(patch) = payload?;
    patch.validate().map_err(AppError::Validation)?;
    let deal = state
        .store
        .update_deal(id, patch)
        .await?
        .ok_or(AppError::NotFound("Deal"))?;
    info!(deal_id = id, stage = %deal.stage, "deal updated");
    Ok(Json(deal))
}

#[instrument(skip(state))]
pub async fn delete_deal(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Deleted>, AppError> {
    if !state.store.delete_deal(id).await? {
        return Err(AppError::NotFound("Deal"));
    }
    info!(deal_id = id, "deal deleted");
    Ok(deleted())
}
