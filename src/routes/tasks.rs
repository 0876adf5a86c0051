use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument};

use super::{deleted, Deleted};
use crate::{
    error::AppError,
    models::{NewTask, Task, TaskPatch},
    state::AppState,
};

pub fn tasks_routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/:id", put(update_task).delete(delete_task))
}

#[instrument(skip(state))]
pub async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<Task>>, AppError> {
    Ok(Json(state.store.list_tasks().await?))
}

#[instrument(skip(state, payload))]
pub async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<NewTask>, JsonRejection>,
) -> Result<Json<Task>, AppError> {
    let Json(new) = payload?;
    new.validate().map_err(AppError::Validation)?;
    let task = state.store.create_task(new).await?;
    info!(task_id = task.id, "task created");
    Ok(Json(task))
}

/// Also the target of board moves, which send only `{stage}`.
#[instrument(skip(state, payload))]
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    payload: Result<Json<TaskPatch>, JsonRejection>,
) -> Result<Json<Task>, AppError> {
    let Json(patch) = payload?;
    patch.validate().map_err(AppError::Validation)?;
    let task = state
        .store
        .update_task(id, patch)
        .await?
        .ok_or(AppError::NotFound("Task"))?;
    info!(task_id = id, stage = %task.stage, "task updated");
    Ok(Json(task))
}

#[instrument(skip(state))]
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Deleted>, AppError> {
    if !state.store.delete_task(id).await? {
        return Err(AppError::NotFound("Task"));
    }
    info!(task_id = id, "task deleted");
    Ok(deleted())
}
