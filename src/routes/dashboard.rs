use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    error::AppError,
    models::{DealStage, RecentDeal},
    state::AppState,
};

/// Shown as-is on the dashboard; no retention tracking exists.
pub const RETENTION_RATE: f64 = 98.5;
const RECENT_DEALS: i64 = 5;
const PALETTE: [&str; 5] = [
    "bg-primary-40",
    "bg-secondary-40",
    "bg-purple-500",
    "bg-emerald-500",
    "bg-rose-500",
];

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_revenue: f64,
    pub active_users: i64,
    pub new_deals: i64,
    pub retention_rate: f64,
}

pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard/stats", get(stats))
        .route("/dashboard/recent-deals", get(recent_deals))
}

#[instrument(skip(state))]
pub async fn stats(State(state): State<AppState>) -> Result<Json<DashboardStats>, AppError> {
    let store = state.store.as_ref();
    Ok(Json(DashboardStats {
        total_revenue: store.deal_value_in_stage(DealStage::Won).await?,
        active_users: store.count_users().await?,
        new_deals: store.count_deals_in_stage(DealStage::Lead).await?,
        retention_rate: RETENTION_RATE,
    }))
}

#[instrument(skip(state))]
pub async fn recent_deals(
    State(state): State<AppState>,
) -> Result<Json<Vec<RecentDeal>>, AppError> {
    let deals = state.store.recent_deals(RECENT_DEALS).await?;
    Ok(Json(
        deals
            .into_iter()
            .zip(PALETTE.iter().cycle())
            .map(|(deal, color)| RecentDeal {
                deal,
                color: color.to_string(),
            })
            .collect(),
    ))
}
