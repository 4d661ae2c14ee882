use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;
use tracing::{debug, instrument};

use super::AppState;
use super::error::ApiError;
use crate::budget::BudgetStatus;
use crate::cache::CacheStats;
use crate::types::{BatchRequest, BatchResponse, DataRequest, Envelope};
use crate::version::version_string;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: version_string(),
    })
}

#[instrument(skip_all, name = "api_fetch_data", fields(entity = %request.entity_id, data_type = %request.data_type))]
pub async fn fetch_data(
    State(state): State<AppState>,
    Json(request): Json<DataRequest>,
) -> Result<Json<Envelope>, ApiError> {
    let envelope = state.gateway.fetch(&request).await?;
    debug!(source = %envelope.source, "data request served");
    Ok(Json(envelope))
}

#[instrument(skip_all, name = "api_fetch_batch", fields(companies = request.companies.len()))]
pub async fn fetch_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, ApiError> {
    Ok(Json(state.gateway.batch(&request).await?))
}

pub async fn list_budgets(State(state): State<AppState>) -> Result<Json<Vec<BudgetStatus>>, ApiError> {
    Ok(Json(state.gateway.budget_statuses().await?))
}

pub async fn get_budget(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> Result<Json<BudgetStatus>, ApiError> {
    Ok(Json(state.gateway.budget_status(&provider).await?))
}

pub async fn cache_stats(State(state): State<AppState>) -> Result<Json<CacheStats>, ApiError> {
    Ok(Json(state.gateway.cache_stats().await?))
}
