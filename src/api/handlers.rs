//! HTTP handlers for the dashboard API.

use super::types::*;
use super::AppState;
use crate::error::AppError;
use crate::site::{NewSite, Site, SiteStats, SiteUpdate};
use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        app: "freeapi-control",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn list_sites(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Site>>, AppError> {
    Ok(Json(state.service.list()?))
}

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<SiteStats>, AppError> {
    Ok(Json(state.service.stats()?))
}

pub async fn create_site(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewSite>,
) -> Result<Json<SiteResponse>, AppError> {
    let site = state.service.create(request).await?;
    Ok(Json(SiteResponse { success: true, site }))
}

pub async fn update_site(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<SiteUpdate>,
) -> Result<Json<SiteResponse>, AppError> {
    let site = state.service.update(&id, request).await?;
    Ok(Json(SiteResponse { success: true, site }))
}

pub async fn delete_site(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.service.delete(&id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

pub async fn check_balance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CheckBalanceResponse>, AppError> {
    let data = state.service.check_one(&id).await?;
    let model_count = data.model_count();

    Ok(Json(CheckBalanceResponse {
        success: true,
        balance: data.balance,
        total_limit: data.total_limit,
        models: data.models,
        model_count,
    }))
}

pub async fn check_all_balances(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CheckAllResponse>, AppError> {
    let report = state.service.check_all().await?;

    Ok(Json(CheckAllResponse {
        success: true,
        results: report.results.into_iter().map(BatchEntryResponse::from).collect(),
        summary: report.summary,
    }))
}
