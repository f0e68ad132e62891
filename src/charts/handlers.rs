use axum::{extract::State, Json};
use std::sync::Arc;

use crate::core::error::GrcError;
use crate::core::middleware::RequireLogin;
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;

use super::storage::{
    controls_by_category, controls_by_framework, controls_by_subcategory, project_summaries,
    tenant_summary, CategoryCounts, ProjectSummaries,
};

pub async fn handle_project_summaries(
    State(state): State<Arc<AppState>>,
    _user: RequireLogin,
) -> Result<Json<ProjectSummaries>, GrcError> {
    Ok(Json(with_conn(&state.conn, project_summaries).await?))
}

pub async fn handle_tenant_summary(
    State(state): State<Arc<AppState>>,
    _user: RequireLogin,
) -> Result<Json<CategoryCounts>, GrcError> {
    Ok(Json(with_conn(&state.conn, tenant_summary).await?))
}

pub async fn handle_controls_by_framework(
    State(state): State<Arc<AppState>>,
    _user: RequireLogin,
) -> Result<Json<CategoryCounts>, GrcError> {
    Ok(Json(with_conn(&state.conn, controls_by_framework).await?))
}

pub async fn handle_controls_by_category(
    State(state): State<Arc<AppState>>,
    _user: RequireLogin,
) -> Result<Json<CategoryCounts>, GrcError> {
    Ok(Json(with_conn(&state.conn, controls_by_category).await?))
}

pub async fn handle_controls_by_subcategory(
    State(state): State<Arc<AppState>>,
    _user: RequireLogin,
) -> Result<Json<CategoryCounts>, GrcError> {
    Ok(Json(with_conn(&state.conn, controls_by_subcategory).await?))
}
