use axum::{
    extract::State,
    Json,
};
use log::info;
use std::sync::Arc;

use crate::core::error::GrcError;
use crate::core::middleware::{ApiJson, ApiPath, RequireAdmin, RequireLogin};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;

use super::storage::{create_framework, find_framework, list_frameworks, DbFramework};
use super::types::CreateFrameworkRequest;

pub async fn handle_list_frameworks(
    State(state): State<Arc<AppState>>,
    _user: RequireLogin,
) -> Result<Json<Vec<DbFramework>>, GrcError> {
    let frameworks = with_conn(&state.conn, list_frameworks).await?;
    Ok(Json(frameworks))
}

pub async fn handle_get_framework(
    State(state): State<Arc<AppState>>,
    _user: RequireLogin,
    ApiPath(framework_id): ApiPath<i32>,
) -> Result<Json<DbFramework>, GrcError> {
    let framework = with_conn(&state.conn, move |conn| find_framework(conn, framework_id)).await?;
    Ok(Json(framework))
}

pub async fn handle_create_framework(
    State(state): State<Arc<AppState>>,
    RequireAdmin(user): RequireAdmin,
    ApiJson(req): ApiJson<CreateFrameworkRequest>,
) -> Result<Json<DbFramework>, GrcError> {
    let framework = with_conn(&state.conn, move |conn| create_framework(conn, req)).await?;
    info!("User {} created framework {} ({})", user.user_id, framework.id, framework.name);
    Ok(Json(framework))
}
