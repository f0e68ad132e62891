use axum::{
    extract::State,
    Json,
};
use bytes::Bytes;
use log::info;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::core::error::GrcError;
use crate::core::middleware::{ApiJson, ApiPath, ApiQuery, RequireAdmin, RequireLogin};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;
use crate::projects::add_control_to_project;

use super::filter::{run_query, QueryRequest, QueryResponse};
use super::storage::{create_control, hide_control, load_control_view};
use super::types::{ControlView, CreateControlRequest};

pub async fn handle_get_control(
    State(state): State<Arc<AppState>>,
    _user: RequireLogin,
    ApiPath(control_id): ApiPath<i32>,
) -> Result<Json<ControlView>, GrcError> {
    let view = with_conn(&state.conn, move |conn| load_control_view(conn, control_id)).await?;
    Ok(Json(view))
}

pub async fn handle_create_control(
    State(state): State<Arc<AppState>>,
    RequireAdmin(user): RequireAdmin,
    ApiJson(req): ApiJson<CreateControlRequest>,
) -> Result<Json<Value>, GrcError> {
    let control_id = with_conn(&state.conn, move |conn| create_control(conn, &req)).await?;
    info!("User {} created control {}", user.user_id, control_id);
    Ok(Json(json!({ "message": "ok" })))
}

pub async fn handle_delete_control(
    State(state): State<Arc<AppState>>,
    RequireAdmin(user): RequireAdmin,
    ApiPath(control_id): ApiPath<i32>,
) -> Result<Json<Value>, GrcError> {
    with_conn(&state.conn, move |conn| hide_control(conn, control_id)).await?;
    info!("User {} hid control {}", user.user_id, control_id);
    Ok(Json(json!({ "message": "ok" })))
}

pub async fn handle_add_control_to_project(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    ApiPath((control_id, project_id)): ApiPath<(i32, i32)>,
) -> Result<Json<ControlView>, GrcError> {
    let view = with_conn(&state.conn, move |conn| {
        add_control_to_project(conn, project_id, control_id)?;
        load_control_view(conn, control_id)
    })
    .await?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
pub struct QueryControlsParams {
    #[serde(default = "default_columns")]
    pub columns: String,
}

fn default_columns() -> String {
    "no".to_string()
}

/// GET or POST. The body, when present, is a JSON `QueryRequest`.
pub async fn handle_query_controls(
    State(state): State<Arc<AppState>>,
    _user: RequireLogin,
    ApiQuery(params): ApiQuery<QueryControlsParams>,
    body: Bytes,
) -> Result<Json<QueryResponse>, GrcError> {
    let request: QueryRequest = if body.iter().all(u8::is_ascii_whitespace) {
        QueryRequest::default()
    } else {
        serde_json::from_slice::<Option<QueryRequest>>(&body)
            .map_err(|e| GrcError::Validation(format!("invalid query: {e}")))?
            .unwrap_or_default()
    };
    let include_columns = params.columns != "no";

    let response =
        with_conn(&state.conn, move |conn| run_query(conn, &request, include_columns)).await?;
    Ok(Json(response))
}
