use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::core::error::GrcError;
use crate::core::middleware::{ApiJson, ApiPath, RequireAdmin, RequireLogin};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;

use super::storage::{
    create_label, create_tag, delete_label, delete_tag, list_labels, list_tags, CreateLabelRequest,
    CreateTagRequest, DbPolicyLabel, DbTag,
};

fn deleted_response(deleted: bool) -> Response {
    if deleted {
        Json(json!({ "message": "ok" })).into_response()
    } else {
        (StatusCode::NOT_FOUND, Json(json!({ "message": "not found" }))).into_response()
    }
}

pub async fn handle_list_tags(
    State(state): State<Arc<AppState>>,
    _user: RequireLogin,
) -> Result<Json<Vec<DbTag>>, GrcError> {
    Ok(Json(with_conn(&state.conn, list_tags).await?))
}

pub async fn handle_create_tag(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    ApiJson(req): ApiJson<CreateTagRequest>,
) -> Result<Json<DbTag>, GrcError> {
    let tag = with_conn(&state.conn, move |conn| create_tag(conn, &req.name)).await?;
    Ok(Json(tag))
}

pub async fn handle_delete_tag(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    ApiPath(tag_id): ApiPath<i32>,
) -> Result<Response, GrcError> {
    let deleted = with_conn(&state.conn, move |conn| delete_tag(conn, tag_id)).await?;
    Ok(deleted_response(deleted))
}

pub async fn handle_list_labels(
    State(state): State<Arc<AppState>>,
    _user: RequireLogin,
) -> Result<Json<Vec<DbPolicyLabel>>, GrcError> {
    Ok(Json(with_conn(&state.conn, list_labels).await?))
}

pub async fn handle_create_label(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    ApiJson(req): ApiJson<CreateLabelRequest>,
) -> Result<Json<DbPolicyLabel>, GrcError> {
    let label = with_conn(&state.conn, move |conn| create_label(conn, req)).await?;
    Ok(Json(label))
}

pub async fn handle_delete_label(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    ApiPath(label_id): ApiPath<i32>,
) -> Result<Response, GrcError> {
    let deleted = with_conn(&state.conn, move |conn| delete_label(conn, label_id)).await?;
    Ok(deleted_response(deleted))
}
