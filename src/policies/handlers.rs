use axum::{
    extract::State,
    Json,
};
use log::info;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::core::error::GrcError;
use crate::core::middleware::{ApiJson, ApiPath, RequireAdmin, RequireLogin};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;
use crate::projects::add_policy_to_project;

use super::storage::{
    add_policy_control, create_policy, hide_policy, list_policies, load_policy_view,
    remove_policy_control, update_policy, DbPolicy,
};
use super::types::{CreatePolicyRequest, PolicyView, UpdatePolicyRequest};

pub async fn handle_list_policies(
    State(state): State<Arc<AppState>>,
    _user: RequireLogin,
) -> Result<Json<Vec<DbPolicy>>, GrcError> {
    Ok(Json(with_conn(&state.conn, list_policies).await?))
}

pub async fn handle_get_policy(
    State(state): State<Arc<AppState>>,
    _user: RequireLogin,
    ApiPath(policy_id): ApiPath<i32>,
) -> Result<Json<PolicyView>, GrcError> {
    let view = with_conn(&state.conn, move |conn| load_policy_view(conn, policy_id)).await?;
    Ok(Json(view))
}

pub async fn handle_create_policy(
    State(state): State<Arc<AppState>>,
    RequireAdmin(user): RequireAdmin,
    ApiJson(req): ApiJson<CreatePolicyRequest>,
) -> Result<Json<DbPolicy>, GrcError> {
    let policy = with_conn(&state.conn, move |conn| create_policy(conn, &req)).await?;
    info!("User {} created policy {}", user.user_id, policy.id);
    Ok(Json(policy))
}

pub async fn handle_update_policy(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    ApiPath(policy_id): ApiPath<i32>,
    ApiJson(req): ApiJson<UpdatePolicyRequest>,
) -> Result<Json<DbPolicy>, GrcError> {
    let policy = with_conn(&state.conn, move |conn| update_policy(conn, policy_id, &req)).await?;
    Ok(Json(policy))
}

pub async fn handle_delete_policy(
    State(state): State<Arc<AppState>>,
    RequireAdmin(user): RequireAdmin,
    ApiPath(policy_id): ApiPath<i32>,
) -> Result<Json<Value>, GrcError> {
    with_conn(&state.conn, move |conn| hide_policy(conn, policy_id)).await?;
    info!("User {} hid policy {}", user.user_id, policy_id);
    Ok(Json(json!({ "message": "ok" })))
}

pub async fn handle_add_policy_control(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    ApiPath((policy_id, control_id)): ApiPath<(i32, i32)>,
) -> Result<Json<Value>, GrcError> {
    with_conn(&state.conn, move |conn| add_policy_control(conn, policy_id, control_id)).await?;
    Ok(Json(json!({ "message": "ok" })))
}

pub async fn handle_remove_policy_control(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    ApiPath((policy_id, control_id)): ApiPath<(i32, i32)>,
) -> Result<Json<Value>, GrcError> {
    with_conn(&state.conn, move |conn| remove_policy_control(conn, policy_id, control_id)).await?;
    Ok(Json(json!({ "message": "ok" })))
}

pub async fn handle_add_policy_to_project(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    ApiPath((policy_id, project_id)): ApiPath<(i32, i32)>,
) -> Result<Json<PolicyView>, GrcError> {
    let view = with_conn(&state.conn, move |conn| {
        add_policy_to_project(conn, project_id, policy_id)?;
        load_policy_view(conn, policy_id)
    })
    .await?;
    Ok(Json(view))
}
