use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::{info, warn};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::core::error::GrcError;
use crate::core::middleware::{ApiJson, ApiPath, RequireAdmin, RequireLogin};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;

use super::storage::{
    add_project_policy_control, create_project, list_all_project_subcontrols,
    load_project_control_view, load_project_policy_view, load_project_view,
    project_subcontrols_with_evidence, remove_project_control, remove_project_policy,
    remove_project_policy_control, set_control_applicability, update_project_policy,
    update_project_subcontrol, DbProjectPolicy,
};
use super::types::{
    ApplicabilityRequest, CreateProjectRequest, ProjectControlView, ProjectPolicyView,
    ProjectSubControlView, ProjectView, UpdateProjectPolicyRequest,
    UpdateProjectSubControlRequest,
};

fn ok() -> Json<Value> {
    Json(json!({ "message": "ok" }))
}

pub async fn handle_get_project(
    State(state): State<Arc<AppState>>,
    _user: RequireLogin,
    ApiPath(project_id): ApiPath<i32>,
) -> Result<Json<ProjectView>, GrcError> {
    let view = with_conn(&state.conn, move |conn| load_project_view(conn, project_id)).await?;
    Ok(Json(view))
}

/// Every failure, including a malformed payload, is reported the same way.
pub async fn handle_create_project(
    State(state): State<Arc<AppState>>,
    RequireAdmin(user): RequireAdmin,
    payload: Result<ApiJson<CreateProjectRequest>, GrcError>,
) -> Response {
    let owner_id = user.user_id;
    let result = match payload {
        Ok(ApiJson(req)) => {
            with_conn(&state.conn, move |conn| create_project(conn, &req, Some(owner_id))).await
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(project_id) => {
            info!("User {} created project {}", owner_id, project_id);
            Json(json!({ "message": "project created", "id": project_id })).into_response()
        }
        Err(e) => {
            warn!("Project creation by user {} failed: {}", owner_id, e);
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": "failed to create project" })),
            )
                .into_response()
        }
    }
}

pub async fn handle_list_project_subcontrols(
    State(state): State<Arc<AppState>>,
    _user: RequireLogin,
) -> Result<Json<Vec<ProjectSubControlView>>, GrcError> {
    Ok(Json(with_conn(&state.conn, list_all_project_subcontrols).await?))
}

pub async fn handle_get_project_controls(
    State(state): State<Arc<AppState>>,
    _user: RequireLogin,
    ApiPath(project_id): ApiPath<i32>,
) -> Result<Json<Vec<ProjectSubControlView>>, GrcError> {
    let subcontrols = with_conn(&state.conn, move |conn| {
        project_subcontrols_with_evidence(conn, project_id)
    })
    .await?;
    Ok(Json(subcontrols))
}

pub async fn handle_get_project_control(
    State(state): State<Arc<AppState>>,
    _user: RequireLogin,
    ApiPath((project_id, project_control_id)): ApiPath<(i32, i32)>,
) -> Result<Json<ProjectControlView>, GrcError> {
    let view = with_conn(&state.conn, move |conn| {
        load_project_control_view(conn, project_id, project_control_id)
    })
    .await?;
    Ok(Json(view))
}

pub async fn handle_remove_project_control(
    State(state): State<Arc<AppState>>,
    RequireAdmin(user): RequireAdmin,
    ApiPath((project_id, project_control_id)): ApiPath<(i32, i32)>,
) -> Result<Json<Value>, GrcError> {
    with_conn(&state.conn, move |conn| {
        remove_project_control(conn, project_id, project_control_id)
    })
    .await?;
    info!(
        "User {} removed control {} from project {}",
        user.user_id, project_control_id, project_id
    );
    Ok(ok())
}

pub async fn handle_get_project_policy(
    State(state): State<Arc<AppState>>,
    _user: RequireLogin,
    ApiPath((project_id, project_policy_id)): ApiPath<(i32, i32)>,
) -> Result<Json<ProjectPolicyView>, GrcError> {
    let view = with_conn(&state.conn, move |conn| {
        load_project_policy_view(conn, project_id, project_policy_id)
    })
    .await?;
    Ok(Json(view))
}

pub async fn handle_update_project_policy(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    ApiPath((project_id, project_policy_id)): ApiPath<(i32, i32)>,
    ApiJson(req): ApiJson<UpdateProjectPolicyRequest>,
) -> Result<Json<DbProjectPolicy>, GrcError> {
    let policy = with_conn(&state.conn, move |conn| {
        update_project_policy(conn, project_id, project_policy_id, &req)
    })
    .await?;
    Ok(Json(policy))
}

pub async fn handle_remove_project_policy(
    State(state): State<Arc<AppState>>,
    RequireAdmin(user): RequireAdmin,
    ApiPath((project_id, project_policy_id)): ApiPath<(i32, i32)>,
) -> Result<Json<Value>, GrcError> {
    with_conn(&state.conn, move |conn| {
        remove_project_policy(conn, project_id, project_policy_id)
    })
    .await?;
    info!(
        "User {} removed policy {} from project {}",
        user.user_id, project_policy_id, project_id
    );
    Ok(Json(json!({ "message": "policy removed" })))
}

pub async fn handle_add_project_policy_control(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    ApiPath((project_id, project_policy_id, project_control_id)): ApiPath<(i32, i32, i32)>,
) -> Result<Json<Value>, GrcError> {
    with_conn(&state.conn, move |conn| {
        add_project_policy_control(conn, project_id, project_policy_id, project_control_id)
    })
    .await?;
    Ok(ok())
}

pub async fn handle_remove_project_policy_control(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    ApiPath((project_id, project_policy_id, project_control_id)): ApiPath<(i32, i32, i32)>,
) -> Result<Json<Value>, GrcError> {
    with_conn(&state.conn, move |conn| {
        remove_project_policy_control(conn, project_id, project_policy_id, project_control_id)
    })
    .await?;
    Ok(ok())
}

pub async fn handle_update_project_subcontrol(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    ApiPath((project_control_id, project_subcontrol_id)): ApiPath<(i32, i32)>,
    ApiJson(req): ApiJson<UpdateProjectSubControlRequest>,
) -> Result<Json<Value>, GrcError> {
    with_conn(&state.conn, move |conn| {
        update_project_subcontrol(conn, project_control_id, project_subcontrol_id, &req)
    })
    .await?;
    Ok(ok())
}

pub async fn handle_set_control_applicability(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    ApiPath(project_control_id): ApiPath<i32>,
    ApiJson(req): ApiJson<ApplicabilityRequest>,
) -> Result<Json<Value>, GrcError> {
    with_conn(&state.conn, move |conn| {
        set_control_applicability(conn, project_control_id, req.applicable)
    })
    .await?;
    Ok(ok())
}
