use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use log::info;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::core::error::GrcError;
use crate::core::middleware::{ApiJson, ApiMultipart, ApiPath, RequireAdmin};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;

use super::storage::{
    add_file, create_evidence, delete_evidence, delete_file, find_evidence, list_file_ids,
    load_file, set_evidence_links, update_evidence, DbEvidence,
};
use super::types::{EvidenceFileList, EvidenceRequest};

pub async fn handle_get_evidence(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    ApiPath(evidence_id): ApiPath<i32>,
) -> Result<Json<DbEvidence>, GrcError> {
    let evidence = with_conn(&state.conn, move |conn| find_evidence(conn, evidence_id)).await?;
    Ok(Json(evidence))
}

pub async fn handle_create_evidence(
    State(state): State<Arc<AppState>>,
    RequireAdmin(user): RequireAdmin,
    ApiJson(req): ApiJson<EvidenceRequest>,
) -> Result<Json<DbEvidence>, GrcError> {
    let evidence = with_conn(&state.conn, move |conn| create_evidence(conn, &req)).await?;
    info!("User {} created evidence {}", user.user_id, evidence.id);
    Ok(Json(evidence))
}

pub async fn handle_update_evidence(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    ApiPath(evidence_id): ApiPath<i32>,
    ApiJson(req): ApiJson<EvidenceRequest>,
) -> Result<Json<DbEvidence>, GrcError> {
    let evidence =
        with_conn(&state.conn, move |conn| update_evidence(conn, evidence_id, &req)).await?;
    Ok(Json(evidence))
}

pub async fn handle_delete_evidence(
    State(state): State<Arc<AppState>>,
    RequireAdmin(user): RequireAdmin,
    ApiPath(evidence_id): ApiPath<i32>,
) -> Result<Json<Value>, GrcError> {
    with_conn(&state.conn, move |conn| delete_evidence(conn, evidence_id)).await?;
    info!("User {} deleted evidence {}", user.user_id, evidence_id);
    Ok(Json(json!({ "message": "ok" })))
}

pub async fn handle_list_evidence_files(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    ApiPath(evidence_id): ApiPath<i32>,
) -> Result<Json<EvidenceFileList>, GrcError> {
    let files = with_conn(&state.conn, move |conn| list_file_ids(conn, evidence_id)).await?;
    Ok(Json(EvidenceFileList { files }))
}

/// Multipart upload: `file` carries the content, `filename` the stored name.
/// Without `filename` the part's own file name is used.
pub async fn handle_add_evidence_file(
    State(state): State<Arc<AppState>>,
    RequireAdmin(user): RequireAdmin,
    ApiPath(evidence_id): ApiPath<i32>,
    ApiMultipart(mut multipart): ApiMultipart,
) -> Result<Json<Value>, GrcError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut part_name: Option<String> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                part_name = field.file_name().map(str::to_string);
                file_data = Some(field.bytes().await?.to_vec());
            }
            "filename" => {
                file_name = Some(field.text().await?);
            }
            _ => {}
        }
    }

    let data = file_data.ok_or_else(|| GrcError::Validation("No file provided".to_string()))?;
    let name = file_name
        .or(part_name)
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| GrcError::Validation("No filename provided".to_string()))?;

    let size = data.len();
    let file_id =
        with_conn(&state.conn, move |conn| add_file(conn, evidence_id, &name, &data)).await?;
    info!(
        "User {} attached file {} ({} bytes) to evidence {}",
        user.user_id, file_id, size, evidence_id
    );
    Ok(Json(json!({ "message": "ok" })))
}

fn content_disposition(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .collect();
    format!("attachment; filename=\"{safe}\"")
}

pub async fn handle_download_evidence_file(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    ApiPath(file_id): ApiPath<i32>,
) -> Result<Response, GrcError> {
    let file = with_conn(&state.conn, move |conn| load_file(conn, file_id)).await?;
    let content_type = mime_guess::from_path(&file.name)
        .first_or_octet_stream()
        .to_string();

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, content_disposition(&file.name)),
        ],
        file.data,
    )
        .into_response())
}

pub async fn handle_delete_evidence_file(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    ApiPath(file_id): ApiPath<i32>,
) -> Result<Json<Value>, GrcError> {
    with_conn(&state.conn, move |conn| delete_file(conn, file_id)).await?;
    Ok(Json(json!({ "message": "ok" })))
}

pub async fn handle_set_evidence_controls(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    ApiPath(evidence_id): ApiPath<i32>,
    ApiJson(project_subcontrol_ids): ApiJson<Vec<i32>>,
) -> Result<Json<Value>, GrcError> {
    with_conn(&state.conn, move |conn| {
        set_evidence_links(conn, evidence_id, &project_subcontrol_ids)
    })
    .await?;
    Ok(Json(json!({ "message": "ok" })))
}
