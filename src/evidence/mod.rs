pub mod handlers;
pub mod storage;
pub mod types;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::core::shared::state::AppState;
use crate::core::urls::ApiUrls;

pub use handlers::*;
pub use storage::*;
pub use types::*;

/// `max_upload_bytes` replaces axum's default body limit on the upload route.
pub fn configure_evidence_routes(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route(ApiUrls::EVIDENCE, post(handle_create_evidence))
        .route(
            ApiUrls::EVIDENCE_BY_ID,
            get(handle_get_evidence)
                .put(handle_update_evidence)
                .delete(handle_delete_evidence),
        )
        .route(ApiUrls::EVIDENCE_FILES, get(handle_list_evidence_files))
        .route(
            ApiUrls::EVIDENCE_ADD_FILE,
            post(handle_add_evidence_file).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route(
            ApiUrls::EVIDENCE_FILE_BY_ID,
            get(handle_download_evidence_file).delete(handle_delete_evidence_file),
        )
        .route(ApiUrls::EVIDENCE_CONTROLS, put(handle_set_evidence_controls))
}
