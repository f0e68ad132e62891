pub mod handlers;
pub mod storage;

use axum::{
    routing::{delete, get},
    Router,
};
use std::sync::Arc;

use crate::core::shared::state::AppState;
use crate::core::urls::ApiUrls;

pub use handlers::*;
pub use storage::*;

pub fn configure_tags_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(ApiUrls::TAGS, get(handle_list_tags).post(handle_create_tag))
        .route(ApiUrls::TAG_BY_ID, delete(handle_delete_tag))
        .route(ApiUrls::LABELS, get(handle_list_labels).post(handle_create_label))
        .route(ApiUrls::LABEL_BY_ID, delete(handle_delete_label))
}
