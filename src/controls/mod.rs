pub mod filter;
pub mod handlers;
pub mod storage;
pub mod types;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::core::shared::state::AppState;
use crate::core::urls::ApiUrls;

pub use handlers::*;
pub use storage::*;
pub use types::*;

pub fn configure_controls_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(ApiUrls::CONTROLS, post(handle_create_control))
        .route(
            ApiUrls::CONTROL_BY_ID,
            get(handle_get_control).delete(handle_delete_control),
        )
        .route(ApiUrls::CONTROL_PROJECT, put(handle_add_control_to_project))
        .route(
            ApiUrls::QUERY_CONTROLS,
            get(handle_query_controls).post(handle_query_controls),
        )
}
