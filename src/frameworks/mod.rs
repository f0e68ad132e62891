pub mod handlers;
pub mod storage;
pub mod types;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::core::shared::state::AppState;
use crate::core::urls::ApiUrls;

pub use handlers::*;
pub use storage::*;
pub use types::*;

pub fn configure_frameworks_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            ApiUrls::FRAMEWORKS,
            get(handle_list_frameworks).post(handle_create_framework),
        )
        .route(ApiUrls::FRAMEWORK_BY_ID, get(handle_get_framework))
}
