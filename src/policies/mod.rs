pub mod handlers;
pub mod storage;
pub mod types;

use axum::{
    routing::{get, put},
    Router,
};
use std::sync::Arc;

use crate::core::shared::state::AppState;
use crate::core::urls::ApiUrls;

pub use handlers::*;
pub use storage::*;
pub use types::*;

pub fn configure_policies_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            ApiUrls::POLICIES,
            get(handle_list_policies).post(handle_create_policy),
        )
        .route(
            ApiUrls::POLICY_BY_ID,
            get(handle_get_policy)
                .put(handle_update_policy)
                .delete(handle_delete_policy),
        )
        .route(
            ApiUrls::POLICY_CONTROL,
            put(handle_add_policy_control).delete(handle_remove_policy_control),
        )
        .route(ApiUrls::POLICY_PROJECT, put(handle_add_policy_to_project))
}
