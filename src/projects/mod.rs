pub mod completion;
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

pub fn configure_projects_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(ApiUrls::PROJECTS, post(handle_create_project))
        .route(ApiUrls::PROJECTS_SUBCONTROLS, get(handle_list_project_subcontrols))
        .route(ApiUrls::PROJECT_BY_ID, get(handle_get_project))
        .route(ApiUrls::PROJECT_CONTROLS, get(handle_get_project_controls))
        .route(
            ApiUrls::PROJECT_CONTROL_BY_ID,
            get(handle_get_project_control).delete(handle_remove_project_control),
        )
        .route(
            ApiUrls::PROJECT_POLICY_BY_ID,
            get(handle_get_project_policy)
                .put(handle_update_project_policy)
                .delete(handle_remove_project_policy),
        )
        .route(
            ApiUrls::PROJECT_POLICY_CONTROL,
            put(handle_add_project_policy_control).delete(handle_remove_project_policy_control),
        )
        .route(
            ApiUrls::PROJECT_CONTROL_SUBCONTROL,
            put(handle_update_project_subcontrol),
        )
        .route(
            ApiUrls::PROJECT_CONTROL_APPLICABILITY,
            put(handle_set_control_applicability),
        )
}
