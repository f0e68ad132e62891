//! API Router
//!
//! Combines the routes of every domain module under `/api/v1`.

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::core::config::AppConfig;
use crate::core::shared::state::AppState;
use crate::core::urls::ApiUrls;
use crate::main_module::health_check;

/// Configure all API routes from all modules
pub fn configure_api_routes(config: &AppConfig) -> Router<Arc<AppState>> {
    let api = Router::new()
        .route(ApiUrls::HEALTH, get(health_check))
        .merge(crate::projects::configure_projects_routes())
        .merge(crate::policies::configure_policies_routes())
        .merge(crate::frameworks::configure_frameworks_routes())
        .merge(crate::evidence::configure_evidence_routes(config.server.max_upload_bytes))
        .merge(crate::controls::configure_controls_routes())
        .merge(crate::tags::configure_tags_routes())
        .merge(crate::charts::configure_charts_routes());

    Router::new().nest(ApiUrls::PREFIX, api)
}
