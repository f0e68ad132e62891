//! Aggregations backing the dashboard charts. Soft-deleted policies and
//! controls are never counted.

pub mod handlers;
pub mod storage;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::core::shared::state::AppState;
use crate::core::urls::ApiUrls;

pub use handlers::*;
pub use storage::*;

pub fn configure_charts_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(ApiUrls::CHART_PROJECT_SUMMARIES, get(handle_project_summaries))
        .route(ApiUrls::CHART_TENANT_SUMMARY, get(handle_tenant_summary))
        .route(ApiUrls::CHART_CONTROLS_BY_FRAMEWORK, get(handle_controls_by_framework))
        .route(ApiUrls::CHART_CONTROLS_BY_CATEGORY, get(handle_controls_by_category))
        .route(ApiUrls::CHART_CONTROLS_BY_SUBCATEGORY, get(handle_controls_by_subcategory))
}
