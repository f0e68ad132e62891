use crate::core::config::AppConfig;
use crate::core::shared::utils::DbPool;
use std::sync::Arc;

/// Shared handler state: the connection pool plus the loaded configuration.
#[derive(Clone)]
pub struct AppState {
    pub conn: DbPool,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(conn: DbPool, config: AppConfig) -> Self {
        Self {
            conn,
            config: Arc::new(config),
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.auth.jwt_secret
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("database_url", &self.config.database.url)
            .field("pool_size", &self.conn.state().connections)
            .finish()
    }
}
