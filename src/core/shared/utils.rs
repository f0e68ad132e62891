use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::info;
use std::time::Duration;

use crate::core::config::DatabaseConfig;
use crate::core::error::GrcError;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConn = SqliteConnection;

/// Applied to every connection the pool hands out. SQLite keeps these
/// settings per connection, so they cannot be set once at startup.
#[derive(Debug, Clone, Copy)]
struct SqlitePragmas {
    busy_timeout_ms: u64,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {};",
            self.busy_timeout_ms
        ))
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

fn is_memory_url(url: &str) -> bool {
    url == ":memory:" || url.starts_with("file::memory:")
}

pub fn create_conn(config: &DatabaseConfig) -> Result<DbPool, diesel::r2d2::PoolError> {
    let manager = ConnectionManager::<SqliteConnection>::new(config.url.as_str());
    let customizer = SqlitePragmas {
        busy_timeout_ms: config.busy_timeout_ms,
    };

    let builder = Pool::builder().connection_customizer(Box::new(customizer));

    // Every in-memory connection is its own database, so the pool must hold
    // exactly one connection and never recycle it.
    let builder = if is_memory_url(&config.url) {
        builder.max_size(1).idle_timeout(None).max_lifetime(None)
    } else {
        builder
            .max_size(config.pool_size)
            .connection_timeout(Duration::from_secs(30))
    };

    builder.build(manager)
}

/// Run pending embedded migrations.
pub fn run_migrations(pool: &DbPool) -> Result<(), GrcError> {
    let mut pooled = pool.get()?;
    let conn: &mut SqliteConnection = &mut pooled;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| GrcError::Database(format!("Migration error: {e}")))?;
    if !applied.is_empty() {
        info!("Applied {} database migration(s)", applied.len());
    }
    Ok(())
}

/// Run blocking diesel work on a pooled connection off the async runtime.
pub async fn with_conn<T, F>(pool: &DbPool, f: F) -> Result<T, GrcError>
where
    F: FnOnce(&mut DbConn) -> Result<T, GrcError> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        f(&mut *conn)
    })
    .await?
}

/// A migrated single-connection in-memory database.
pub fn open_memory_pool() -> Result<DbPool, GrcError> {
    let config = DatabaseConfig {
        url: ":memory:".to_string(),
        ..DatabaseConfig::default()
    };
    let pool = create_conn(&config)?;
    run_migrations(&pool)?;
    Ok(pool)
}
