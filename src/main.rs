use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use log::{info, warn};
use std::sync::Arc;

use grcserver::core::config::AppConfig;
use grcserver::core::middleware::issue_token;
use grcserver::core::shared::state::AppState;
use grcserver::core::shared::utils::{create_conn, run_migrations, with_conn, DbPool};
use grcserver::core::users::{count_users, create_user, find_active_user};
use grcserver::main_module::run_axum_server;

#[derive(Debug, Parser)]
#[command(name = "grcserver", version, about = "GRC platform REST API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Create a local user account
    CreateUser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        /// Comma separated, e.g. `admin`
        #[arg(long, value_delimiter = ',')]
        roles: Vec<String>,
    },
    /// Print a bearer token for an existing user
    IssueToken {
        #[arg(long)]
        user_id: i32,
        /// Lifetime in seconds; defaults to auth.token_ttl_seconds
        #[arg(long)]
        ttl: Option<i64>,
    },
}

fn open_database(config: &AppConfig) -> anyhow::Result<DbPool> {
    let pool = create_conn(&config.database)
        .with_context(|| format!("opening database {}", config.database.url))?;
    run_migrations(&pool).context("running migrations")?;
    Ok(pool)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load().context("loading configuration")?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .write_style(env_logger::WriteStyle::Always)
        .init();

    if config.uses_dev_secret() {
        warn!("GRC_AUTH__JWT_SECRET not set, using default development secret - DO NOT USE IN PRODUCTION");
    }

    let pool = open_database(&config)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let addr = config.bind_addr()?;
            let users = with_conn(&pool, count_users).await?;
            if users == 0 {
                warn!("No users exist yet; create one with `grcserver create-user`");
            }
            let state = Arc::new(AppState::new(pool, config));
            info!("Starting grcserver {}", env!("CARGO_PKG_VERSION"));
            run_axum_server(state, addr).await?;
        }
        Command::Migrate => {
            info!("Database {} is up to date", config.database.url);
        }
        Command::CreateUser {
            email,
            username,
            roles,
        } => {
            let user = with_conn(&pool, move |conn| create_user(conn, &email, &username, &roles))
                .await?;
            println!("created user {} ({}) roles=[{}]", user.id, user.email, user.roles);
        }
        Command::IssueToken { user_id, ttl } => {
            let user = with_conn(&pool, move |conn| find_active_user(conn, user_id))
                .await?
                .with_context(|| format!("no active user with id {user_id}"))?;
            let ttl = ttl.unwrap_or(config.auth.token_ttl_seconds);
            println!("{}", issue_token(user.id, &config.auth.jwt_secret, ttl)?);
        }
    }

    Ok(())
}
