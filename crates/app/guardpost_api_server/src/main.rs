//! Guardpost API server binary.
//!
//! Reads configuration from the environment (and `.env`), overridable on the
//! command line, then serves the mobile duty API until interrupted.

use std::sync::Arc;

use clap::Parser;
use guardpost_api::config::ApiConfig;
use guardpost_core::store::{DutyStore, MemoryStore, PgStore, UserStore};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "guardpost_api_server", about = "Guardpost API server")]
struct Args {
    /// Address to listen on. Overrides `BIND_ADDR`.
    #[arg(long)]
    bind_addr: Option<String>,

    /// PostgreSQL connection URL. Overrides `DATABASE_URL`.
    #[arg(long)]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool. Overrides
    /// `DB_MAX_CONNECTIONS`.
    #[arg(long)]
    max_connections: Option<u32>,

    /// Keep all state in process memory instead of PostgreSQL.
    ///
    /// Development only: nothing survives a restart and no locations or
    /// shifts exist, so clock-in works only without references.
    #[arg(long, env = "GUARDPOST_MEMORY_STORE", default_value_t = false)]
    memory_store: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,guardpost_api=debug,guardpost_core=debug".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env()?;
    if let Some(bind_addr) = args.bind_addr {
        config.bind_addr = bind_addr;
    }
    if let Some(database_url) = args.database_url {
        config.pg_connection_url = database_url;
    }
    if let Some(max_connections) = args.max_connections {
        config.max_connections = max_connections;
    }

    info!(
        bind_addr = %config.bind_addr,
        idp_mode = ?config.identity.mode,
        memory_store = args.memory_store,
        "starting guardpost_api_server"
    );

    let (users, store): (Arc<dyn UserStore>, Arc<dyn DutyStore>) = if args.memory_store {
        warn!("using in-memory store; state is lost on exit");
        let store = Arc::new(MemoryStore::new());
        (store.clone() as Arc<dyn UserStore>, store as Arc<dyn DutyStore>)
    } else {
        info!(
            max_connections = config.max_connections,
            "configuring connection pool"
        );
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect(&config.pg_connection_url)
            .await?;

        info!("running database migrations");
        guardpost_api::migrate(&pool).await?;

        let store = Arc::new(PgStore::new(pool));
        (store.clone() as Arc<dyn UserStore>, store as Arc<dyn DutyStore>)
    };

    let verifier = config.identity.build_verifier()?;
    let profiles = config.identity.build_profile_source()?;

    let state = guardpost_api::AppState::new(config.clone(), users, store, verifier, profiles);
    let app = guardpost_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
