//! Poolbank API Server
//!
//! Main entry point for the pool ledger service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use poolbank_api::{AppState, create_router};
use poolbank_core::ledger::{AccountNumberGenerator, LedgerStore, Provisioner};
use poolbank_db::{PgLedgerStore, connect_with};
use poolbank_shared::{AppConfig, JwtConfig, JwtService};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "poolbank=debug,tower_http=debug".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = connect_with(&config.database).await?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    let store = PgLedgerStore::new(db);
    let pool = store
        .initialize_pool(
            config.ledger.initial_pool_total,
            config.ledger.initial_reserve,
        )
        .await?;
    info!(
        total = %pool.total_amount,
        reserve = %pool.reserve_amount,
        "Bank pool ready"
    );

    let jwt_service = JwtService::new(JwtConfig::from(&config.jwt));

    let provisioner = Provisioner::new(
        AccountNumberGenerator::new(config.ledger.account_prefix.clone()),
        config.ledger.provisioning_attempts,
    );

    let state = AppState {
        store: Arc::new(store),
        jwt_service: Arc::new(jwt_service),
        provisioner: Arc::new(provisioner),
        recent_limit: config.ledger.recent_limit,
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
