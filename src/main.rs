// region:    --- Imports
use auction_listing::auction_store::{PostgresAuctionStore, SharedAuctionStore};
use auction_listing::config::Config;
use auction_listing::database::DatabaseManager;
use auction_listing::handlers::{self, AppState};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    let config = Config::from_env()?;

    let db_manager = Arc::new(DatabaseManager::new(&config.database).await?);

    if let Err(e) = db_manager.initialize_database(config.reset_database).await {
        error!("{:<12} --> database initialisation failed: {:?}", "Main", e);
        return Err(e.into());
    }
    info!("{:<12} --> database initialised", "Main");

    let store: SharedAuctionStore = Arc::new(PostgresAuctionStore::new(Arc::clone(&db_manager)));
    let state = AppState {
        store,
        policy: config.bid_policy(),
    };
    if state.policy.enforce_end_time {
        info!("{:<12} --> bids after end time are rejected", "Main");
    }

    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    if let Err(err) = axum::serve(listener, handlers::routes(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("{:<12} --> Server error: {}", "Main", err);
    }

    db_manager.pool().close().await;
    info!("{:<12} --> connection pool closed", "Main");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("{:<12} --> failed to listen for shutdown: {}", "Main", e);
    }
}
// endregion: --- Main
