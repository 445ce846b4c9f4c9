use std::sync::Arc;
use std::time::Duration;

use block_feed::aggregator::BlockAggregator;
use block_feed::config::FeedConfig;
use block_feed::ingestion::StreamIngestor;
use block_feed::metrics::FeedMetrics;
use block_feed::publish::SnapshotPublisher;
use block_feed::server::{self, AppState};
use block_feed::supervisor::FeedSupervisor;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Grace period for the feed and server to wind down after Ctrl-C.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = FeedConfig::from_env()?;
    tracing::info!(
        feed_url = %config.feed_url,
        history_capacity = config.history_capacity,
        reconnect = config.reconnect.is_some(),
        version = block_feed::SERVICE_VERSION,
        "Starting Block Feed service"
    );

    let metrics = Arc::new(FeedMetrics::new());
    let publisher = SnapshotPublisher::new(BlockAggregator::new(config.history_capacity), metrics.clone());
    let state = AppState::new(publisher.subscribe(), metrics.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let ingestor = StreamIngestor::new(config.feed_url.clone(), publisher, metrics.clone());
    let supervisor = FeedSupervisor::new(ingestor, config.reconnect, metrics.clone());
    let feed = tokio::spawn(supervisor.run(shutdown_rx.clone()));

    let listener = TcpListener::bind(config.listen_addr).await?;
    let display = tokio::spawn(server::serve(listener, state, shutdown_rx));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    shutdown_tx.send_replace(true);

    // A connect in progress is not interruptible; don't wait on it forever
    match tokio::time::timeout(SHUTDOWN_GRACE, feed).await {
        Ok(Ok(publisher)) => tracing::info!(
            blocks_completed = publisher.aggregator().blocks_completed(),
            "Feed stopped"
        ),
        Ok(Err(e)) => tracing::error!(error = %e, "Feed task failed"),
        Err(_) => tracing::warn!("Feed did not stop in time"),
    }
    tokio::time::timeout(SHUTDOWN_GRACE, display).await???;

    tracing::info!(metrics = ?metrics.export(), "Block Feed service stopped");
    Ok(())
}
