use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use jemallocator::Jemalloc;
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use pairscan::{Engine, EthNode, EventStore, NodeClient, PostgresClient, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .unwrap();

    info!("pairscan {}", env!("CARGO_PKG_VERSION"));

    // Every setting has a compiled-in default; config.yaml is optional.
    let settings = Settings::new().context("Failed to load configuration")?;

    let db = PostgresClient::new(settings.postgres.clone())
        .await
        .context("Failed to initialize database connection")?;
    db.migrate().await.context("Failed to apply schema")?;

    let node = EthNode::connect(
        &settings.node.ws_url,
        Duration::from_secs(settings.node.rpc_timeout_secs),
    )
    .await
    .context("Failed to connect to the Ethereum node")?;

    let node: Arc<dyn NodeClient> = Arc::new(node);
    let store: Arc<dyn EventStore> = Arc::new(db);

    let engine =
        Engine::new(node, store, &settings.sync).context("Failed to initialize sync engine")?;

    let cancellation_token = CancellationToken::new();
    let engine_token = cancellation_token.child_token();
    let mut engine_handle = tokio::spawn(async move { engine.run(engine_token).await });

    #[cfg(unix)]
    let mut sigterm_stream = {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?
    };

    info!("Indexer running. Press Ctrl+C to stop.");

    #[cfg(unix)]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
            _ = sigterm_stream.recv() => {
                info!("Received SIGTERM, exiting gracefully...");
            },
            res = &mut engine_handle => {
                return finish(res);
            },
        };
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
            res = &mut engine_handle => {
                return finish(res);
            },
        };
    }

    info!("Waiting for the sync engine to stop...");
    cancellation_token.cancel();
    let _ = engine_handle.await;

    info!("Shutdown complete");
    Ok(())
}

/// The engine only returns on its own after a fatal error (or a panic);
/// either way the process must exit non-zero so the operator notices.
fn finish(
    res: Result<Result<(), pairscan::SyncError>, tokio::task::JoinError>,
) -> anyhow::Result<()> {
    match res {
        Ok(Ok(())) => anyhow::bail!("Sync engine stopped unexpectedly"),
        Ok(Err(e)) => Err(anyhow::Error::new(e).context("Sync engine failed")),
        Err(e) => Err(anyhow::Error::new(e).context("Sync engine panicked")),
    }
}
