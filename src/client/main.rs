/**
 * Attendance Agent Entry Point
 *
 * Headless sync agent: opens the local store, watches reachability of the
 * attendance service and drains the offline queue whenever it is reachable.
 */

#[cfg(feature = "agent")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use attendance_sync::client::sync::spawn_reachability_probe;
    use attendance_sync::client::{AppContext, Config, HttpRemote, RemoteService};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    let config = Config::load()?;
    tracing::info!(
        server = config.server_url(),
        database = %config.database_path().display(),
        "starting attendance agent"
    );

    let remote: Arc<dyn RemoteService> = Arc::new(HttpRemote::new(config.clone())?);
    let online = remote.probe().await;
    let context = AppContext::open(config.clone(), Arc::clone(&remote), online).await?;

    let shutdown = CancellationToken::new();
    let probe = spawn_reachability_probe(
        Arc::clone(context.monitor()),
        remote,
        config.probe_interval(),
        shutdown.clone(),
    );

    let mut sync_service = context.sync_service();
    sync_service.start()?;

    let status = sync_service.status().await;
    tracing::info!(
        online = status.is_online(),
        pending = status.pending,
        rejected = status.rejected,
        "agent running, press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");

    shutdown.cancel();
    sync_service.stop().await;
    probe.await?;

    let status = sync_service.status().await;
    tracing::info!(
        pending = status.pending,
        degraded = status.degraded,
        last_sync = ?status.last_sync,
        "agent stopped"
    );

    context.database().close().await;
    Ok(())
}

#[cfg(not(feature = "agent"))]
fn main() {
    eprintln!("The agent requires the 'agent' feature to be enabled.");
    eprintln!("Run with: cargo run --bin attendance-agent --features agent");
    std::process::exit(1);
}
