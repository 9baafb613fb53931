use jobdash::client::{GatewayClient, Poller};
use jobdash::config::ConsoleConfig;
use jobdash::console::{self, connectivity, ConsoleState, ViewSettings};
use jobdash::logging;

use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let cfg = ConsoleConfig::from_env()?;

    tracing::info!(
        listen = %cfg.listen_addr,
        api_url = %cfg.api_url,
        ws_url = %cfg.ws_url,
        page_size = cfg.page_size,
        "jobdash console starting"
    );

    let client = GatewayClient::new(cfg.api_url.clone())?;
    let state = ConsoleState::new(client.clone(), ViewSettings::from(&cfg));

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(error) = tokio::signal::ctrl_c().await {
                tracing::warn!(%error, "ctrl-c handler failed");
            }
            cancel.cancel();
        });
    }

    let monitor = tokio::spawn(connectivity::monitor(
        client,
        state.connectivity.clone(),
        Poller::every(cfg.health_interval),
        cancel.clone(),
    ));

    let app = console::router(state);
    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr).await?;
    tracing::info!("console on http://{}", cfg.listen_addr);

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    cancel.cancel();
    monitor.await?;
    tracing::info!("console stopped");
    Ok(())
}
