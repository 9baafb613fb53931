use jobdash::api;
use jobdash::config::GatewayConfig;
use jobdash::db;
use jobdash::jobs::{ActionsRepo, JobsRepo};
use jobdash::logging;

use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let cfg = GatewayConfig::from_env()?;

    tracing::info!(
        listen = %cfg.listen_addr(),
        schema = %cfg.schema,
        allowed_origin = %cfg.allowed_origin,
        failed_rule = cfg.failed_rule.as_str(),
        migrate_on_startup = cfg.migrate_on_startup,
        "jobdash gateway starting"
    );

    let pool = db::make_pool(&cfg.database_url).await?;
    if cfg.migrate_on_startup {
        db::install_job_store(&pool, &cfg.schema).await?;
    }

    let jobs = JobsRepo::new(pool.clone(), &cfg.schema, cfg.failed_rule);
    let actions = ActionsRepo::new(pool.clone(), &cfg.schema);
    let schema = api::build_schema(jobs, actions);
    let app = api::router(schema, &cfg.allowed_origin)?;

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

    let listener = tokio::net::TcpListener::bind(cfg.listen_addr()).await?;
    tracing::info!("graphql endpoint on http://{}/graphql", cfg.listen_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    pool.close().await;
    tracing::info!("gateway stopped");
    Ok(())
}
