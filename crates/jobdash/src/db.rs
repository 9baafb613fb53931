use sqlx::{postgres::PgPoolOptions, Executor, PgPool};
use std::time::Duration;

use crate::config::validate_schema;

pub async fn make_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let max_connections = std::env::var("JOBDASH_DB_MAX_CONNECTIONS")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(5)
        .clamp(1, 32);

    let acquire_timeout_secs = std::env::var("JOBDASH_DB_ACQUIRE_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(10)
        .clamp(1, 60);

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(acquire_timeout_secs))
        .connect(database_url)
        .await?;

    tracing::debug!(max_connections, acquire_timeout_secs, "database pool ready");

    Ok(pool)
}

const JOB_STORE_SQL: &str = include_str!("../sql/job_store.sql");

/// Installs the development job store (table + procedures) into `schema`.
/// The production store is owned by the queue engine, so this only runs on
/// request. Every statement is idempotent.
pub async fn install_job_store(pool: &PgPool, schema: &str) -> anyhow::Result<()> {
    let schema = validate_schema(schema)?;
    let sql = JOB_STORE_SQL.replace("{schema}", &schema);

    let mut tx = pool.begin().await?;
    (&mut *tx).execute(sql.as_str()).await?;
    tx.commit().await?;

    tracing::info!(%schema, "job store installed");
    Ok(())
}
