use std::env;
use std::time::Duration;

use jobdash::client::{GatewayClient, Poller};
use jobdash::config::validate_schema;
use jobdash::db;
use jobdash::jobs::status::derive_for;
use jobdash::jobs::{FailedRule, JobFilter, JobsRepo, StatusCounts};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

const USAGE: &str = "jobdashctl <command>\n\
Commands:\n\
- migrate            install the development job store\n\
- reset              delete every job in the store\n\
- seed <n>           insert n jobs spread across all statuses\n\
- counts             server-side counts next to a full-scan tally\n\
- show <job_id>      print one job with its derived status\n\
- watch              poll the gateway and print counts (JOBDASH_API_URL)\n\
\n\
Uses DATABASE_URL or TEST_DATABASE_URL, JOBDASH_SCHEMA and JOBDASH_FAILED_RULE.\n";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args: Vec<String> = env::args().collect();

    let Some(command) = args.get(1) else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };

    let rule: FailedRule = match env::var("JOBDASH_FAILED_RULE") {
        Ok(raw) => raw.parse()?,
        Err(_) => FailedRule::default(),
    };

    if command == "watch" {
        return watch().await;
    }

    let url = env::var("DATABASE_URL")
        .or_else(|_| env::var("TEST_DATABASE_URL"))
        .map_err(|_| anyhow::anyhow!("DATABASE_URL or TEST_DATABASE_URL must be set"))?;
    let schema = validate_schema(&env::var("JOBDASH_SCHEMA").unwrap_or_else(|_| "job_store".into()))?;
    let pool = db::make_pool(&url).await?;

    match command.as_str() {
        "migrate" => {
            db::install_job_store(&pool, &schema).await?;
            println!("migrate OK");
        }
        "reset" => reset(&pool, &schema).await?,
        "seed" => {
            let n: i64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(20);
            seed(&pool, &schema, n).await?;
        }
        "counts" => {
            let repo = JobsRepo::new(pool.clone(), &schema, rule);
            show_counts(&repo).await?;
        }
        "show" => {
            let id: i64 = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("usage: jobdashctl show <job_id>"))?
                .parse()?;
            let repo = JobsRepo::new(pool.clone(), &schema, rule);
            match repo.get_job(id).await? {
                Some(job) => {
                    println!("status: {}", derive_for(&job, rule));
                    println!("{}", serde_json::to_string_pretty(&job)?);
                }
                None => {
                    eprintln!("job {id} not found");
                    std::process::exit(1);
                }
            }
        }
        other => {
            eprintln!("Unknown command: {other}\n\n{USAGE}");
            std::process::exit(2);
        }
    }

    Ok(())
}

async fn reset(pool: &PgPool, schema: &str) -> anyhow::Result<()> {
    sqlx::query(&format!("TRUNCATE TABLE {schema}.jobs RESTART IDENTITY"))
        .execute(pool)
        .await?;
    println!("reset OK");
    Ok(())
}

/// Rows cycle through pending, completed, failed and running.
async fn seed(pool: &PgPool, schema: &str, n: i64) -> anyhow::Result<()> {
    let sql = format!(
        r#"
        INSERT INTO {schema}.jobs (
            queue_name, task_identifier, payload, priority, run_at,
            attempts, max_attempts, last_error, locked_at, locked_by
        )
        SELECT
            CASE WHEN i % 5 = 0 THEN NULL
                 ELSE (ARRAY['default', 'emails', 'reports'])[1 + i % 3] END,
            (ARRAY['send_email', 'generate_report', 'sync_account', 'resize_image'])[1 + i % 4],
            json_build_object('n', i, 'seeded', true),
            (i % 3)::int,
            now() - make_interval(secs => i),
            CASE i % 4 WHEN 0 THEN 0 WHEN 2 THEN 3 ELSE 1 END,
            3,
            CASE WHEN i % 4 = 2 THEN 'boom: simulated failure #' || i END,
            CASE WHEN i % 4 = 3 THEN now() END,
            CASE WHEN i % 4 = 3 THEN 'worker-' || (i % 2) END
        FROM generate_series(1, $1::int) AS s(i)
        "#
    );

    let res = sqlx::query(&sql).bind(n).execute(pool).await?;
    println!("seeded {} jobs", res.rows_affected());
    Ok(())
}

async fn show_counts(repo: &JobsRepo) -> anyhow::Result<()> {
    let filter = JobFilter::default();
    let server = repo.status_counts(&filter).await?;
    let jobs = repo.scan(&filter, 500).await?;
    let scanned = StatusCounts::tally(&jobs, repo.rule());

    println!("rule: {}", repo.rule().as_str());
    println!("{:<10} {:>10} {:>10}", "", "aggregate", "scan");
    print_row("total", server.total, scanned.total);
    print_row("running", server.running, scanned.running);
    print_row("failed", server.failed, scanned.failed);
    print_row("completed", server.completed, scanned.completed);
    print_row("pending", server.pending, scanned.pending);

    if server != scanned {
        eprintln!("aggregate and scan disagree (jobs changed while counting?)");
        std::process::exit(1);
    }
    Ok(())
}

fn print_row(label: &str, a: i64, b: i64) {
    println!("{label:<10} {a:>10} {b:>10}");
}

async fn watch() -> anyhow::Result<()> {
    let api_url = env::var("JOBDASH_API_URL").unwrap_or_else(|_| "http://localhost:5678/graphql".into());
    let client = GatewayClient::new(api_url)?;
    let interval = env::var("JOBDASH_WATCH_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            cancel.cancel();
        });
    }

    Poller::every(Duration::from_secs(interval))
        .run(cancel, || {
            let client = client.clone();
            async move {
                match client.status_counts(&JobFilter::default()).await {
                    Ok(res) => {
                        if let Some(c) = &res.data {
                            println!(
                                "{} total={} running={} failed={} completed={} pending={}",
                                chrono::Utc::now().format("%H:%M:%S"),
                                c.total,
                                c.running,
                                c.failed,
                                c.completed,
                                c.pending
                            );
                        }
                        if let Some(err) = res.error_summary() {
                            eprintln!("query error: {err}");
                        }
                        true
                    }
                    Err(e) => {
                        eprintln!("gateway unreachable: {e}");
                        false
                    }
                }
            }
        })
        .await;

    Ok(())
}
