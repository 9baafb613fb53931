use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::jobs::counts::{CountBucket, StatusCounts};
use crate::jobs::filter::{JobFilter, JobOrder, Page};
use crate::jobs::model::{Job, JobStatus};
use crate::jobs::status::{sql_predicate, FailedRule};

const JOB_COLUMNS: &str = r#"
    id, queue_name, task_identifier, priority, run_at,
    attempts, max_attempts, last_error,
    created_at, updated_at,
    locked_at, locked_by,
    payload::jsonb AS payload
"#;

/// Read side of the external job table.
#[derive(Clone)]
pub struct JobsRepo {
    pool: PgPool,
    table: String,
    rule: FailedRule,
}

impl JobsRepo {
    /// `schema` must already be validated (see `config::validate_schema`).
    pub fn new(pool: PgPool, schema: &str, rule: FailedRule) -> Self {
        Self {
            pool,
            table: format!("{schema}.jobs"),
            rule,
        }
    }

    pub fn rule(&self) -> FailedRule {
        self.rule
    }

    // ----------------------------
    // Single job
    // ----------------------------

    pub async fn get_job(&self, job_id: i64) -> anyhow::Result<Option<Job>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM {} WHERE id = $1", self.table);
        let job = sqlx::query_as::<_, Job>(&sql)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }

    // ----------------------------
    // Lists
    // ----------------------------

    /// Offset-paginated, filtered list. Orderings are total (id tiebreaker),
    /// so consecutive pages partition the filtered set.
    pub async fn list_jobs(
        &self,
        filter: &JobFilter,
        order: JobOrder,
        page: Page,
    ) -> anyhow::Result<Vec<Job>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {JOB_COLUMNS} FROM {}",
            self.table
        ));
        filter.push_where(&mut qb, self.rule);
        qb.push(" ORDER BY ").push(order.sql());
        qb.push(" LIMIT ").push_bind(page.first);
        qb.push(" OFFSET ").push_bind(page.offset);

        let rows = qb.build_query_as::<Job>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    pub async fn count_jobs(&self, filter: &JobFilter) -> anyhow::Result<i64> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {}", self.table));
        filter.push_where(&mut qb, self.rule);

        let n: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(n)
    }

    /// Most recently updated failed jobs, newest first.
    pub async fn recent_failed(&self, limit: i64) -> anyhow::Result<Vec<Job>> {
        self.list_jobs(
            &JobFilter::with_status(JobStatus::Failed),
            JobOrder::UpdatedAtDesc,
            Page::new(limit, 0),
        )
        .await
    }

    /// Every job matching `filter`, read page by page in id order.
    pub async fn scan(&self, filter: &JobFilter, batch: i64) -> anyhow::Result<Vec<Job>> {
        let mut out = Vec::new();
        let mut n = 0;
        loop {
            let page = Page::nth(n, batch);
            let rows = self.list_jobs(filter, JobOrder::IdAsc, page).await?;
            let done = (rows.len() as i64) < page.first;
            out.extend(rows);
            if done {
                break;
            }
            n += 1;
        }
        Ok(out)
    }

    // ----------------------------
    // Aggregates
    // ----------------------------

    pub async fn status_counts(&self, filter: &JobFilter) -> anyhow::Result<StatusCounts> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*)");
        for status in [JobStatus::Running, JobStatus::Failed, JobStatus::Completed] {
            qb.push(", COUNT(*) FILTER (WHERE ")
                .push(sql_predicate(status, self.rule))
                .push(")");
        }
        qb.push(format!(" FROM {}", self.table));
        filter.push_where(&mut qb, self.rule);

        let (total, running, failed, completed): (i64, i64, i64, i64) =
            qb.build_query_as().fetch_one(&self.pool).await?;

        Ok(StatusCounts::from_buckets(total, running, failed, completed))
    }

    pub async fn counts_by_task(&self, filter: &JobFilter) -> anyhow::Result<Vec<CountBucket>> {
        self.grouped_counts("task_identifier", filter).await
    }

    pub async fn counts_by_queue(&self, filter: &JobFilter) -> anyhow::Result<Vec<CountBucket>> {
        self.grouped_counts("queue_name", filter).await
    }

    async fn grouped_counts(
        &self,
        column: &'static str,
        filter: &JobFilter,
    ) -> anyhow::Result<Vec<CountBucket>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {column}::text AS key, COUNT(*) AS count FROM {}",
            self.table
        ));
        filter.push_where(&mut qb, self.rule);
        qb.push(" GROUP BY 1 ORDER BY count DESC, key ASC NULLS LAST");

        let rows = qb
            .build_query_as::<CountBucket>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
