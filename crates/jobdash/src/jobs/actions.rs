use sqlx::PgPool;

use crate::jobs::model::JobStatus;

pub const CANCEL_REASON: &str = "Manually cancelled from the dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobAction {
    Retry,
    Cancel,
    Complete,
}

impl JobAction {
    pub const ALL: [JobAction; 3] = [JobAction::Retry, JobAction::Cancel, JobAction::Complete];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobAction::Retry => "retry",
            JobAction::Cancel => "cancel",
            JobAction::Complete => "complete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "retry" => Some(JobAction::Retry),
            "cancel" => Some(JobAction::Cancel),
            "complete" => Some(JobAction::Complete),
            _ => None,
        }
    }

    /// Actions offered for a job in the given status.
    pub fn allowed_for(status: JobStatus) -> &'static [JobAction] {
        match status {
            JobStatus::Failed => &[JobAction::Retry],
            JobStatus::Pending => &[JobAction::Complete, JobAction::Cancel],
            JobStatus::Running => &[JobAction::Cancel],
            JobStatus::Completed => &[],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobAction::Retry => "Retry",
            JobAction::Cancel => "Cancel",
            JobAction::Complete => "Complete",
        }
    }

    /// Cancel and complete are irreversible from the dashboard.
    pub fn needs_confirmation(&self) -> bool {
        matches!(self, JobAction::Cancel | JobAction::Complete)
    }
}

/// Administrative writes. Each one is a single call into a procedure the job
/// store owns; the dashboard never updates job rows directly.
#[derive(Clone)]
pub struct ActionsRepo {
    pool: PgPool,
    schema: String,
}

impl ActionsRepo {
    pub fn new(pool: PgPool, schema: &str) -> Self {
        Self {
            pool,
            schema: schema.to_string(),
        }
    }

    /// Rows touched by the procedure; 0 means the store refused or the job
    /// does not exist.
    pub async fn run(&self, action: JobAction, job_id: i64) -> anyhow::Result<u64> {
        match action {
            JobAction::Retry => self.retry(job_id).await,
            JobAction::Cancel => self.cancel(job_id).await,
            JobAction::Complete => self.complete(job_id).await,
        }
    }

    /// Clears the failure and makes the job runnable now with a fresh
    /// attempt budget.
    pub async fn retry(&self, job_id: i64) -> anyhow::Result<u64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {}.reschedule_jobs(ARRAY[$1]::bigint[], run_at => now(), attempts => 0)",
            self.schema
        );
        self.count_rows(&sql, job_id, None).await
    }

    pub async fn cancel(&self, job_id: i64) -> anyhow::Result<u64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {}.permanently_fail_jobs(ARRAY[$1]::bigint[], $2)",
            self.schema
        );
        self.count_rows(&sql, job_id, Some(CANCEL_REASON)).await
    }

    pub async fn complete(&self, job_id: i64) -> anyhow::Result<u64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {}.complete_jobs(ARRAY[$1]::bigint[])",
            self.schema
        );
        self.count_rows(&sql, job_id, None).await
    }

    async fn count_rows(&self, sql: &str, job_id: i64, reason: Option<&str>) -> anyhow::Result<u64> {
        let mut q = sqlx::query_scalar::<_, i64>(sql).bind(job_id);
        if let Some(reason) = reason {
            q = q.bind(reason);
        }
        let n = q.fetch_one(&self.pool).await?;
        Ok(n.max(0) as u64)
    }
}
