use serde::{Deserialize, Serialize};

use crate::jobs::model::{Job, JobStatus};
use crate::jobs::status::{derive_for, FailedRule};

/// Per-status totals. `pending` is whatever the three stored buckets leave
/// over, so the four always sum to `total`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, async_graphql::SimpleObject,
)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub total: i64,
    pub running: i64,
    pub failed: i64,
    pub completed: i64,
    pub pending: i64,
}

impl StatusCounts {
    pub fn from_buckets(total: i64, running: i64, failed: i64, completed: i64) -> Self {
        Self {
            total,
            running,
            failed,
            completed,
            pending: (total - running - failed - completed).max(0),
        }
    }

    pub fn get(&self, status: JobStatus) -> i64 {
        match status {
            JobStatus::Pending => self.pending,
            JobStatus::Running => self.running,
            JobStatus::Failed => self.failed,
            JobStatus::Completed => self.completed,
        }
    }

    /// Full-scan alternative to the server-side aggregate.
    pub fn tally<'a>(jobs: impl IntoIterator<Item = &'a Job>, rule: FailedRule) -> Self {
        let mut out = Self::default();
        for job in jobs {
            out.total += 1;
            match derive_for(job, rule) {
                JobStatus::Pending => out.pending += 1,
                JobStatus::Running => out.running += 1,
                JobStatus::Failed => out.failed += 1,
                JobStatus::Completed => out.completed += 1,
            }
        }
        out
    }
}

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, async_graphql::SimpleObject,
)]
pub struct CountBucket {
    /// `None` for jobs outside any named queue.
    pub key: Option<String>,
    pub count: i64,
}
