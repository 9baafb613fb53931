use async_graphql::{InputObject, Json, SimpleObject};
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::jobs::status::derive_for;
use crate::jobs::{FailedRule, Job, JobFilter, JobStatus};

/// GraphQL view of a job row. `status` is derived here, under the
/// gateway's rule, so clients never derive it themselves.
#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "Job")]
pub struct JobNode {
    pub id: i64,
    pub status: JobStatus,
    pub queue_name: Option<String>,
    pub task_identifier: String,
    pub priority: i32,
    pub run_at: DateTime<Utc>,

    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub locked_at: Option<DateTime<Utc>>,
    pub locked_by: Option<String>,

    pub payload: Json<Value>,
}

impl JobNode {
    pub fn new(job: Job, rule: FailedRule) -> Self {
        let status = derive_for(&job, rule);
        Self {
            id: job.id,
            status,
            queue_name: job.queue_name,
            task_identifier: job.task_identifier,
            priority: job.priority,
            run_at: job.run_at,
            attempts: job.attempts,
            max_attempts: job.max_attempts,
            last_error: job.last_error,
            created_at: job.created_at,
            updated_at: job.updated_at,
            locked_at: job.locked_at,
            locked_by: job.locked_by,
            payload: Json(job.payload),
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
pub struct JobConnection {
    pub nodes: Vec<JobNode>,
    pub total_count: i64,
    pub has_next_page: bool,
}

#[derive(Debug, Clone, Default, InputObject)]
#[graphql(name = "JobFilter")]
pub struct JobFilterInput {
    pub search: Option<String>,
    pub status: Option<JobStatus>,
    pub task_identifier: Option<String>,
    pub queue_name: Option<String>,
}

impl From<JobFilterInput> for JobFilter {
    fn from(input: JobFilterInput) -> Self {
        JobFilter {
            search: input.search,
            status: input.status,
            task_identifier: input.task_identifier,
            queue_name: input.queue_name,
        }
        .normalized()
    }
}
