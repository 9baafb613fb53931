use serde::{Deserialize, Serialize};

use crate::jobs::{CountBucket, Job, JobFilter, JobOrder, JobStatus, StatusCounts};

const JOB_FIELDS: &str = r#"
fragment JobFields on Job {
  id status queueName taskIdentifier priority runAt
  attempts maxAttempts lastError
  createdAt updatedAt lockedAt lockedBy
  payload
}
"#;

pub fn dashboard_query() -> String {
    format!(
        r#"
query Dashboard($failedLimit: Int!) {{
  jobStatusCounts {{ total running failed completed pending }}
  jobCountsByTask {{ key count }}
  jobCountsByQueue {{ key count }}
  failed: jobs(filter: {{ status: FAILED }}, orderBy: UPDATED_AT_DESC, first: $failedLimit) {{
    nodes {{ ...JobFields }}
    totalCount
    hasNextPage
  }}
}}
{JOB_FIELDS}"#
    )
}

pub fn jobs_query() -> String {
    format!(
        r#"
query Jobs($filter: JobFilter, $orderBy: JobOrder!, $first: Int!, $offset: Int!) {{
  jobs(filter: $filter, orderBy: $orderBy, first: $first, offset: $offset) {{
    nodes {{ ...JobFields }}
    totalCount
    hasNextPage
  }}
}}
{JOB_FIELDS}"#
    )
}

pub fn job_query() -> String {
    format!(
        r#"
query Job($id: Int!) {{
  job(id: $id) {{ ...JobFields }}
}}
{JOB_FIELDS}"#
    )
}

pub const STATUS_COUNTS_QUERY: &str = r#"
query StatusCounts($filter: JobFilter) {
  jobStatusCounts(filter: $filter) { total running failed completed pending }
}
"#;

pub const RETRY_MUTATION: &str = "mutation Retry($jobId: Int!) { ok: retryJob(jobId: $jobId) }";
pub const CANCEL_MUTATION: &str = "mutation Cancel($jobId: Int!) { ok: cancelJob(jobId: $jobId) }";
pub const COMPLETE_MUTATION: &str =
    "mutation Complete($jobId: Int!) { ok: completeJob(jobId: $jobId) }";

pub const PING_QUERY: &str = "{ __typename }";

// ----------------------------
// Variables
// ----------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardVars {
    pub failed_limit: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobsVars {
    pub filter: JobFilter,
    pub order_by: JobOrder,
    pub first: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct JobVars {
    pub id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterVars {
    pub filter: JobFilter,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionVars {
    pub job_id: i64,
}

// ----------------------------
// Data
// ----------------------------

/// A job row as the gateway reports it, with the status the gateway
/// derived under its own failure rule.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobView {
    #[serde(flatten)]
    pub job: Job,
    pub status: JobStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPage {
    pub nodes: Vec<JobView>,
    pub total_count: i64,
    pub has_next_page: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub job_status_counts: Option<StatusCounts>,
    pub job_counts_by_task: Option<Vec<CountBucket>>,
    pub job_counts_by_queue: Option<Vec<CountBucket>>,
    pub failed: Option<JobPage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobsData {
    pub jobs: Option<JobPage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobData {
    pub job: Option<JobView>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCountsData {
    pub job_status_counts: Option<StatusCounts>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionData {
    pub ok: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PingData {
    #[serde(rename = "__typename")]
    pub typename: String,
}
