//! Typed GraphQL-over-HTTP client for the gateway.
//!
//! A [`GatewayClient`] is built once by the process that needs it and passed
//! to every view explicitly.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::jobs::{JobAction, JobFilter, JobOrder, Page, StatusCounts};

pub mod poller;
pub mod queries;

pub use poller::Poller;
pub use queries::{DashboardData, JobPage, JobView};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Could not reach the gateway or the connection broke mid-request.
    #[error("gateway unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// The gateway answered with a non-GraphQL error status.
    #[error("gateway returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected gateway response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Transport-level problems get the persistent banner; everything else
    /// is shown inline.
    pub fn is_connectivity(&self) -> bool {
        match self {
            ClientError::Transport(_) => true,
            ClientError::Status { status, .. } => *status >= 500,
            ClientError::Decode(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GraphqlError {
    pub message: String,
    #[serde(default)]
    pub path: Vec<serde_json::Value>,
}

/// GraphQL result: whatever data resolved plus any field errors.
#[derive(Debug, Clone)]
pub struct Response<T> {
    pub data: Option<T>,
    pub errors: Vec<GraphqlError>,
}

impl<T> Response<T> {
    pub fn error_summary(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        Some(
            self.errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Response<U> {
        Response {
            data: self.data.map(f),
            errors: self.errors,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Serialize)]
struct RawRequest<'a, V> {
    query: &'a str,
    variables: V,
}

#[derive(Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    endpoint: String,
}

impl GatewayClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self::with_http(http, endpoint))
    }

    pub fn with_http(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn execute<V, T>(&self, query: &str, variables: V) -> Result<Response<T>, ClientError>
    where
        V: Serialize,
        T: DeserializeOwned,
    {
        let res = self
            .http
            .post(&self.endpoint)
            .json(&RawRequest { query, variables })
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        match serde_json::from_str::<RawResponse<T>>(&body) {
            Ok(raw) => {
                if raw.data.is_none() && raw.errors.is_empty() {
                    return Err(ClientError::Decode("response has neither data nor errors".into()));
                }
                Ok(Response {
                    data: raw.data,
                    errors: raw.errors,
                })
            }
            Err(_) if !status.is_success() => Err(ClientError::Status {
                status: status.as_u16(),
                body: truncate(&body, 200),
            }),
            Err(e) => Err(ClientError::Decode(e.to_string())),
        }
    }

    // ----------------------------
    // Queries
    // ----------------------------

    pub async fn dashboard(&self, failed_limit: i64) -> Result<Response<DashboardData>, ClientError> {
        self.execute(
            &queries::dashboard_query(),
            queries::DashboardVars { failed_limit },
        )
        .await
    }

    pub async fn jobs(
        &self,
        filter: &JobFilter,
        order_by: JobOrder,
        page: Page,
    ) -> Result<Response<JobPage>, ClientError> {
        let res: Response<queries::JobsData> = self
            .execute(
                &queries::jobs_query(),
                queries::JobsVars {
                    filter: filter.clone(),
                    order_by,
                    first: page.first,
                    offset: page.offset,
                },
            )
            .await?;
        Ok(flatten(res, |d| d.jobs))
    }

    pub async fn job(&self, id: i64) -> Result<Response<Option<JobView>>, ClientError> {
        let res: Response<queries::JobData> = self
            .execute(&queries::job_query(), queries::JobVars { id })
            .await?;
        Ok(res.map(|d| d.job))
    }

    pub async fn status_counts(
        &self,
        filter: &JobFilter,
    ) -> Result<Response<StatusCounts>, ClientError> {
        let res: Response<queries::StatusCountsData> = self
            .execute(
                queries::STATUS_COUNTS_QUERY,
                queries::FilterVars {
                    filter: filter.clone(),
                },
            )
            .await?;
        Ok(flatten(res, |d| d.job_status_counts))
    }

    /// Cheap round trip used for connectivity checks.
    pub async fn ping(&self) -> Result<(), ClientError> {
        let res: Response<queries::PingData> = self
            .execute(queries::PING_QUERY, serde_json::json!({}))
            .await?;
        match res.data {
            Some(_) => Ok(()),
            None => Err(ClientError::Decode(
                res.error_summary().unwrap_or_else(|| "empty ping".into()),
            )),
        }
    }

    // ----------------------------
    // Actions
    // ----------------------------

    /// `Ok(false)` is the gateway saying the action did not apply; the
    /// reason is only in the gateway's log.
    pub async fn run_action(&self, action: JobAction, job_id: i64) -> Result<bool, ClientError> {
        let mutation = match action {
            JobAction::Retry => queries::RETRY_MUTATION,
            JobAction::Cancel => queries::CANCEL_MUTATION,
            JobAction::Complete => queries::COMPLETE_MUTATION,
        };
        let res: Response<queries::ActionData> = self
            .execute(mutation, queries::ActionVars { job_id })
            .await?;
        Ok(res.data.map(|d| d.ok).unwrap_or(false))
    }

    pub async fn retry_job(&self, job_id: i64) -> Result<bool, ClientError> {
        self.run_action(JobAction::Retry, job_id).await
    }

    pub async fn cancel_job(&self, job_id: i64) -> Result<bool, ClientError> {
        self.run_action(JobAction::Cancel, job_id).await
    }

    pub async fn complete_job(&self, job_id: i64) -> Result<bool, ClientError> {
        self.run_action(JobAction::Complete, job_id).await
    }
}

fn flatten<T, U>(res: Response<T>, f: impl FnOnce(T) -> Option<U>) -> Response<U> {
    Response {
        data: res.data.and_then(f),
        errors: res.errors,
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}
