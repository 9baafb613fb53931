//! The one place job status is derived.
//!
//! Status is not stored in the job table; it is computed from the lock,
//! error and attempt columns. The gateway translates the same rules into SQL
//! predicates for server-side filtering and counting, and the console calls
//! [`derive`] when it needs a row's status locally. Keeping both in this
//! module is what guarantees they agree.

use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::jobs::model::{Job, JobStatus};

/// Which jobs count as "failed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailedRule {
    /// Any unlocked job carrying a last error.
    #[default]
    LastError,
    /// Only unlocked jobs with a last error and no attempts left; errored jobs
    /// that will still be retried are pending.
    AttemptsExhausted,
}

impl FailedRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailedRule::LastError => "last_error",
            FailedRule::AttemptsExhausted => "attempts_exhausted",
        }
    }
}

impl FromStr for FailedRule {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "last_error" => Ok(FailedRule::LastError),
            "attempts_exhausted" | "exhausted" => Ok(FailedRule::AttemptsExhausted),
            other => anyhow::bail!(
                "unknown failed rule {other:?} (expected last_error or attempts_exhausted)"
            ),
        }
    }
}

/// The columns status depends on, borrowed from whatever holds them.
#[derive(Debug, Clone, Copy)]
pub struct StatusFields<'a> {
    pub locked_at: Option<DateTime<Utc>>,
    pub last_error: Option<&'a str>,
    pub attempts: i32,
    pub max_attempts: i32,
}

impl<'a> From<&'a Job> for StatusFields<'a> {
    fn from(job: &'a Job) -> Self {
        Self {
            locked_at: job.locked_at,
            last_error: job.last_error.as_deref(),
            attempts: job.attempts,
            max_attempts: job.max_attempts,
        }
    }
}

pub fn derive(fields: StatusFields<'_>, rule: FailedRule) -> JobStatus {
    if fields.locked_at.is_some() {
        return JobStatus::Running;
    }

    match (fields.last_error, rule) {
        (Some(_), FailedRule::LastError) => JobStatus::Failed,
        (Some(_), FailedRule::AttemptsExhausted) if fields.attempts >= fields.max_attempts => {
            JobStatus::Failed
        }
        (Some(_), FailedRule::AttemptsExhausted) => JobStatus::Pending,
        (None, _) if fields.attempts > 0 => JobStatus::Completed,
        (None, _) => JobStatus::Pending,
    }
}

pub fn derive_for(job: &Job, rule: FailedRule) -> JobStatus {
    derive(StatusFields::from(job), rule)
}

/// SQL boolean expression selecting exactly the rows [`derive`] maps to
/// `status`. Column names are unqualified.
pub fn sql_predicate(status: JobStatus, rule: FailedRule) -> &'static str {
    match (status, rule) {
        (JobStatus::Running, _) => "(locked_at IS NOT NULL)",

        (JobStatus::Failed, FailedRule::LastError) => {
            "(locked_at IS NULL AND last_error IS NOT NULL)"
        }
        (JobStatus::Failed, FailedRule::AttemptsExhausted) => {
            "(locked_at IS NULL AND last_error IS NOT NULL AND attempts >= max_attempts)"
        }

        (JobStatus::Completed, _) => "(locked_at IS NULL AND last_error IS NULL AND attempts > 0)",

        (JobStatus::Pending, FailedRule::LastError) => {
            "(locked_at IS NULL AND last_error IS NULL AND attempts <= 0)"
        }
        (JobStatus::Pending, FailedRule::AttemptsExhausted) => {
            "(locked_at IS NULL AND ((last_error IS NULL AND attempts <= 0) \
             OR (last_error IS NOT NULL AND attempts < max_attempts)))"
        }
    }
}
