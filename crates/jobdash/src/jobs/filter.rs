use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};

use crate::jobs::model::JobStatus;
use crate::jobs::status::{sql_predicate, FailedRule};

pub const MAX_PAGE_SIZE: i64 = 500;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobFilter {
    pub search: Option<String>,
    pub status: Option<JobStatus>,
    pub task_identifier: Option<String>,
    pub queue_name: Option<String>,
}

impl JobFilter {
    pub fn with_status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Blank strings mean "no filter".
    pub fn normalized(self) -> Self {
        Self {
            search: non_blank(self.search),
            status: self.status,
            task_identifier: non_blank(self.task_identifier),
            queue_name: non_blank(self.queue_name),
        }
    }

    /// Appends ` WHERE ...` (or nothing) for this filter.
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>, rule: FailedRule) {
        let mut first = true;

        if let Some(status) = self.status {
            push_sep(qb, &mut first);
            qb.push(sql_predicate(status, rule));
        }

        if let Some(task) = self.task_identifier.as_deref() {
            push_sep(qb, &mut first);
            qb.push("task_identifier = ").push_bind(task.to_string());
        }

        if let Some(queue) = self.queue_name.as_deref() {
            push_sep(qb, &mut first);
            qb.push("queue_name = ").push_bind(queue.to_string());
        }

        if let Some(search) = self.search.as_deref() {
            push_sep(qb, &mut first);
            let pattern = format!("%{}%", escape_like(search));
            qb.push("(task_identifier ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR coalesce(queue_name, '') ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR coalesce(last_error, '') ILIKE ")
                .push_bind(pattern);
            if let Ok(id) = search.trim().parse::<i64>() {
                qb.push(" OR id = ").push_bind(id);
            }
            qb.push(")");
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, async_graphql::Enum,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobOrder {
    #[default]
    UpdatedAtDesc,
    CreatedAtDesc,
    RunAtAsc,
    PriorityAsc,
    IdAsc,
    IdDesc,
}

impl JobOrder {
    /// Every ordering ends on `id` so offset pages never overlap.
    pub fn sql(&self) -> &'static str {
        match self {
            JobOrder::UpdatedAtDesc => "updated_at DESC, id DESC",
            JobOrder::CreatedAtDesc => "created_at DESC, id DESC",
            JobOrder::RunAtAsc => "run_at ASC, id ASC",
            JobOrder::PriorityAsc => "priority ASC, run_at ASC, id ASC",
            JobOrder::IdAsc => "id ASC",
            JobOrder::IdDesc => "id DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub first: i64,
    pub offset: i64,
}

impl Page {
    pub fn new(first: i64, offset: i64) -> Self {
        Self {
            first: first.clamp(1, MAX_PAGE_SIZE),
            offset: offset.max(0),
        }
    }

    /// Zero-based page `n` of size `size`.
    pub fn nth(n: i64, size: i64) -> Self {
        let size = size.clamp(1, MAX_PAGE_SIZE);
        Self::new(size, n.max(0).saturating_mul(size))
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(25, 0)
    }
}

fn push_sep(qb: &mut QueryBuilder<'_, Postgres>, first: &mut bool) {
    qb.push(if *first { " WHERE " } else { " AND " });
    *first = false;
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
