use crate::client::{DashboardData, JobView, Response};
use crate::jobs::{CountBucket, JobStatus, StatusCounts};

pub const RECENT_FAILED_LIMIT: i64 = 10;
const HISTOGRAM_ROWS: usize = 12;

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    /// Filter value for drill-through; `None` for rows that cannot be
    /// filtered on (no queue, the folded remainder).
    pub key: Option<String>,
    pub label: String,
    pub count: i64,
    /// Width relative to the largest bar, 0..=100.
    pub width_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusSlice {
    pub status: JobStatus,
    pub count: i64,
    /// Share of all jobs, 0..=100.
    pub share_pct: f64,
}

#[derive(Debug, Clone, Default)]
pub struct DashboardView {
    pub counts: Option<StatusCounts>,
    pub by_task: Vec<Bar>,
    pub by_queue: Vec<Bar>,
    pub recent_failed: Vec<JobView>,
    pub failed_total: i64,
    pub error: Option<String>,
}

impl DashboardView {
    pub fn from_response(res: Response<DashboardData>) -> Self {
        let error = res.error_summary();
        let data = res.data.unwrap_or_default();
        let (recent_failed, failed_total) = match data.failed {
            Some(page) => (page.nodes, page.total_count),
            None => (Vec::new(), 0),
        };

        Self {
            counts: data.job_status_counts,
            by_task: histogram(data.job_counts_by_task.as_deref().unwrap_or(&[]), "(none)"),
            by_queue: histogram(
                data.job_counts_by_queue.as_deref().unwrap_or(&[]),
                "(no queue)",
            ),
            recent_failed,
            failed_total,
            error,
        }
    }

    pub fn distribution(&self) -> Vec<StatusSlice> {
        self.counts.map(|c| distribution(&c)).unwrap_or_default()
    }
}

pub fn distribution(counts: &StatusCounts) -> Vec<StatusSlice> {
    JobStatus::ALL
        .iter()
        .map(|&status| {
            let count = counts.get(status);
            let share_pct = if counts.total > 0 {
                (count as f64) * 100.0 / (counts.total as f64)
            } else {
                0.0
            };
            StatusSlice {
                status,
                count,
                share_pct,
            }
        })
        .collect()
}

/// Largest buckets first; anything past the row limit is folded into
/// "other".
pub fn histogram(buckets: &[CountBucket], null_label: &str) -> Vec<Bar> {
    let mut sorted: Vec<&CountBucket> = buckets.iter().collect();
    sorted.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));

    let mut rows: Vec<(Option<String>, String, i64)> = sorted
        .iter()
        .take(HISTOGRAM_ROWS)
        .map(|b| {
            let label = b.key.clone().unwrap_or_else(|| null_label.to_string());
            (b.key.clone(), label, b.count)
        })
        .collect();

    let rest: i64 = sorted.iter().skip(HISTOGRAM_ROWS).map(|b| b.count).sum();
    if rest > 0 {
        rows.push((None, "other".to_string(), rest));
    }

    let max = rows.iter().map(|(_, _, c)| *c).max().unwrap_or(0);
    rows.into_iter()
        .map(|(key, label, count)| Bar {
            key,
            label,
            count,
            width_pct: if max > 0 {
                (count as f64) * 100.0 / (max as f64)
            } else {
                0.0
            },
        })
        .collect()
}
