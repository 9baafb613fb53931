use url::form_urlencoded;

use crate::jobs::{JobFilter, JobStatus, Page};

pub const LIST_PATH: &str = "/jobs";

/// Filter and pagination state of the job list, mirrored 1:1 in the page
/// address so reloads and back/forward navigation keep the view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListState {
    pub search: Option<String>,
    pub status: Option<JobStatus>,
    pub task: Option<String>,
    pub queue: Option<String>,
    pub offset: u32,
}

impl ListState {
    /// Parses a query string (with or without the leading `?`). Unknown keys,
    /// bad values and blank values fall back to defaults.
    pub fn from_query(query: &str) -> Self {
        let mut state = Self::default();
        let query = query.strip_prefix('?').unwrap_or(query);

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "search" => state.search = clean(&value),
                "status" => state.status = JobStatus::parse(&value),
                "task" => state.task = clean(&value),
                "queue" => state.queue = clean(&value),
                "offset" => state.offset = value.trim().parse().unwrap_or(0),
                _ => {}
            }
        }

        state
    }

    /// Query string without the leading `?`; default fields are omitted.
    pub fn to_query(&self) -> String {
        let mut ser = form_urlencoded::Serializer::new(String::new());
        if let Some(v) = self.search.as_deref().and_then(|v| clean(v)) {
            ser.append_pair("search", &v);
        }
        if let Some(status) = self.status {
            ser.append_pair("status", status.as_str());
        }
        if let Some(v) = self.task.as_deref().and_then(|v| clean(v)) {
            ser.append_pair("task", &v);
        }
        if let Some(v) = self.queue.as_deref().and_then(|v| clean(v)) {
            ser.append_pair("queue", &v);
        }
        if self.offset > 0 {
            ser.append_pair("offset", &self.offset.to_string());
        }
        ser.finish()
    }

    pub fn href(&self) -> String {
        let q = self.to_query();
        if q.is_empty() {
            LIST_PATH.to_string()
        } else {
            format!("{LIST_PATH}?{q}")
        }
    }

    pub fn is_filtered(&self) -> bool {
        self.search.is_some() || self.status.is_some() || self.task.is_some() || self.queue.is_some()
    }

    // Changing a filter always returns to the first page.

    pub fn with_search(&self, search: Option<&str>) -> Self {
        Self {
            search: search.and_then(clean),
            offset: 0,
            ..self.clone()
        }
    }

    pub fn with_status(&self, status: Option<JobStatus>) -> Self {
        Self {
            status,
            offset: 0,
            ..self.clone()
        }
    }

    pub fn with_task(&self, task: Option<&str>) -> Self {
        Self {
            task: task.and_then(clean),
            offset: 0,
            ..self.clone()
        }
    }

    pub fn with_queue(&self, queue: Option<&str>) -> Self {
        Self {
            queue: queue.and_then(clean),
            offset: 0,
            ..self.clone()
        }
    }

    pub fn cleared(&self) -> Self {
        Self::default()
    }

    pub fn next_page(&self, page_size: u32) -> Self {
        Self {
            offset: self.offset.saturating_add(page_size),
            ..self.clone()
        }
    }

    /// `None` on the first page.
    pub fn prev_page(&self, page_size: u32) -> Option<Self> {
        if self.offset == 0 {
            return None;
        }
        Some(Self {
            offset: self.offset.saturating_sub(page_size),
            ..self.clone()
        })
    }

    pub fn filter(&self) -> JobFilter {
        JobFilter {
            search: self.search.clone(),
            status: self.status,
            task_identifier: self.task.clone(),
            queue_name: self.queue.clone(),
        }
        .normalized()
    }

    pub fn page(&self, page_size: u32) -> Page {
        Page::new(page_size as i64, self.offset as i64)
    }
}

fn clean(v: &str) -> Option<String> {
    let v = v.trim();
    if v.is_empty() {
        None
    } else {
        Some(v.to_string())
    }
}
