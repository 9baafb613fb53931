use std::fmt::Write as _;

use axum::extract::{Form, Path, RawQuery, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Deserialize;

use crate::client::JobView;
use crate::console::dashboard::{Bar, DashboardView, RECENT_FAILED_LIMIT};
use crate::console::list_state::ListState;
use crate::console::notice::{safe_return_to, Notice, Outcome};
use crate::console::render::{
    action_forms, error_box, escape, fmt_opt_time, fmt_time, job_href, status_badge, truncate,
    Layout,
};
use crate::console::ConsoleState;
use crate::jobs::{JobAction, JobOrder, JobStatus};

// ----------------------------
// Dashboard
// ----------------------------

pub async fn dashboard(
    State(st): State<ConsoleState>,
    RawQuery(query): RawQuery,
) -> Html<String> {
    let notice = query.as_deref().and_then(Notice::from_query);

    let view = match st.client.dashboard(RECENT_FAILED_LIMIT).await {
        Ok(res) => {
            st.connectivity.report_ok();
            DashboardView::from_response(res)
        }
        Err(e) => {
            tracing::warn!(error = %e, "dashboard fetch failed");
            st.note_error(&e);
            DashboardView {
                error: (!e.is_connectivity()).then(|| e.to_string()),
                ..DashboardView::default()
            }
        }
    };

    let layout = Layout {
        title: "Overview".into(),
        canonical: "/".into(),
        refresh: Some(st.settings.dashboard_refresh),
        banner: st.banner(),
        notice,
    };
    Html(layout.render(&dashboard_body(&view)))
}

fn dashboard_body(view: &DashboardView) -> String {
    let mut body = String::new();

    if let Some(err) = &view.error {
        body.push_str(&error_box(err));
    }

    body.push_str("<div class=\"cards\">");
    match view.counts {
        Some(c) => {
            let _ = write!(
                body,
                "<a class=\"card\" href=\"/jobs\"><div class=\"muted\">Total</div><div class=\"n\">{}</div></a>",
                c.total
            );
            for status in [
                JobStatus::Running,
                JobStatus::Failed,
                JobStatus::Completed,
                JobStatus::Pending,
            ] {
                let href = ListState::default().with_status(Some(status)).href();
                let _ = write!(
                    body,
                    "<a class=\"card\" href=\"{}\"><div class=\"muted\">{}</div><div class=\"n\">{}</div></a>",
                    escape(&href),
                    status.as_str(),
                    c.get(status)
                );
            }
        }
        None => body.push_str("<div class=\"card muted\">Counts unavailable</div>"),
    }
    body.push_str("</div>\n");

    let dist = view.distribution();
    if !dist.is_empty() {
        body.push_str("<section><h2>Status distribution</h2><div class=\"dist\">");
        for slice in &dist {
            if slice.count == 0 {
                continue;
            }
            let _ = write!(
                body,
                "<div style=\"width:{:.2}%;background:var(--{})\" title=\"{}: {} ({:.1}%)\"></div>",
                slice.share_pct,
                slice.status.as_str(),
                slice.status.as_str(),
                slice.count,
                slice.share_pct
            );
        }
        body.push_str("</div><div class=\"muted\">");
        for slice in &dist {
            let _ = write!(
                body,
                "{} {} ({:.1}%) &nbsp; ",
                status_badge(slice.status),
                slice.count,
                slice.share_pct
            );
        }
        body.push_str("</div></section>\n");
    }

    body.push_str(&histogram_section("Jobs by task", &view.by_task, |key| {
        ListState::default().with_task(Some(key)).href()
    }));
    body.push_str(&histogram_section("Jobs by queue", &view.by_queue, |key| {
        ListState::default().with_queue(Some(key)).href()
    }));

    let failed_href = ListState::default()
        .with_status(Some(JobStatus::Failed))
        .href();
    let _ = write!(
        body,
        "<section><h2>Recently failed</h2><div class=\"muted\">{} failed in total · <a href=\"{}\">see all</a></div>",
        view.failed_total,
        escape(&failed_href)
    );
    if view.recent_failed.is_empty() {
        body.push_str("<p class=\"muted\">No failed jobs.</p>");
    } else {
        body.push_str(
            "<table><thead><tr><th>ID</th><th>Task</th><th>Queue</th><th>Attempts</th><th>Last error</th><th>Updated</th><th></th></tr></thead><tbody>",
        );
        for JobView { job, status } in &view.recent_failed {
            let _ = write!(
                body,
                "<tr><td><a href=\"{href}\">#{id}</a></td><td>{task}</td><td>{queue}</td><td>{a}/{m}</td><td>{err}</td><td>{updated}</td><td>{actions}</td></tr>",
                href = job_href(job.id),
                id = job.id,
                task = escape(&job.task_identifier),
                queue = escape(job.queue_name.as_deref().unwrap_or("—")),
                a = job.attempts,
                m = job.max_attempts,
                err = escape(&truncate(job.last_error.as_deref().unwrap_or(""), 120)),
                updated = fmt_time(job.updated_at),
                actions = action_forms(job.id, *status, "/"),
            );
        }
        body.push_str("</tbody></table>");
    }
    body.push_str("</section>\n");

    body
}

fn histogram_section(title: &str, bars: &[Bar], href_for: impl Fn(&str) -> String) -> String {
    let mut out = format!("<section><h2>{}</h2>", escape(title));
    if bars.is_empty() {
        out.push_str("<p class=\"muted\">No jobs.</p></section>\n");
        return out;
    }
    out.push_str("<table><tbody>");
    for bar in bars {
        let label = match &bar.key {
            Some(key) => format!(
                "<a href=\"{}\">{}</a>",
                escape(&href_for(key)),
                escape(&bar.label)
            ),
            None => escape(&bar.label),
        };
        let _ = write!(
            out,
            "<tr><td style=\"width:30%\">{label}</td><td style=\"width:10%\">{}</td><td><div class=\"bar\" style=\"width:{:.2}%\"></div></td></tr>",
            bar.count, bar.width_pct
        );
    }
    out.push_str("</tbody></table></section>\n");
    out
}

// ----------------------------
// Job list
// ----------------------------

pub async fn job_list(State(st): State<ConsoleState>, RawQuery(query): RawQuery) -> Html<String> {
    let query = query.unwrap_or_default();
    let state = ListState::from_query(&query);
    let notice = Notice::from_query(&query);
    let page_size = st.settings.page_size;

    let mut body = filter_form(&state);

    match st
        .client
        .jobs(&state.filter(), JobOrder::UpdatedAtDesc, state.page(page_size))
        .await
    {
        Ok(res) => {
            st.connectivity.report_ok();
            if let Some(err) = res.error_summary() {
                body.push_str(&error_box(&err));
            }
            match res.data {
                Some(page) => {
                    body.push_str(&jobs_table(&page.nodes, &state));
                    body.push_str(&pager(&state, page_size, page.nodes.len(), page.total_count));
                }
                None => body.push_str("<p class=\"muted\">No data.</p>"),
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "job list fetch failed");
            st.note_error(&e);
            if !e.is_connectivity() {
                body.push_str(&error_box(&e.to_string()));
            }
        }
    }

    let layout = Layout {
        title: "Jobs".into(),
        canonical: state.href(),
        refresh: Some(st.settings.list_refresh),
        banner: st.banner(),
        notice,
    };
    Html(layout.render(&body))
}

fn filter_form(state: &ListState) -> String {
    let mut status_opts = String::from("<option value=\"\">any status</option>");
    for status in JobStatus::ALL {
        let selected = if state.status == Some(status) {
            " selected"
        } else {
            ""
        };
        let _ = write!(
            status_opts,
            "<option value=\"{0}\"{selected}>{0}</option>",
            status.as_str()
        );
    }

    let clear = if state.is_filtered() {
        format!(" <a href=\"{}\">clear</a>", escape(&state.cleared().href()))
    } else {
        String::new()
    };

    format!(
        "<section><form method=\"get\" action=\"/jobs\">\
         <input name=\"search\" placeholder=\"search\" value=\"{}\" /> \
         <select name=\"status\">{status_opts}</select> \
         <input name=\"task\" placeholder=\"task identifier\" value=\"{}\" /> \
         <input name=\"queue\" placeholder=\"queue\" value=\"{}\" /> \
         <button type=\"submit\">Filter</button>{clear}</form></section>\n",
        escape(state.search.as_deref().unwrap_or("")),
        escape(state.task.as_deref().unwrap_or("")),
        escape(state.queue.as_deref().unwrap_or("")),
    )
}

fn jobs_table(rows: &[JobView], state: &ListState) -> String {
    if rows.is_empty() {
        let mut out = String::from("<section><p class=\"muted\">No jobs match.");
        if state.offset > 0 {
            let first = ListState {
                offset: 0,
                ..state.clone()
            };
            let _ = write!(out, " <a href=\"{}\">First page</a>", escape(&first.href()));
        }
        out.push_str("</p></section>\n");
        return out;
    }

    let return_to = state.href();
    let mut out = String::from(
        "<section><table><thead><tr><th>ID</th><th>Status</th><th>Task</th><th>Queue</th><th>Priority</th><th>Attempts</th><th>Run at</th><th>Updated</th><th>Last error</th><th></th></tr></thead><tbody>",
    );
    for JobView { job, status } in rows {
        let task_href = state.with_task(Some(&job.task_identifier)).href();
        let queue_cell = match job.queue_name.as_deref() {
            Some(q) => format!(
                "<a href=\"{}\">{}</a>",
                escape(&state.with_queue(Some(q)).href()),
                escape(q)
            ),
            None => "—".to_string(),
        };
        let _ = write!(
            out,
            "<tr><td><a href=\"{href}\">#{id}</a></td><td>{badge}</td><td><a href=\"{task_href}\">{task}</a></td><td>{queue_cell}</td><td>{prio}</td><td>{a}/{m}</td><td>{run_at}</td><td>{updated}</td><td>{err}</td><td>{actions}</td></tr>",
            href = job_href(job.id),
            id = job.id,
            badge = status_badge(*status),
            task_href = escape(&task_href),
            task = escape(&job.task_identifier),
            prio = job.priority,
            a = job.attempts,
            m = job.max_attempts,
            run_at = fmt_time(job.run_at),
            updated = fmt_time(job.updated_at),
            err = escape(&truncate(job.last_error.as_deref().unwrap_or(""), 80)),
            actions = action_forms(job.id, *status, &return_to),
        );
    }
    out.push_str("</tbody></table></section>\n");
    out
}

fn pager(state: &ListState, page_size: u32, shown: usize, total: i64) -> String {
    let offset = i64::from(state.offset);
    let to = offset + shown as i64;
    let mut out = String::from("<section class=\"muted\">");
    if shown == 0 {
        let _ = write!(out, "No rows on this page ({total} in total) ");
    } else {
        // the count is a separate query and may trail the page by a few rows
        let _ = write!(out, "Showing {}–{to} of {} ", offset + 1, total.max(to));
    }

    if let Some(prev) = state.prev_page(page_size) {
        let _ = write!(out, "<a href=\"{}\">← previous</a> ", escape(&prev.href()));
    }
    if shown > 0 && to < total {
        let _ = write!(
            out,
            "<a href=\"{}\">next →</a>",
            escape(&state.next_page(page_size).href())
        );
    }
    out.push_str("</section>\n");
    out
}

// ----------------------------
// Job detail
// ----------------------------

pub async fn job_detail(
    State(st): State<ConsoleState>,
    Path(id): Path<i64>,
    RawQuery(query): RawQuery,
) -> Response {
    let notice = query.as_deref().and_then(Notice::from_query);
    let canonical = job_href(id);
    let mut status_code = StatusCode::OK;
    let mut body = String::from("<section><a href=\"/jobs\">← all jobs</a></section>\n");

    match st.client.job(id).await {
        Ok(res) => {
            st.connectivity.report_ok();
            if let Some(err) = res.error_summary() {
                body.push_str(&error_box(&err));
            }
            match res.data.flatten() {
                Some(view) => body.push_str(&job_body(&view)),
                None if res.errors.is_empty() => {
                    status_code = StatusCode::NOT_FOUND;
                    let _ = write!(body, "<section><h2>Job #{id} not found</h2><p class=\"muted\">It may have been removed by the queue.</p></section>");
                }
                None => {}
            }
        }
        Err(e) => {
            tracing::warn!(job_id = id, error = %e, "job fetch failed");
            st.note_error(&e);
            if !e.is_connectivity() {
                body.push_str(&error_box(&e.to_string()));
            }
        }
    }

    let layout = Layout {
        title: format!("Job #{id}"),
        canonical,
        refresh: Some(st.settings.detail_refresh),
        banner: st.banner(),
        notice,
    };
    (status_code, Html(layout.render(&body))).into_response()
}

fn job_body(view: &JobView) -> String {
    let JobView { job, status } = view;
    let status = *status;
    let payload = serde_json::to_string_pretty(&job.payload).unwrap_or_else(|_| job.payload.to_string());

    let mut out = format!(
        "<section><h2>Job #{} {}</h2><div>{}</div></section>\n",
        job.id,
        status_badge(status),
        action_forms(job.id, status, &job_href(job.id))
    );

    let rows: Vec<(&str, String)> = vec![
        ("Task", escape(&job.task_identifier)),
        ("Queue", escape(job.queue_name.as_deref().unwrap_or("—"))),
        ("Priority", job.priority.to_string()),
        ("Run at", fmt_time(job.run_at)),
        ("Attempts", format!("{} / {}", job.attempts, job.max_attempts)),
        ("Created", fmt_time(job.created_at)),
        ("Updated", fmt_time(job.updated_at)),
        ("Locked at", fmt_opt_time(job.locked_at)),
        ("Locked by", escape(job.locked_by.as_deref().unwrap_or("—"))),
    ];
    out.push_str("<section><table><tbody>");
    for (k, v) in rows {
        let _ = write!(out, "<tr><th style=\"width:20%\">{k}</th><td>{v}</td></tr>");
    }
    out.push_str("</tbody></table></section>\n");

    if let Some(err) = &job.last_error {
        let _ = write!(
            out,
            "<section><h2>Last error</h2><pre>{}</pre></section>\n",
            escape(err)
        );
    }

    let _ = write!(
        out,
        "<section><h2>Payload</h2><pre>{}</pre></section>\n",
        escape(&payload)
    );
    out
}

// ----------------------------
// Actions
// ----------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ActionForm {
    pub confirmed: Option<String>,
    pub return_to: Option<String>,
}

pub async fn job_action(
    State(st): State<ConsoleState>,
    Path((id, action)): Path<(i64, String)>,
    Form(form): Form<ActionForm>,
) -> Response {
    let Some(action) = JobAction::parse(&action) else {
        return (StatusCode::NOT_FOUND, "unknown action").into_response();
    };
    let return_to = safe_return_to(form.return_to.as_deref(), &job_href(id));

    let confirmed = form.confirmed.as_deref() == Some("yes");
    if action.needs_confirmation() && !confirmed {
        let layout = Layout {
            title: format!("{} job #{id}", action.label()),
            canonical: return_to.clone(),
            refresh: None,
            banner: st.banner(),
            notice: None,
        };
        return Html(layout.render(&confirm_body(action, id, &return_to))).into_response();
    }

    let outcome = match st.client.run_action(action, id).await {
        Ok(true) => Outcome::Applied,
        Ok(false) => Outcome::Rejected,
        Err(e) => {
            tracing::warn!(action = action.as_str(), job_id = id, error = %e, "action dispatch failed");
            st.note_error(&e);
            if e.is_connectivity() {
                Outcome::Unreachable
            } else {
                Outcome::Rejected
            }
        }
    };
    tracing::info!(action = action.as_str(), job_id = id, ?outcome, "action dispatched");

    let notice = Notice {
        action,
        job_id: id,
        outcome,
    };
    Redirect::to(&notice.attach_to(&return_to)).into_response()
}

fn confirm_body(action: JobAction, id: i64, return_to: &str) -> String {
    let consequence = match action {
        JobAction::Cancel => "The job will be marked as permanently failed and will not run again.",
        JobAction::Complete => "The job will be recorded as completed without running.",
        JobAction::Retry => "The job will be rescheduled to run now.",
    };
    format!(
        "<section><h2>{label} job #{id}?</h2><p>{consequence}</p>\
         <form method=\"post\" action=\"/jobs/{id}/{action}\">\
         <input type=\"hidden\" name=\"confirmed\" value=\"yes\" />\
         <input type=\"hidden\" name=\"return_to\" value=\"{ret}\" />\
         <button type=\"submit\" class=\"danger\">Yes, {lower}</button> \
         <a href=\"{ret}\">No, go back</a></form></section>\n",
        label = action.label(),
        action = action.as_str(),
        lower = action.as_str(),
        ret = escape(return_to),
    )
}
