use std::fmt::Write as _;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::console::notice::Notice;
use crate::jobs::{JobAction, JobStatus};

const STYLE: &str = r#"
    :root {
      color-scheme: light;
      --bg: #f6f7fb;
      --panel: #ffffff;
      --border: #d7dbe6;
      --text: #1b1f2a;
      --muted: #5b6275;
      --accent: #1f6feb;
      --pending: #8a94a6;
      --running: #1f6feb;
      --failed: #d1242f;
      --completed: #1a7f37;
    }
    * { box-sizing: border-box; }
    body { margin: 0; font-family: "Segoe UI", "Helvetica Neue", Arial, sans-serif; background: var(--bg); color: var(--text); }
    header { padding: 16px 24px; border-bottom: 1px solid var(--border); background: var(--panel); display: flex; gap: 24px; align-items: baseline; }
    header h1 { margin: 0; font-size: 20px; }
    header nav a { margin-right: 12px; color: var(--accent); text-decoration: none; }
    main { padding: 16px 24px 32px; display: grid; gap: 16px; }
    section { background: var(--panel); border: 1px solid var(--border); border-radius: 10px; padding: 12px 14px; }
    h2 { margin: 0 0 8px; font-size: 16px; }
    .muted { color: var(--muted); font-size: 12px; }
    .cards { display: grid; gap: 12px; grid-template-columns: repeat(auto-fit, minmax(140px, 1fr)); }
    .card { background: var(--panel); border: 1px solid var(--border); border-radius: 10px; padding: 12px; }
    .card .n { font-size: 28px; font-weight: 600; }
    .banner { background: #fff1f0; border-bottom: 1px solid var(--failed); color: var(--failed); padding: 10px 24px; }
    .error { background: #fff8e6; border: 1px solid #e3b341; border-radius: 6px; padding: 8px 10px; }
    .toast { border-radius: 6px; padding: 8px 10px; }
    .toast.ok { background: #e6f4ea; border: 1px solid var(--completed); }
    .toast.bad { background: #fff1f0; border: 1px solid var(--failed); }
    table { width: 100%; border-collapse: collapse; font-size: 13px; }
    th, td { text-align: left; padding: 6px 8px; border-bottom: 1px solid var(--border); vertical-align: top; }
    .badge { display: inline-block; padding: 1px 8px; border-radius: 10px; color: white; font-size: 12px; }
    .badge.pending { background: var(--pending); }
    .badge.running { background: var(--running); }
    .badge.failed { background: var(--failed); }
    .badge.completed { background: var(--completed); }
    .bar { background: var(--accent); height: 10px; border-radius: 3px; }
    .dist { display: flex; height: 16px; border-radius: 4px; overflow: hidden; }
    .dist div { height: 100%; }
    form.inline { display: inline; }
    button { padding: 4px 10px; border: 1px solid var(--accent); background: var(--accent); color: white; border-radius: 6px; cursor: pointer; }
    button.danger { border-color: var(--failed); background: var(--failed); }
    input, select { padding: 6px; border: 1px solid var(--border); border-radius: 6px; font-family: inherit; }
    pre { margin: 0; padding: 10px; background: #0f172a; color: #e5e7eb; border-radius: 8px; font-size: 12px; overflow: auto; }
"#;

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Page chrome shared by every view.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub title: String,
    /// Where the auto-refresh goes; the canonical address of the view, so a
    /// one-shot notice is dropped on the next poll.
    pub canonical: String,
    pub refresh: Option<Duration>,
    /// Connectivity problem to show as a persistent banner.
    pub banner: Option<String>,
    pub notice: Option<Notice>,
}

impl Layout {
    pub fn render(&self, body: &str) -> String {
        let mut html = String::with_capacity(body.len() + STYLE.len() + 1024);
        html.push_str("<!doctype html>\n<html lang=\"en\">\n<head>\n");
        html.push_str("  <meta charset=\"utf-8\" />\n");
        html.push_str(
            "  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />\n",
        );
        if let Some(refresh) = self.refresh {
            let _ = writeln!(
                html,
                "  <meta http-equiv=\"refresh\" content=\"{}; url={}\" />",
                refresh.as_secs().max(1),
                escape(&self.canonical)
            );
        }
        let _ = writeln!(html, "  <title>{} · Job Dashboard</title>", escape(&self.title));
        let _ = writeln!(html, "  <style>{STYLE}</style>");
        html.push_str("</head>\n<body>\n");

        if let Some(banner) = &self.banner {
            let _ = writeln!(
                html,
                "<div class=\"banner\" role=\"alert\">{} <a href=\"{}\">Retry now</a></div>",
                escape(banner),
                escape(&self.canonical)
            );
        }

        html.push_str(
            "<header><h1>Job Dashboard</h1><nav><a href=\"/\">Overview</a><a href=\"/jobs\">Jobs</a></nav></header>\n<main>\n",
        );

        if let Some(notice) = &self.notice {
            let class = if notice.is_success() { "ok" } else { "bad" };
            let _ = writeln!(
                html,
                "<div class=\"toast {class}\" role=\"status\">{}</div>",
                escape(&notice.message())
            );
        }

        html.push_str(body);
        html.push_str("\n</main>\n</body>\n</html>\n");
        html
    }
}

pub fn error_box(message: &str) -> String {
    format!(
        "<div class=\"error\">Some data could not be loaded: {}</div>",
        escape(message)
    )
}

pub fn status_badge(status: JobStatus) -> String {
    format!(
        "<span class=\"badge {0}\">{0}</span>",
        status.as_str()
    )
}

pub fn fmt_time(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub fn fmt_opt_time(t: Option<DateTime<Utc>>) -> String {
    t.map(fmt_time).unwrap_or_else(|| "—".to_string())
}

pub fn job_href(id: i64) -> String {
    format!("/jobs/{id}")
}

/// One small form per allowed action. Cancel/complete post unconfirmed and
/// land on the confirmation page first.
pub fn action_forms(job_id: i64, status: JobStatus, return_to: &str) -> String {
    let mut out = String::new();
    for action in JobAction::allowed_for(status) {
        let class = if action.needs_confirmation() {
            " class=\"danger\""
        } else {
            ""
        };
        let _ = write!(
            out,
            "<form class=\"inline\" method=\"post\" action=\"/jobs/{job_id}/{}\">\
             <input type=\"hidden\" name=\"return_to\" value=\"{}\" />\
             <button type=\"submit\"{class}>{}</button></form> ",
            action.as_str(),
            escape(return_to),
            action.label()
        );
    }
    out
}

pub fn truncate(s: &str, max_chars: usize) -> String {
    let mut chars = s.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}
