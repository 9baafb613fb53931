use crate::jobs::JobAction;

pub const NOTICE_PARAM: &str = "notice";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Rejected,
    Unreachable,
}

/// One-shot toast carried in the redirect after an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notice {
    pub action: JobAction,
    pub job_id: i64,
    pub outcome: Outcome,
}

impl Notice {
    /// `retry.ok.42`, `cancel.failed.7`, `complete.offline.3`
    pub fn encode(&self) -> String {
        let outcome = match self.outcome {
            Outcome::Applied => "ok",
            Outcome::Rejected => "failed",
            Outcome::Unreachable => "offline",
        };
        format!("{}.{}.{}", self.action.as_str(), outcome, self.job_id)
    }

    pub fn decode(raw: &str) -> Option<Self> {
        let mut parts = raw.trim().splitn(3, '.');
        let action = JobAction::parse(parts.next()?)?;
        let outcome = match parts.next()? {
            "ok" => Outcome::Applied,
            "failed" => Outcome::Rejected,
            "offline" => Outcome::Unreachable,
            _ => return None,
        };
        let job_id = parts.next()?.parse().ok()?;
        Some(Self {
            action,
            job_id,
            outcome,
        })
    }

    pub fn from_query(query: &str) -> Option<Self> {
        let query = query.strip_prefix('?').unwrap_or(query);
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == NOTICE_PARAM)
            .and_then(|(_, v)| Self::decode(&v))
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Applied
    }

    pub fn message(&self) -> String {
        let verb = match self.action {
            JobAction::Retry => "retried",
            JobAction::Cancel => "cancelled",
            JobAction::Complete => "marked completed",
        };
        match self.outcome {
            Outcome::Applied => format!("Job #{} {verb}.", self.job_id),
            Outcome::Rejected => format!(
                "Could not {} job #{}. The job store rejected the action.",
                self.action.as_str(),
                self.job_id
            ),
            Outcome::Unreachable => format!(
                "Could not {} job #{}: the job API is unreachable.",
                self.action.as_str(),
                self.job_id
            ),
        }
    }

    /// Appends this notice to a local path, keeping its existing query.
    pub fn attach_to(&self, path: &str) -> String {
        let sep = if path.contains('?') { '&' } else { '?' };
        format!("{path}{sep}{NOTICE_PARAM}={}", self.encode())
    }
}

/// Only same-site paths are valid redirect targets.
pub fn safe_return_to(raw: Option<&str>, fallback: &str) -> String {
    match raw.map(str::trim) {
        Some(p) if p.starts_with('/') && !p.starts_with("//") && !p.contains('\\') => {
            strip_notice(p)
        }
        _ => fallback.to_string(),
    }
}

fn strip_notice(path: &str) -> String {
    let Some((base, query)) = path.split_once('?') else {
        return path.to_string();
    };
    let kept: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
        .filter(|(k, _)| k != NOTICE_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        return base.to_string();
    }
    let q = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(kept)
        .finish();
    format!("{base}?{q}")
}
