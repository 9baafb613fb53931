use std::time::Duration;

use crate::jobs::status::FailedRule;

// Runtime configuration for both processes, loaded from the environment
// (and an optional .env file) into typed structs.

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub database_url: String,
    pub schema: String,
    pub bind_addr: String,
    pub port: u16,
    pub allowed_origin: String,
    pub migrate_on_startup: bool,
    pub failed_rule: FailedRule,
}

impl GatewayConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL is missing"))?;

        let schema = env_or_fallback("JOBDASH_SCHEMA", "JOB_SCHEMA")
            .unwrap_or_else(|| "job_store".to_string());
        let schema = validate_schema(&schema)?;

        let bind_addr = env_or_fallback("JOBDASH_BIND_ADDR", "BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0".to_string());

        let port = match env_or_fallback("JOBDASH_PORT", "PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("invalid port: {raw}"))?,
            None => 5678,
        };

        let allowed_origin = env_or_fallback("JOBDASH_ALLOWED_ORIGIN", "ALLOWED_ORIGIN")
            .unwrap_or_else(|| "http://localhost:3000".to_string());

        let migrate_on_startup = env_bool("JOBDASH_MIGRATE_ON_STARTUP").unwrap_or(false);
        let failed_rule = failed_rule_from_env()?;

        Ok(Self {
            database_url,
            schema,
            bind_addr,
            port,
            allowed_origin,
            migrate_on_startup,
            failed_rule,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

#[derive(Clone, Debug)]
pub struct ConsoleConfig {
    pub api_url: String,
    pub ws_url: String,
    pub listen_addr: String,
    pub page_size: u32,
    pub dashboard_refresh: Duration,
    pub list_refresh: Duration,
    pub detail_refresh: Duration,
    pub health_interval: Duration,
}

impl ConsoleConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let api_url = env_or_fallback("JOBDASH_API_URL", "API_URL")
            .unwrap_or_else(|| "http://localhost:5678/graphql".to_string());
        let api_url = normalize_api_url(&api_url)?;

        let ws_url = match env_or_fallback("JOBDASH_WS_URL", "WS_URL") {
            Some(v) => v,
            None => derive_ws_url(&api_url)?,
        };

        let listen_addr = env_or_fallback("JOBDASH_CONSOLE_ADDR", "CONSOLE_ADDR")
            .unwrap_or_else(|| "0.0.0.0:3000".to_string());

        let page_size = std::env::var("JOBDASH_PAGE_SIZE")
            .ok()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .unwrap_or(25)
            .clamp(1, 200);

        Ok(Self {
            api_url,
            ws_url,
            listen_addr,
            page_size,
            dashboard_refresh: env_secs("JOBDASH_DASHBOARD_REFRESH_SECS", 10),
            list_refresh: env_secs("JOBDASH_LIST_REFRESH_SECS", 5),
            detail_refresh: env_secs("JOBDASH_DETAIL_REFRESH_SECS", 30),
            health_interval: env_secs("JOBDASH_HEALTH_INTERVAL_SECS", 15),
        })
    }
}

fn failed_rule_from_env() -> anyhow::Result<FailedRule> {
    match env_or_fallback("JOBDASH_FAILED_RULE", "FAILED_RULE") {
        Some(raw) => raw.parse(),
        None => Ok(FailedRule::default()),
    }
}

/// Schema names are interpolated into SQL, so only plain identifiers pass.
pub fn validate_schema(value: &str) -> anyhow::Result<String> {
    let v = value.trim();
    let mut chars = v.chars();
    let first_ok = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if !first_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') || v.len() > 63 {
        anyhow::bail!("invalid schema name: {value:?}");
    }
    Ok(v.to_string())
}

fn normalize_api_url(value: &str) -> anyhow::Result<String> {
    let parsed = url::Url::parse(value.trim())
        .map_err(|e| anyhow::anyhow!("invalid JOBDASH_API_URL {value:?}: {e}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed.to_string()),
        other => anyhow::bail!("JOBDASH_API_URL must be http(s), got {other}"),
    }
}

/// `http://host/graphql` -> `ws://host/graphql/ws`
pub fn derive_ws_url(api_url: &str) -> anyhow::Result<String> {
    let mut parsed = url::Url::parse(api_url)?;
    let scheme = if parsed.scheme() == "https" { "wss" } else { "ws" };
    parsed
        .set_scheme(scheme)
        .map_err(|_| anyhow::anyhow!("cannot derive websocket url from {api_url}"))?;
    let path = format!("{}/ws", parsed.path().trim_end_matches('/'));
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

pub(crate) fn env_or_fallback(primary: &str, fallback: &str) -> Option<String> {
    std::env::var(primary)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| std::env::var(fallback).ok().filter(|s| !s.trim().is_empty()))
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

fn env_secs(key: &str, default: u64) -> Duration {
    let secs = std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(default)
        .clamp(1, 3600);
    Duration::from_secs(secs)
}
