//! Server-rendered dashboard. Every page is built from gateway data fetched
//! through an injected [`GatewayClient`]; the console has no database access.

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::client::{ClientError, GatewayClient};

pub mod connectivity;
pub mod dashboard;
pub mod list_state;
pub mod notice;
pub mod pages;
pub mod render;

pub use connectivity::Connectivity;
pub use list_state::ListState;

#[derive(Debug, Clone)]
pub struct ViewSettings {
    pub page_size: u32,
    pub dashboard_refresh: Duration,
    pub list_refresh: Duration,
    pub detail_refresh: Duration,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            page_size: 25,
            dashboard_refresh: Duration::from_secs(10),
            list_refresh: Duration::from_secs(5),
            detail_refresh: Duration::from_secs(30),
        }
    }
}

impl From<&crate::config::ConsoleConfig> for ViewSettings {
    fn from(cfg: &crate::config::ConsoleConfig) -> Self {
        Self {
            page_size: cfg.page_size,
            dashboard_refresh: cfg.dashboard_refresh,
            list_refresh: cfg.list_refresh,
            detail_refresh: cfg.detail_refresh,
        }
    }
}

#[derive(Clone)]
pub struct ConsoleState {
    pub client: GatewayClient,
    pub connectivity: Connectivity,
    pub settings: ViewSettings,
}

impl ConsoleState {
    pub fn new(client: GatewayClient, settings: ViewSettings) -> Self {
        Self {
            client,
            connectivity: Connectivity::default(),
            settings,
        }
    }

    /// Records a request-level connectivity failure so the banner appears on
    /// every page until the monitor sees the gateway again.
    pub(crate) fn note_error(&self, err: &ClientError) {
        if err.is_connectivity() {
            self.connectivity.report_err(err.to_string());
        }
    }

    pub(crate) fn banner(&self) -> Option<String> {
        let snap = self.connectivity.snapshot();
        if snap.online {
            return None;
        }
        Some(format!(
            "Cannot reach the job API at {}: {}.",
            self.client.endpoint(),
            snap.last_error.unwrap_or_else(|| "unknown error".to_string())
        ))
    }
}

pub fn router(state: ConsoleState) -> Router {
    Router::new()
        .route("/", get(pages::dashboard))
        .route("/jobs", get(pages::job_list))
        .route("/jobs/:id", get(pages::job_detail))
        .route("/jobs/:id/:action", post(pages::job_action))
        .route("/health", get(crate::api::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
