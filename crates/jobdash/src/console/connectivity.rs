use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::client::{GatewayClient, Poller};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectivitySnapshot {
    pub online: bool,
    pub last_error: Option<String>,
    pub checked_at: Option<DateTime<Utc>>,
}

impl Default for ConnectivitySnapshot {
    fn default() -> Self {
        Self {
            online: true,
            last_error: None,
            checked_at: None,
        }
    }
}

/// Latest known reachability of the gateway, shared between the background
/// monitor and request handlers.
#[derive(Clone, Default)]
pub struct Connectivity {
    inner: Arc<RwLock<ConnectivitySnapshot>>,
}

impl Connectivity {
    pub fn report_ok(&self) {
        self.set(ConnectivitySnapshot {
            online: true,
            last_error: None,
            checked_at: Some(Utc::now()),
        });
    }

    pub fn report_err(&self, error: impl Into<String>) {
        self.set(ConnectivitySnapshot {
            online: false,
            last_error: Some(error.into()),
            checked_at: Some(Utc::now()),
        });
    }

    pub fn snapshot(&self) -> ConnectivitySnapshot {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set(&self, next: ConnectivitySnapshot) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = next;
    }
}

/// Pings the gateway on the poller's schedule until cancelled, logging only
/// on transitions.
pub async fn monitor(
    client: GatewayClient,
    connectivity: Connectivity,
    poller: Poller,
    cancel: CancellationToken,
) {
    poller
        .run(cancel, || {
            let client = client.clone();
            let connectivity = connectivity.clone();
            async move {
                let was_online = connectivity.snapshot().online;
                match client.ping().await {
                    Ok(()) => {
                        if !was_online {
                            tracing::info!(endpoint = client.endpoint(), "job API reachable again");
                        }
                        connectivity.report_ok();
                        true
                    }
                    Err(e) => {
                        if was_online {
                            tracing::warn!(endpoint = client.endpoint(), error = %e, "job API unreachable");
                        }
                        connectivity.report_err(e.to_string());
                        false
                    }
                }
            }
        })
        .await;
}
