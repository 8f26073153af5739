use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use sqlx::SqlitePool;

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub metrics: Arc<ServerMetrics>,
}

#[derive(Debug, Default)]
pub struct ServerMetrics {
    pub auth_failures: AtomicU64,
    pub invites_sent: AtomicU64,
    pub notifications_created: AtomicU64,
    pub export_requests: AtomicU64,
    pub export_failures: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerMetricsSnapshot {
    pub auth_failures: u64,
    pub invites_sent: u64,
    pub notifications_created: u64,
    pub export_requests: u64,
    pub export_failures: u64,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ServerMetricsSnapshot {
        ServerMetricsSnapshot {
            auth_failures: self.auth_failures.load(Ordering::Relaxed),
            invites_sent: self.invites_sent.load(Ordering::Relaxed),
            notifications_created: self.notifications_created.load(Ordering::Relaxed),
            export_requests: self.export_requests.load(Ordering::Relaxed),
            export_failures: self.export_failures.load(Ordering::Relaxed),
        }
    }

    pub fn inc_auth_failures(&self) -> u64 {
        self.auth_failures.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn add_invites_sent(&self, count: u64) -> u64 {
        self.invites_sent.fetch_add(count, Ordering::Relaxed) + count
    }

    pub fn add_notifications_created(&self, count: u64) -> u64 {
        self.notifications_created.fetch_add(count, Ordering::Relaxed) + count
    }

    pub fn inc_export_requests(&self) -> u64 {
        self.export_requests.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn inc_export_failures(&self) -> u64 {
        self.export_failures.fetch_add(1, Ordering::Relaxed) + 1
    }
}
