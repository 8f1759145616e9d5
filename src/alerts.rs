//! In-memory SOS alert counter. Lives for the process and resets on restart.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

pub const LAST_SOS_RECENT: &str = "Just now";
pub const LAST_SOS_NONE: &str = "N/A";
pub const NODE_STATUS_ACTIVE: &str = "Active";

#[derive(Debug, Default)]
pub struct AlertStats {
    total: AtomicU64,
}

/// Body of `GET /admin/stats`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    #[serde(rename = "totalSOS")]
    pub total_sos: u64,
    #[serde(rename = "lastSOS")]
    pub last_sos: &'static str,
    pub node_status: &'static str,
}

impl AlertStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one alert and return the total including it.
    pub fn trigger(&self) -> u64 {
        self.total.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }

    /// `lastSOS` only says whether any alert has happened; it is not a timestamp.
    pub fn snapshot(&self) -> StatsSnapshot {
        let total_sos = self.total();
        StatsSnapshot {
            total_sos,
            last_sos: if total_sos > 0 { LAST_SOS_RECENT } else { LAST_SOS_NONE },
            node_status: NODE_STATUS_ACTIVE,
        }
    }
}
