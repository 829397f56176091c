//! # Sync State
//!
//! Point-in-time view of synchronization, assembled on demand from the
//! monitor, queue and synchronizer.

use crate::client::sync::network_monitor::NetworkStatus;
use crate::client::sync::synchronizer::SyncReport;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct SyncStatus {
    pub network_status: NetworkStatus,
    /// Whether a pass is in flight
    pub is_syncing: bool,
    /// Envelopes waiting for delivery
    pub pending: usize,
    /// Whether the queue could not be persisted and lives only in memory
    pub degraded: bool,
    /// Envelopes the server refused
    pub rejected: usize,
    pub last_report: Option<SyncReport>,
    pub last_sync: Option<DateTime<Utc>>,
}

impl SyncStatus {
    pub fn is_online(&self) -> bool {
        self.network_status == NetworkStatus::Online
    }
}
