//! # Background Sync Service
//!
//! Drains the offline queue whenever the remote service becomes reachable.
//!
//! ## Architecture
//!
//! The sync service coordinates:
//! - **Network Monitor**: connectivity state and transition events
//! - **Synchronizer**: one replay pass over the queue, never two at once
//! - **Background Tasks**: a reconnect task reacting to `WentOnline` events
//!   and, with auto sync enabled, a periodic pass while online
//! - **Sync State**: status snapshots for callers
//!
//! ## Usage
//!
//! ```rust,no_run
//! use attendance_sync::client::{AppContext, SyncService};
//!
//! # async fn example(context: AppContext) -> Result<(), attendance_sync::client::sync::SyncError> {
//! let mut sync_service = context.sync_service();
//!
//! // Start background sync
//! sync_service.start()?;
//!
//! // Monitor sync status
//! let status = sync_service.status().await;
//! println!("{} actions pending", status.pending);
//!
//! // Force immediate sync
//! sync_service.force_sync().await;
//! # Ok(())
//! # }
//! ```

pub mod network_monitor;
pub mod sync_state;
pub mod synchronizer;

pub use network_monitor::{
    spawn_reachability_probe, ConnectivityEvent, ConnectivityMonitor, ConnectivityTransition,
    NetworkStatus,
};
pub use sync_state::SyncStatus;
pub use synchronizer::{SyncOutcome, SyncReport, Synchronizer};

use crate::client::config::Config;
use crate::client::offline::{DeadLetterStore, QueueStore};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Configuration for the sync service
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Run a periodic pass while online
    pub auto_sync: bool,
    /// Period of the automatic pass
    pub sync_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_sync: true,
            sync_interval: Duration::from_secs(30),
        }
    }
}

impl From<&Config> for SyncConfig {
    fn from(config: &Config) -> Self {
        Self {
            auto_sync: config.auto_sync(),
            sync_interval: config.sync_interval(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("Sync service is already running")]
    AlreadyRunning,
}

/// Main sync service coordinator
#[derive(Debug)]
pub struct SyncService {
    config: SyncConfig,
    monitor: Arc<ConnectivityMonitor>,
    synchronizer: Arc<Synchronizer>,
    queue: Arc<QueueStore>,
    dead_letters: Arc<DeadLetterStore>,
    /// Cancels the background tasks of the current run
    shutdown: Option<CancellationToken>,
    tasks: Vec<JoinHandle<()>>,
}

impl SyncService {
    pub fn new(
        config: SyncConfig,
        monitor: Arc<ConnectivityMonitor>,
        synchronizer: Arc<Synchronizer>,
        queue: Arc<QueueStore>,
        dead_letters: Arc<DeadLetterStore>,
    ) -> Self {
        Self {
            config,
            monitor,
            synchronizer,
            queue,
            dead_letters,
            shutdown: None,
            tasks: Vec::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.is_some()
    }

    /// Start the background tasks
    pub fn start(&mut self) -> Result<(), SyncError> {
        if self.shutdown.is_some() {
            return Err(SyncError::AlreadyRunning);
        }

        let token = CancellationToken::new();

        // Subscribe before spawning so no transition is missed
        let events = self.monitor.subscribe();
        self.tasks.push(tokio::spawn(Self::reconnect_loop(
            events,
            Arc::clone(&self.monitor),
            Arc::clone(&self.synchronizer),
            Arc::clone(&self.queue),
            token.clone(),
        )));

        if self.config.auto_sync {
            self.tasks.push(tokio::spawn(Self::periodic_loop(
                Arc::clone(&self.monitor),
                Arc::clone(&self.synchronizer),
                self.config.sync_interval,
                token.clone(),
            )));
        }

        tracing::info!(
            auto_sync = self.config.auto_sync,
            interval_secs = self.config.sync_interval.as_secs(),
            "sync service started"
        );
        self.shutdown = Some(token);
        Ok(())
    }

    /// Stop the background tasks. A pass in flight runs to completion.
    pub async fn stop(&mut self) {
        if let Some(token) = self.shutdown.take() {
            token.cancel();
        }

        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "sync task ended abnormally");
            }
        }
        tracing::info!("sync service stopped");
    }

    /// Run a pass now
    pub async fn force_sync(&self) -> SyncOutcome {
        self.synchronizer.sync().await
    }

    pub async fn status(&self) -> SyncStatus {
        let last_report = self.synchronizer.last_report().await;

        SyncStatus {
            network_status: self.monitor.status(),
            is_syncing: self.synchronizer.is_running(),
            pending: self.queue.pending_len().await,
            degraded: self.queue.is_degraded().await,
            rejected: self.dead_letters.len().await,
            last_sync: last_report.as_ref().map(|r| r.finished_at),
            last_report,
        }
    }

    /// Sync on start when online with work waiting, then on every reconnect
    async fn reconnect_loop(
        mut events: tokio::sync::mpsc::UnboundedReceiver<ConnectivityEvent>,
        monitor: Arc<ConnectivityMonitor>,
        synchronizer: Arc<Synchronizer>,
        queue: Arc<QueueStore>,
        token: CancellationToken,
    ) {
        if monitor.is_online() && queue.pending_len().await > 0 {
            synchronizer.sync().await;
        }

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) if event.transition == ConnectivityTransition::WentOnline => {
                        tracing::info!(sequence = event.sequence, "connection restored, syncing");
                        synchronizer.sync().await;
                    }
                    Some(_) => {}
                    None => break,
                },
            }
        }
    }

    async fn periodic_loop(
        monitor: Arc<ConnectivityMonitor>,
        synchronizer: Arc<Synchronizer>,
        period: Duration,
        token: CancellationToken,
    ) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately; the reconnect task covers startup
        interval.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    if monitor.is_online() {
                        synchronizer.sync().await;
                    }
                }
            }
        }
    }
}

impl Drop for SyncService {
    fn drop(&mut self) {
        if let Some(token) = self.shutdown.take() {
            token.cancel();
        }
    }
}
