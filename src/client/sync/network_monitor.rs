//! # Network Monitor
//!
//! Tracks whether the remote service is believed reachable and tells
//! subscribers when that changes.
//!
//! ## Features
//!
//! - **Connectivity State**: a single online/offline flag, readable without awaiting
//! - **Transitions**: exactly one event per state change, none for repeated signals
//! - **Ordered Delivery**: every subscriber sees every transition, in order
//! - **Reachability Probe**: background task feeding probe results into the monitor

use crate::client::remote::RemoteService;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    Online,
    Offline,
}

impl NetworkStatus {
    fn from_online(online: bool) -> Self {
        if online {
            NetworkStatus::Online
        } else {
            NetworkStatus::Offline
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityTransition {
    WentOnline,
    WentOffline,
}

/// A change of connectivity state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectivityEvent {
    /// Strictly increasing per monitor
    pub sequence: u64,
    pub transition: ConnectivityTransition,
    pub at: DateTime<Utc>,
}

#[derive(Debug)]
struct MonitorState {
    status: NetworkStatus,
    sequence: u64,
    subscribers: Vec<mpsc::UnboundedSender<ConnectivityEvent>>,
}

/// Source of truth for connectivity
#[derive(Debug)]
pub struct ConnectivityMonitor {
    state: Mutex<MonitorState>,
}

impl ConnectivityMonitor {
    /// Start from the platform's reported reachability
    pub fn new(initial_online: bool) -> Self {
        Self {
            state: Mutex::new(MonitorState {
                status: NetworkStatus::from_online(initial_online),
                sequence: 0,
                subscribers: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        // State stays consistent even if a holder panicked
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_online(&self) -> bool {
        self.status() == NetworkStatus::Online
    }

    pub fn status(&self) -> NetworkStatus {
        self.lock().status
    }

    /// Feed a platform signal. Returns the event when the state changed.
    pub fn apply_signal(&self, online: bool) -> Option<ConnectivityEvent> {
        let mut state = self.lock();
        let next = NetworkStatus::from_online(online);

        if state.status == next {
            return None;
        }

        state.status = next;
        state.sequence += 1;

        let event = ConnectivityEvent {
            sequence: state.sequence,
            transition: match next {
                NetworkStatus::Online => ConnectivityTransition::WentOnline,
                NetworkStatus::Offline => ConnectivityTransition::WentOffline,
            },
            at: Utc::now(),
        };

        tracing::info!(
            sequence = event.sequence,
            transition = ?event.transition,
            "connectivity changed"
        );

        // Sent under the lock so subscribers observe transitions in order
        state
            .subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());

        Some(event)
    }

    /// Receive every future transition
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ConnectivityEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().subscribers.push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }
}

/// Poll `remote.probe()` every `interval` and feed the result to `monitor`
/// until `token` is cancelled.
pub fn spawn_reachability_probe(
    monitor: Arc<ConnectivityMonitor>,
    remote: Arc<dyn RemoteService>,
    interval: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!("reachability probe stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let reachable = remote.probe().await;
                    monitor.apply_signal(reachable);
                }
            }
        }
    })
}
