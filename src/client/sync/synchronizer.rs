//! # Synchronizer
//!
//! Replays queued envelopes against the remote service, one at a time and in
//! insertion order.
//!
//! ## Outcome per envelope
//!
//! - **Confirmed**: the server accepted it; it is removed (or flagged synced in
//!   audit mode) and never submitted again
//! - **Connectivity failure**: left in the queue unchanged for the next pass
//! - **Rejected**: moved to the dead-letter store; retrying cannot succeed
//!
//! A failure never aborts the batch. Only one pass runs at a time; a call made
//! while a pass is in flight returns `SyncOutcome::AlreadyRunning`.

use crate::client::offline::dead_letter::{DeadLetterStore, RejectedEnvelope};
use crate::client::offline::photos::PhotoStore;
use crate::client::offline::queue::QueueStore;
use crate::client::remote::{RemoteError, RemoteRequest, RemoteService};
use crate::shared::{ActionEnvelope, ActionPayload};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Counters for one pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Envelopes the server confirmed
    pub succeeded: usize,
    /// Envelopes not confirmed, rejected ones included
    pub failed: usize,
    /// Envelopes moved to the dead-letter store
    pub rejected: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed(SyncReport),
    /// Another pass was in flight; nothing was done
    AlreadyRunning,
}

impl SyncOutcome {
    pub fn report(&self) -> Option<&SyncReport> {
        match self {
            SyncOutcome::Completed(report) => Some(report),
            SyncOutcome::AlreadyRunning => None,
        }
    }
}

enum ReplayFailure {
    Connectivity(String),
    Rejected { status: Option<u16>, body: Value },
}

/// Clears the in-flight flag when a pass ends, however it ends
struct PassGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> PassGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct Synchronizer {
    queue: Arc<QueueStore>,
    photos: Arc<PhotoStore>,
    dead_letters: Arc<DeadLetterStore>,
    remote: Arc<dyn RemoteService>,
    retain_synced: bool,
    in_flight: AtomicBool,
    last_report: RwLock<Option<SyncReport>>,
}

impl Synchronizer {
    pub fn new(
        queue: Arc<QueueStore>,
        photos: Arc<PhotoStore>,
        dead_letters: Arc<DeadLetterStore>,
        remote: Arc<dyn RemoteService>,
    ) -> Self {
        Self {
            queue,
            photos,
            dead_letters,
            remote,
            retain_synced: false,
            in_flight: AtomicBool::new(false),
            last_report: RwLock::new(None),
        }
    }

    /// Keep confirmed envelopes, flagged synced, instead of removing them
    pub fn retain_synced(mut self, retain: bool) -> Self {
        self.retain_synced = retain;
        self
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn last_report(&self) -> Option<SyncReport> {
        self.last_report.read().await.clone()
    }

    /// Run one replay pass over the pending envelopes.
    pub async fn sync(&self) -> SyncOutcome {
        let Some(_guard) = PassGuard::acquire(&self.in_flight) else {
            tracing::debug!("sync already in flight, skipping");
            return SyncOutcome::AlreadyRunning;
        };

        let started_at = Utc::now();
        let pending = self.queue.pending().await;
        tracing::info!(pending = pending.len(), "sync pass started");

        let mut confirmed = HashSet::new();
        let mut delivered_photos = Vec::new();
        let mut rejected = Vec::new();
        let mut failed = 0;

        for envelope in pending {
            match self.replay(&envelope).await {
                Ok(()) => {
                    tracing::debug!(envelope_id = %envelope.id, kind = ?envelope.kind(), "envelope confirmed");
                    if self.confirm(&envelope).await {
                        delivered_photos.extend(envelope.photo_filename().map(str::to_string));
                    }
                    confirmed.insert(envelope.id);
                }
                Err(ReplayFailure::Connectivity(message)) => {
                    tracing::warn!(
                        envelope_id = %envelope.id,
                        error = %message,
                        "envelope not delivered, keeping it queued"
                    );
                    failed += 1;
                }
                Err(ReplayFailure::Rejected { status, body }) => {
                    tracing::warn!(
                        envelope_id = %envelope.id,
                        status = ?status,
                        "envelope rejected, moving it to the rejected queue"
                    );
                    failed += 1;
                    rejected.push(RejectedEnvelope::new(envelope, status, body));
                }
            }
        }

        let rejected_count = rejected.len();
        let mut removed: HashSet<Uuid> = rejected.iter().map(|r| r.envelope.id).collect();
        self.dead_letters.record(rejected).await;

        if !self.retain_synced {
            removed.extend(confirmed.iter().copied());
        }
        self.queue.drop_confirmed(&removed).await;

        // Only once the queue no longer replays their envelopes
        for filename in &delivered_photos {
            self.photos.remove(filename).await;
        }

        let report = SyncReport {
            succeeded: confirmed.len(),
            failed,
            rejected: rejected_count,
            started_at,
            finished_at: Utc::now(),
        };

        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed,
            rejected = report.rejected,
            "sync pass finished"
        );

        *self.last_report.write().await = Some(report.clone());
        SyncOutcome::Completed(report)
    }

    /// Record a confirmed envelope. False when it will be replayed again.
    async fn confirm(&self, envelope: &ActionEnvelope) -> bool {
        if !self.retain_synced {
            return true;
        }
        match self.queue.mark_synced(&envelope.id).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(envelope_id = %envelope.id, error = %e, "could not flag envelope synced");
                false
            }
        }
    }

    async fn replay(&self, envelope: &ActionEnvelope) -> Result<(), ReplayFailure> {
        let request = self.to_request(envelope).await?;

        match self.remote.execute(&request, envelope.id).await {
            Ok(_) => Ok(()),
            Err(RemoteError::Connectivity { message }) => Err(ReplayFailure::Connectivity(message)),
            Err(RemoteError::Application { status, body }) => Err(ReplayFailure::Rejected {
                status: Some(status),
                body,
            }),
            Err(RemoteError::InvalidRequest { message }) => Err(ReplayFailure::Rejected {
                status: None,
                body: json!({ "error": message }),
            }),
        }
    }

    async fn to_request(&self, envelope: &ActionEnvelope) -> Result<RemoteRequest, ReplayFailure> {
        let request = match &envelope.payload {
            ActionPayload::UserRegistration(user) => RemoteRequest::RegisterUser(user.clone()),
            ActionPayload::AttendanceRecord(record) => {
                RemoteRequest::SubmitAttendance(record.clone())
            }
            ActionPayload::AttendancePhoto { filename, location } => {
                let photo = self.photos.get(filename).await.ok_or_else(|| {
                    ReplayFailure::Rejected {
                        status: None,
                        body: json!({ "error": format!("photo {filename} is missing") }),
                    }
                })?;
                RemoteRequest::UploadPhoto {
                    filename: filename.clone(),
                    photo,
                    location: location.clone(),
                }
            }
            ActionPayload::GenericHttp { .. } => RemoteRequest::SyncEnvelope(envelope.clone()),
        };
        Ok(request)
    }
}

impl std::fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synchronizer")
            .field("retain_synced", &self.retain_synced)
            .field("in_flight", &self.is_running())
            .finish_non_exhaustive()
    }
}
