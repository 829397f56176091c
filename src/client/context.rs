//! Application context
//!
//! Owns one instance of every offline component and hands out shared
//! references. There is exactly one `Synchronizer` per context, so every
//! trigger (reconnect, timer, manual) goes through the same in-flight guard.

use crate::client::actions::AttendanceActions;
use crate::client::config::Config;
use crate::client::local_db::{self, LocalDatabase};
use crate::client::offline::{
    DeadLetterStore, PhotoStore, QueueStore, RequestGateway, SnapshotCache,
};
use crate::client::remote::RemoteService;
use crate::client::sync::{ConnectivityMonitor, SyncConfig, SyncService, Synchronizer};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AppContext {
    config: Config,
    db: Arc<LocalDatabase>,
    monitor: Arc<ConnectivityMonitor>,
    queue: Arc<QueueStore>,
    photos: Arc<PhotoStore>,
    snapshots: SnapshotCache,
    dead_letters: Arc<DeadLetterStore>,
    synchronizer: Arc<Synchronizer>,
    gateway: RequestGateway,
}

impl AppContext {
    /// Open the database at the configured path and wire everything up
    pub async fn open(
        config: Config,
        remote: Arc<dyn RemoteService>,
        initially_online: bool,
    ) -> local_db::Result<Self> {
        let db = LocalDatabase::open(config.database_path()).await?;
        Ok(Self::with_database(config, Arc::new(db), remote, initially_online).await)
    }

    /// Wire everything up on an already open database
    pub async fn with_database(
        config: Config,
        db: Arc<LocalDatabase>,
        remote: Arc<dyn RemoteService>,
        initially_online: bool,
    ) -> Self {
        let monitor = Arc::new(ConnectivityMonitor::new(initially_online));
        let queue = Arc::new(QueueStore::load(Arc::clone(&db)).await);
        let photos = Arc::new(PhotoStore::new(Arc::clone(&db)));
        let dead_letters = Arc::new(DeadLetterStore::load(Arc::clone(&db)).await);
        let snapshots = SnapshotCache::new(Arc::clone(&db));

        let synchronizer = Arc::new(
            Synchronizer::new(
                Arc::clone(&queue),
                Arc::clone(&photos),
                Arc::clone(&dead_letters),
                Arc::clone(&remote),
            )
            .retain_synced(config.retain_synced()),
        );

        let gateway = RequestGateway::new(
            Arc::clone(&monitor),
            remote,
            Arc::clone(&queue),
            Arc::clone(&photos),
        );

        tracing::info!(
            online = initially_online,
            pending = queue.pending_len().await,
            "application context ready"
        );

        Self {
            config,
            db,
            monitor,
            queue,
            photos,
            snapshots,
            dead_letters,
            synchronizer,
            gateway,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn database(&self) -> &Arc<LocalDatabase> {
        &self.db
    }

    pub fn monitor(&self) -> &Arc<ConnectivityMonitor> {
        &self.monitor
    }

    pub fn queue(&self) -> &Arc<QueueStore> {
        &self.queue
    }

    pub fn photos(&self) -> &Arc<PhotoStore> {
        &self.photos
    }

    pub fn snapshots(&self) -> &SnapshotCache {
        &self.snapshots
    }

    pub fn dead_letters(&self) -> &Arc<DeadLetterStore> {
        &self.dead_letters
    }

    pub fn synchronizer(&self) -> &Arc<Synchronizer> {
        &self.synchronizer
    }

    pub fn gateway(&self) -> &RequestGateway {
        &self.gateway
    }

    pub fn actions(&self) -> AttendanceActions {
        AttendanceActions::new(self.gateway.clone(), self.snapshots.clone())
    }

    /// Background sync service sharing this context's synchronizer
    pub fn sync_service(&self) -> SyncService {
        SyncService::new(
            SyncConfig::from(&self.config),
            Arc::clone(&self.monitor),
            Arc::clone(&self.synchronizer),
            Arc::clone(&self.queue),
            Arc::clone(&self.dead_letters),
        )
    }
}
