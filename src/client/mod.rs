//! Offline-first client
//!
//! Everything between a user action and the remote service.
//!
//! # Architecture
//!
//! - **`config`** - Configuration (server URL, database path, intervals)
//! - **`remote`** - HTTP client for the attendance service, typed errors
//! - **`local_db`** - Local SQLite database (key/value store, photos)
//! - **`offline`** - Queue store, photo store, request gateway, cached reads
//! - **`sync`** - Connectivity monitor, synchronizer, background sync service
//! - **`device`** - Cancellable geolocation and camera subscriptions
//! - **`context`** - Application context wiring the above together
//! - **`actions`** - User-level actions (register, attend, upload, list)
//!
//! # Module Structure
//!
//! ```text
//! client/
//! ├── mod.rs       - Module exports and documentation
//! ├── main.rs      - Headless sync agent (binary)
//! ├── config.rs    - Configuration management
//! ├── remote.rs    - Remote service client
//! ├── context.rs   - Application context
//! ├── actions.rs   - Attendance actions
//! ├── local_db/    - SQLite storage
//! ├── offline/     - Offline queueing and cached reads
//! ├── sync/        - Connectivity and synchronization
//! └── device/      - Device subscriptions
//! ```

pub mod actions;
pub mod config;
pub mod context;
pub mod device;
pub mod local_db;
pub mod offline;
pub mod remote;
pub mod sync;

// Re-export commonly used types
pub use actions::{ActionAck, AttendanceActions};
pub use config::Config;
pub use context::AppContext;
pub use offline::{GatewayError, GatewayOutcome, RequestGateway, Snapshot, SnapshotCache};
pub use remote::{HttpRemote, RemoteError, RemoteRequest, RemoteService};
pub use sync::{ConnectivityMonitor, SyncOutcome, SyncReport, SyncService, Synchronizer};
