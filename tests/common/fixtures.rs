//! Context and record fixtures

use attendance_sync::client::local_db::LocalDatabase;
use attendance_sync::client::{AppContext, Config};
use attendance_sync::shared::{AppConfig, AttendanceRecord, NewUser, PhotoBlob};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::mock_remote::ScriptedRemote;

/// Context on a fresh in-memory database
pub async fn memory_context(remote: Arc<ScriptedRemote>, online: bool) -> AppContext {
    context_with_config(remote, online, Config::new()).await
}

pub async fn context_with_config(
    remote: Arc<ScriptedRemote>,
    online: bool,
    config: Config,
) -> AppContext {
    let db = Arc::new(
        LocalDatabase::in_memory()
            .await
            .expect("in-memory database should open"),
    );
    AppContext::with_database(config, db, remote, online).await
}

/// Config keeping confirmed envelopes for audit
pub fn audit_config() -> Config {
    Config::with_builder(AppConfig::builder().retain_synced(true)).expect("valid config")
}

/// Config whose periodic pass never fires during a test
pub fn reconnect_only_config() -> Config {
    Config::with_builder(AppConfig::builder().sync_interval_secs(3600)).expect("valid config")
}

pub fn new_user(name: &str) -> NewUser {
    NewUser::new(name, format!("{}@example.com", name.to_lowercase()), "secret")
}

pub fn attendance(user: &str) -> AttendanceRecord {
    AttendanceRecord::now(user)
}

/// JPEG-looking bytes covering every byte value
pub fn sample_photo() -> PhotoBlob {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    bytes.extend((0..=255u8).cycle().take(4096));
    PhotoBlob::jpeg(bytes)
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn wait_until<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition().await
}
