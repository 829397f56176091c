//! Schema versions for the local store

/// Current database schema version
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Schema migration versions
pub const MIGRATION_VERSIONS: &[i32] = &[1];

/// Versions newer than `current_version`, oldest first
pub fn get_pending_migrations(current_version: i64) -> Vec<i32> {
    MIGRATION_VERSIONS
        .iter()
        .filter(|&&v| i64::from(v) > current_version)
        .cloned()
        .collect()
}
