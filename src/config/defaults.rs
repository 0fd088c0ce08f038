//! Default value functions for configuration.

use chrono::{DateTime, TimeZone, Utc};

// =============================================================================
// Server Defaults
// =============================================================================

pub fn default_server_name() -> String {
    "raffled".to_string()
}

pub fn default_listen_address() -> String {
    "127.0.0.1:7070".to_string()
}

// =============================================================================
// Store Defaults
// =============================================================================

pub fn default_store_path() -> String {
    "raffles.redb".to_string()
}

// =============================================================================
// Raffle Defaults
// =============================================================================

pub fn default_suspense_secs() -> u64 {
    2
}

/// The platform launched in 2015; no account is older.
pub fn default_platform_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

pub fn default_mention_format() -> String {
    "<@{id}>".to_string()
}

pub fn default_notice_capacity() -> usize {
    256
}
