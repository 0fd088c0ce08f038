//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::{Config, StoreBackend};
use crate::raffle::MAX_SUSPENSE_SECS;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.name is required")]
    MissingServerName,
    #[error("listen.address is not a socket address: {0}")]
    InvalidListenAddress(String),
    #[error("listen.notice_capacity must be positive")]
    ZeroNoticeCapacity,
    #[error("store.path parent directory does not exist: {0}")]
    StorePathInvalid(String),
    #[error("directory.roster does not exist: {0}")]
    RosterNotFound(String),
    #[error("raffle.default_suspense_secs must be at most {max}, got {got}")]
    SuspenseTooLong { max: i64, got: u64 },
    #[error("raffle.mention_format must contain {{id}}")]
    MentionFormatWithoutId,
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.name.is_empty() {
        errors.push(ValidationError::MissingServerName);
    }

    if config.listen.address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidListenAddress(
            config.listen.address.clone(),
        ));
    }
    if config.listen.notice_capacity == 0 {
        errors.push(ValidationError::ZeroNoticeCapacity);
    }

    if config.store.backend == StoreBackend::Redb {
        let path = Path::new(&config.store.path);
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            errors.push(ValidationError::StorePathInvalid(config.store.path.clone()));
        }
    }

    if let Some(ref roster) = config.directory.roster
        && !Path::new(roster).exists()
    {
        errors.push(ValidationError::RosterNotFound(roster.clone()));
    }

    let suspense = config.raffle.default_suspense_secs;
    if suspense > MAX_SUSPENSE_SECS as u64 {
        errors.push(ValidationError::SuspenseTooLong {
            max: MAX_SUSPENSE_SECS,
            got: suspense,
        });
    }

    if !config.raffle.mention_format.contains("{id}") {
        errors.push(ValidationError::MentionFormatWithoutId);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
