//! Unified error handling for raffled.
//!
//! Engine errors ([`RaffleError`]) and gateway errors ([`HandlerError`]),
//! with reply generation and metric labeling. Validation and denial
//! outcomes are ordinary values; only store and directory failures are
//! fatal.

use crate::directory::DirectoryError;
use crate::handlers::Reply;
use crate::raffle::{ScopeId, UserId, ValidationError};
use crate::store::StoreError;
use thiserror::Error;

// ============================================================================
// Engine Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum RaffleError {
    #[error("There is not an ongoing raffle with the name \"{0}\".")]
    NotFound(String),

    #[error("A raffle with the name \"{0}\" already exists.")]
    AlreadyExists(String),

    #[error("{0}")]
    Invalid(#[from] ValidationError),

    #[error("User {0} could not be found.")]
    UnknownEntrant(UserId),

    #[error("Scope {0} could not be found.")]
    UnknownScope(ScopeId),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("directory error: {0}")]
    Directory(#[from] DirectoryError),
}

impl RaffleError {
    /// Collaborator failures the engine cannot recover from.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Directory(_))
    }

    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::AlreadyExists(_) => "already_exists",
            Self::Invalid(e) => e.error_code(),
            Self::UnknownEntrant(_) => "unknown_entrant",
            Self::UnknownScope(_) => "unknown_scope",
            Self::Store(_) => "store_error",
            Self::Directory(_) => "directory_error",
        }
    }
}

// ============================================================================
// Handler Errors (gateway command processing)
// ============================================================================

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("not enough parameters")]
    NeedMoreParams,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("You are not allowed to manage this raffle.")]
    NotPermitted,

    #[error("bad argument: {0}")]
    BadArgument(String),

    #[error(transparent)]
    Raffle(#[from] RaffleError),
}

impl HandlerError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NeedMoreParams => "need_more_params",
            Self::UnknownCommand(_) => "unknown_command",
            Self::NotPermitted => "not_permitted",
            Self::BadArgument(_) => "bad_argument",
            Self::Raffle(e) => e.error_code(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Raffle(e) if e.is_fatal())
    }

    /// Convert to an `ERR` reply line.
    ///
    /// Fatal errors get a generic reply so collaborator details stay in the log.
    pub fn to_reply(&self) -> Reply {
        if self.is_fatal() {
            return Reply::error("internal_error", "Something went wrong. Please try again later.");
        }
        Reply::error(self.error_code(), self.to_string())
    }
}

/// Result type for command handlers.
pub type HandlerResult = Result<Reply, HandlerError>;
