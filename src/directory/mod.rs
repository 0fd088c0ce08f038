//! Identity and directory facts.
//!
//! The engine never looks users or roles up itself; it asks a [`Directory`]
//! for the facts it needs (existence, account and membership dates, roles,
//! badges, manager status) within the acting scope.

use crate::raffle::{Badge, RoleId, ScopeId, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use thiserror::Error;

pub mod roster;

pub use roster::{MemberRecord, Roster};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("failed to read roster: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse roster: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeInfo {
    pub id: ScopeId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleInfo {
    pub id: RoleId,
    pub name: String,
}

/// Platform-wide facts about a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub badges: HashSet<Badge>,
}

/// A user's membership in one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub user: UserProfile,
    pub nick: Option<String>,
    pub joined_at: DateTime<Utc>,
    pub roles: HashSet<RoleId>,
    /// May manage any raffle in the scope.
    pub manager: bool,
}

impl MemberInfo {
    pub fn display_name(&self) -> &str {
        self.nick.as_deref().unwrap_or(&self.user.name)
    }
}

#[async_trait]
pub trait Directory: Send + Sync {
    async fn scope(&self, scope: ScopeId) -> Result<Option<ScopeInfo>, DirectoryError>;

    async fn role(&self, scope: ScopeId, role: RoleId) -> Result<Option<RoleInfo>, DirectoryError>;

    async fn user(&self, user: UserId) -> Result<Option<UserProfile>, DirectoryError>;

    /// `None` when the user is not a member of `scope`.
    async fn member(&self, scope: ScopeId, user: UserId)
    -> Result<Option<MemberInfo>, DirectoryError>;
}
