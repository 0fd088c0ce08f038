//! TOML-backed directory.
//!
//! A roster file lists users and scopes (with their roles and members).
//! The loaded roster can be changed at runtime, which is how tests and the
//! gateway simulate members joining or leaving.
//!
//! ```toml
//! [[users]]
//! id = 10
//! name = "alice"
//! created_at = "2019-05-01T00:00:00Z"
//! badges = ["early_supporter"]
//!
//! [[scopes]]
//! id = 1
//! name = "Lobby"
//! created_at = "2018-01-01T00:00:00Z"
//! managers = [2]
//! roles = [{ id = 100, name = "VIP" }]
//! members = [{ user = 10, joined_at = "2020-01-01T00:00:00Z", roles = [100] }]
//! ```

use super::{Directory, DirectoryError, MemberInfo, RoleInfo, ScopeInfo, UserProfile};
use crate::dashmap_ext::DashMapExt;
use crate::raffle::{Badge, RoleId, ScopeId, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RosterFile {
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub scopes: Vec<ScopeRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub badges: Vec<Badge>,
    /// Whether direct messages reach this user.
    #[serde(default = "default_true")]
    pub accepts_dms: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScopeRecord {
    pub id: ScopeId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub managers: Vec<UserId>,
    #[serde(default)]
    pub roles: Vec<RoleRecord>,
    #[serde(default)]
    pub members: Vec<MemberRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleRecord {
    pub id: RoleId,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemberRecord {
    pub user: UserId,
    pub joined_at: DateTime<Utc>,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<RoleId>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone)]
struct ScopeEntry {
    info: ScopeInfo,
    managers: HashSet<UserId>,
    roles: HashMap<RoleId, RoleInfo>,
    members: HashMap<UserId, MemberRecord>,
}

#[derive(Default)]
pub struct Roster {
    users: DashMap<UserId, UserRecord>,
    scopes: DashMap<ScopeId, ScopeEntry>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let content = std::fs::read_to_string(path)?;
        let roster = Self::from_toml(&content)?;
        info!(
            users = roster.users.len(),
            scopes = roster.scopes.len(),
            "Roster loaded"
        );
        Ok(roster)
    }

    pub fn from_toml(content: &str) -> Result<Self, DirectoryError> {
        let file: RosterFile = toml::from_str(content)?;
        Ok(Self::from_file(file))
    }

    pub fn from_file(file: RosterFile) -> Self {
        let roster = Self::new();
        for user in file.users {
            roster.upsert_user(user);
        }
        for scope in file.scopes {
            roster.upsert_scope(scope);
        }
        roster
    }

    pub fn upsert_user(&self, user: UserRecord) {
        self.users.insert(user.id, user);
    }

    pub fn upsert_scope(&self, scope: ScopeRecord) {
        let entry = ScopeEntry {
            info: ScopeInfo {
                id: scope.id,
                name: scope.name,
                created_at: scope.created_at,
            },
            managers: scope.managers.into_iter().collect(),
            roles: scope
                .roles
                .into_iter()
                .map(|r| {
                    (
                        r.id,
                        RoleInfo {
                            id: r.id,
                            name: r.name,
                        },
                    )
                })
                .collect(),
            members: scope.members.into_iter().map(|m| (m.user, m)).collect(),
        };
        self.scopes.insert(entry.info.id, entry);
    }

    /// Add or replace a membership. Returns false for an unknown scope.
    pub fn add_member(&self, scope: ScopeId, member: MemberRecord) -> bool {
        match self.scopes.get_mut(&scope) {
            Some(mut entry) => {
                entry.members.insert(member.user, member);
                true
            }
            None => false,
        }
    }

    /// Returns whether the user was a member.
    pub fn remove_member(&self, scope: ScopeId, user: UserId) -> bool {
        self.scopes
            .get_mut(&scope)
            .is_some_and(|mut entry| entry.members.remove(&user).is_some())
    }

    /// Users whose direct messages cannot be delivered.
    pub fn users_refusing_dms(&self) -> Vec<UserId> {
        self.users
            .values_cloned_where(|_, u| !u.accepts_dms)
            .into_iter()
            .map(|u| u.id)
            .collect()
    }

    fn profile(record: &UserRecord) -> UserProfile {
        UserProfile {
            id: record.id,
            name: record.name.clone(),
            created_at: record.created_at,
            badges: record.badges.iter().copied().collect(),
        }
    }
}

#[async_trait]
impl Directory for Roster {
    async fn scope(&self, scope: ScopeId) -> Result<Option<ScopeInfo>, DirectoryError> {
        Ok(self.scopes.get(&scope).map(|e| e.info.clone()))
    }

    async fn role(&self, scope: ScopeId, role: RoleId) -> Result<Option<RoleInfo>, DirectoryError> {
        Ok(self
            .scopes
            .get(&scope)
            .and_then(|e| e.roles.get(&role).cloned()))
    }

    async fn user(&self, user: UserId) -> Result<Option<UserProfile>, DirectoryError> {
        Ok(self.users.get_cloned(&user).map(|u| Self::profile(&u)))
    }

    async fn member(
        &self,
        scope: ScopeId,
        user: UserId,
    ) -> Result<Option<MemberInfo>, DirectoryError> {
        let Some(profile) = self.users.get_cloned(&user) else {
            return Ok(None);
        };
        let Some((record, manager)) = self.scopes.get(&scope).and_then(|e| {
            e.members
                .get(&user)
                .cloned()
                .map(|m| (m, e.managers.contains(&user)))
        }) else {
            return Ok(None);
        };
        Ok(Some(MemberInfo {
            user: Self::profile(&profile),
            nick: record.nick,
            joined_at: record.joined_at,
            roles: record.roles.into_iter().collect(),
            manager,
        }))
    }
}
