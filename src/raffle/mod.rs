//! Raffle definitions and the pure logic that operates on them.
//!
//! - [`checks`]: date-arithmetic condition checkers and the badge vocabulary
//! - [`schema`]: the field descriptor table and definition validator
//! - [`safety`]: placeholder scanning and safe message substitution
//! - [`eligibility`]: the ordered join-eligibility battery
//! - [`lifecycle`]: draw dispositions and entrant-list mutation
//! - [`random`]: the random source behind winner and message picks

pub mod checks;
pub mod eligibility;
pub mod lifecycle;
pub mod random;
pub mod safety;
pub mod schema;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use checks::Badge;
pub use eligibility::{Denial, DenialKind, Eligibility, EntrantFacts, check_entry};
pub use lifecycle::RaffleState;
pub use random::{RandomSource, SeededRandom, ThreadRandom, choose};
pub use safety::SafeMember;
pub use schema::{
    EntityCategory, EntityResolver, ResolvedEntities, ValidationContext, ValidationError, validate,
};

pub type ScopeId = u64;
pub type UserId = u64;
pub type RoleId = u64;
pub type ChannelId = u64;
pub type MessageId = u64;

/// Maximum raffle name length, in characters.
pub const MAX_NAME_LEN: usize = 25;

/// Upper bound (inclusive) for `suspense_timer`, in seconds.
pub const MAX_SUSPENSE_SECS: i64 = 10;

/// How a raffle is entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RaffleType {
    Command,
    Reaction,
}

impl fmt::Display for RaffleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command => f.write_str("command"),
            Self::Reaction => f.write_str("reaction"),
        }
    }
}

/// Mode metadata. Reaction raffles are bound to the message users react on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExternalSettings {
    Command,
    Reaction {
        channel_id: ChannelId,
        message_id: MessageId,
    },
}

impl ExternalSettings {
    pub fn raffle_type(&self) -> RaffleType {
        match self {
            Self::Command => RaffleType::Command,
            Self::Reaction { .. } => RaffleType::Reaction,
        }
    }

    pub fn message_id(&self) -> Option<MessageId> {
        match self {
            Self::Command => None,
            Self::Reaction { message_id, .. } => Some(*message_id),
        }
    }
}

/// What happens to the entrant list after a winner is drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndAction {
    End,
    RemoveWinner,
    RemoveAndPreventWinner,
    #[default]
    KeepWinner,
}

impl EndAction {
    pub const ALL: [EndAction; 4] = [
        Self::End,
        Self::RemoveWinner,
        Self::RemoveAndPreventWinner,
        Self::KeepWinner,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::End => "end",
            Self::RemoveWinner => "remove_winner",
            Self::RemoveAndPreventWinner => "remove_and_prevent_winner",
            Self::KeepWinner => "keep_winner",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == s)
    }
}

impl fmt::Display for EndAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message template, or a pool of them with one picked at random per use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessagePool {
    One(String),
    Many(Vec<String>),
}

impl MessagePool {
    pub fn pick<'a>(&'a self, rng: &dyn RandomSource) -> Option<&'a str> {
        match self {
            Self::One(s) => Some(s.as_str()),
            Self::Many(list) => choose(rng, list).map(String::as_str),
        }
    }

    pub fn templates(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match self {
            Self::One(s) => std::slice::from_ref(s),
            Self::Many(list) => list,
        };
        slice.iter().map(String::as_str)
    }
}

/// A validated raffle, as persisted in the store.
///
/// Only `entries` (and `prevented_users`, via the remove-and-prevent
/// disposition) change after validation; everything else changes only by
/// an explicit edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaffleDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub owner: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_join_age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_entries: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles_needed_to_enter: Vec<RoleId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub badges_needed_to_enter: Vec<Badge>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prevented_users: Vec<UserId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_users: Vec<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_message: Option<MessagePool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_message: Option<MessagePool>,
    #[serde(default)]
    pub on_end_action: EndAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspense_timer: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reaction_emoji: Option<String>,
    pub external_settings: ExternalSettings,
    #[serde(default)]
    pub entries: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

impl RaffleDefinition {
    /// An empty definition owned by `owner`, ready for the validator to fill.
    pub fn blank(
        owner: UserId,
        external_settings: ExternalSettings,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: String::new(),
            description: None,
            owner,
            account_age: None,
            server_join_age: None,
            maximum_entries: None,
            roles_needed_to_enter: Vec::new(),
            badges_needed_to_enter: Vec::new(),
            prevented_users: Vec::new(),
            allowed_users: Vec::new(),
            join_message: None,
            end_message: None,
            on_end_action: EndAction::default(),
            suspense_timer: None,
            reaction_emoji: None,
            external_settings,
            entries: Vec::new(),
            created_at,
        }
    }

    pub fn raffle_type(&self) -> RaffleType {
        self.external_settings.raffle_type()
    }

    pub fn has_entrant(&self, user: UserId) -> bool {
        self.entries.contains(&user)
    }

    /// Whether a reaction event on `message_id` with `emoji` targets this raffle.
    pub fn matches_reaction(&self, message_id: MessageId, emoji: &str) -> bool {
        self.external_settings.message_id() == Some(message_id)
            && self.reaction_emoji.as_deref() == Some(emoji)
    }
}

/// Truncate a description for list display.
pub fn shorten_description(description: &str, length: usize) -> String {
    if description.chars().count() > length {
        let head: String = description.chars().take(length).collect();
        format!("{}...", head.trim_end())
    } else {
        description.to_string()
    }
}

/// Join items the way a person would: "a", "a and b", "a, b, and c".
pub fn humanize_list(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [one] => one.clone(),
        [a, b] => format!("{} and {}", a, b),
        [rest @ .., last] => format!("{}, and {}", rest.join(", "), last),
    }
}
