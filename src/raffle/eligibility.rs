//! Join eligibility.
//!
//! [`check_entry`] runs the ordered predicate battery against a prospective
//! entrant and the raffle's current state, stopping at the first failure.

use super::checks::{Badge, has_badge, meets_age};
use super::{RaffleDefinition, RoleId, UserId};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;

/// Facts about a prospective entrant, gathered from the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrantFacts {
    pub user_id: UserId,
    pub account_created_at: DateTime<Utc>,
    /// `None` when the user is not a member of the raffle's scope.
    pub joined_scope_at: Option<DateTime<Utc>>,
    pub roles: HashSet<RoleId>,
    pub badges: HashSet<Badge>,
}

/// Why an entrant was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialKind {
    AlreadyEntered,
    Prevented,
    NotAllowlisted,
    OwnRaffle,
    RaffleFull,
    MissingRole(RoleId),
    AccountTooYoung { required_days: u32 },
    MembershipTooRecent { required_days: u32 },
    MissingBadge(Badge),
}

impl DenialKind {
    /// Static code for metrics labeling and wire replies.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyEntered => "already_entered",
            Self::Prevented => "prevented",
            Self::NotAllowlisted => "not_allowlisted",
            Self::OwnRaffle => "own_raffle",
            Self::RaffleFull => "raffle_full",
            Self::MissingRole(_) => "missing_role",
            Self::AccountTooYoung { .. } => "account_too_young",
            Self::MembershipTooRecent { .. } => "membership_too_recent",
            Self::MissingBadge(_) => "missing_badge",
        }
    }
}

/// A denial with its user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub kind: DenialKind,
    pub message: String,
}

impl Denial {
    /// Build the message for `kind`. `role_name` is how the caller displays
    /// the missing role (a mention or name); the id is used without it.
    pub fn new(kind: DenialKind, role_name: Option<&str>) -> Self {
        let message = match kind {
            DenialKind::AlreadyEntered => "You are already in this raffle.".to_string(),
            DenialKind::Prevented | DenialKind::NotAllowlisted => {
                "You are not allowed to join this particular raffle.".to_string()
            }
            DenialKind::OwnRaffle => "You cannot join your own raffle.".to_string(),
            DenialKind::RaffleFull => {
                "Sorry, the maximum number of users have entered this raffle.".to_string()
            }
            DenialKind::MissingRole(role) => match role_name {
                Some(name) => format!("You are missing a required role: {}", name),
                None => format!("You are missing a required role: {}", role),
            },
            DenialKind::AccountTooYoung { required_days } => format!(
                "Your account must be at least {} days old to join.",
                required_days
            ),
            DenialKind::MembershipTooRecent { required_days } => format!(
                "You must have been in this server for at least {} days to join.",
                required_days
            ),
            DenialKind::MissingBadge(badge) => format!(
                "You must have the \"{}\" badge to join.",
                badge.display_name()
            ),
        };
        Self { kind, message }
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of the eligibility battery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Admitted,
    Denied(DenialKind),
}

/// Run the eligibility battery, in order, stopping at the first failure.
pub fn check_entry(
    entrant: &EntrantFacts,
    raffle: &RaffleDefinition,
    now: DateTime<Utc>,
) -> Eligibility {
    let user = entrant.user_id;

    // 1. Already entered
    if raffle.has_entrant(user) {
        return Eligibility::Denied(DenialKind::AlreadyEntered);
    }

    // 2. Deny list
    if raffle.prevented_users.contains(&user) {
        return Eligibility::Denied(DenialKind::Prevented);
    }

    // 3. Allow list, enforced independently of the deny list
    if !raffle.allowed_users.is_empty() && !raffle.allowed_users.contains(&user) {
        return Eligibility::Denied(DenialKind::NotAllowlisted);
    }

    // 4. Owner
    if user == raffle.owner {
        return Eligibility::Denied(DenialKind::OwnRaffle);
    }

    // 5. Capacity. Strict `>` against the pre-admission count: one entrant
    // past the cap is admitted before denials start.
    if let Some(max) = raffle.maximum_entries
        && raffle.entries.len() > max as usize
    {
        return Eligibility::Denied(DenialKind::RaffleFull);
    }

    // 6. Roles, first unmet in list order
    if let Some(role) = raffle
        .roles_needed_to_enter
        .iter()
        .find(|r| !entrant.roles.contains(*r))
    {
        return Eligibility::Denied(DenialKind::MissingRole(*role));
    }

    // 7. Account age
    if let Some(days) = raffle.account_age
        && !meets_age(entrant.account_created_at, days, now)
    {
        return Eligibility::Denied(DenialKind::AccountTooYoung {
            required_days: days,
        });
    }

    // 8. Membership age
    if let Some(days) = raffle.server_join_age {
        let old_enough = entrant
            .joined_scope_at
            .is_some_and(|joined| meets_age(joined, days, now));
        if !old_enough {
            return Eligibility::Denied(DenialKind::MembershipTooRecent {
                required_days: days,
            });
        }
    }

    // 9. Badges, first unmet in list order
    if let Some(badge) = raffle
        .badges_needed_to_enter
        .iter()
        .find(|b| !has_badge(**b, &entrant.badges))
    {
        return Eligibility::Denied(DenialKind::MissingBadge(*badge));
    }

    Eligibility::Admitted
}
