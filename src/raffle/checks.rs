//! Condition checkers.
//!
//! Pure predicates over primitive facts: day counts measured against a
//! reference date, and badge possession.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Profile badges a raffle can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Badge {
    Staff,
    Partner,
    Hypesquad,
    BugHunter,
    #[serde(rename = "bug_hunter_level_2")]
    BugHunterLevel2,
    HypesquadBravery,
    HypesquadBrilliance,
    HypesquadBalance,
    EarlySupporter,
    VerifiedBotDeveloper,
    DiscordCertifiedModerator,
    ActiveDeveloper,
}

impl Badge {
    pub const ALL: [Badge; 12] = [
        Self::Staff,
        Self::Partner,
        Self::Hypesquad,
        Self::BugHunter,
        Self::BugHunterLevel2,
        Self::HypesquadBravery,
        Self::HypesquadBrilliance,
        Self::HypesquadBalance,
        Self::EarlySupporter,
        Self::VerifiedBotDeveloper,
        Self::DiscordCertifiedModerator,
        Self::ActiveDeveloper,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staff => "staff",
            Self::Partner => "partner",
            Self::Hypesquad => "hypesquad",
            Self::BugHunter => "bug_hunter",
            Self::BugHunterLevel2 => "bug_hunter_level_2",
            Self::HypesquadBravery => "hypesquad_bravery",
            Self::HypesquadBrilliance => "hypesquad_brilliance",
            Self::HypesquadBalance => "hypesquad_balance",
            Self::EarlySupporter => "early_supporter",
            Self::VerifiedBotDeveloper => "verified_bot_developer",
            Self::DiscordCertifiedModerator => "discord_certified_moderator",
            Self::ActiveDeveloper => "active_developer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.as_str() == s)
    }

    /// Human-readable form, e.g. `Hypesquad Bravery`.
    pub fn display_name(&self) -> String {
        format_underscored_text(self.as_str())
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `bug_hunter_level_2` -> `Bug Hunter Level 2`.
pub fn format_underscored_text(text: &str) -> String {
    text.split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Whole days elapsed from `since` to `now` (zero if `since` is in the future).
pub fn days_since(since: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - since).num_days().max(0)
}

/// A required account age is only meaningful if accounts that old can exist.
/// Zero imposes no requirement and always passes.
pub fn account_age_checker(
    days: u32,
    platform_epoch: DateTime<Utc>,
    now: DateTime<Utc>,
) -> bool {
    days == 0 || i64::from(days) < days_since(platform_epoch, now)
}

/// A required membership age is only meaningful if the scope is that old.
pub fn server_join_age_checker(
    days: u32,
    scope_created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> bool {
    days == 0 || i64::from(days) < days_since(scope_created_at, now)
}

/// Whether something that happened at `at` is at least `days` old.
pub fn meets_age(at: DateTime<Utc>, days: u32, now: DateTime<Utc>) -> bool {
    days_since(at, now) >= i64::from(days)
}

pub fn has_badge(badge: Badge, badges: &HashSet<Badge>) -> bool {
    badges.contains(&badge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_badge_names() {
        for badge in Badge::ALL {
            assert_eq!(Badge::parse(badge.as_str()), Some(badge));
        }
        assert_eq!(Badge::parse("nitro"), None);
        assert_eq!(Badge::HypesquadBravery.display_name(), "Hypesquad Bravery");
        assert_eq!(Badge::BugHunterLevel2.display_name(), "Bug Hunter Level 2");
    }

    #[test]
    fn test_badge_serde_matches_as_str() {
        let json = serde_json::to_string(&Badge::EarlySupporter).unwrap();
        assert_eq!(json, "\"early_supporter\"");
    }

    #[test]
    fn test_format_underscored_text() {
        assert_eq!(format_underscored_text("early_supporter"), "Early Supporter");
        assert_eq!(format_underscored_text("staff"), "Staff");
        assert_eq!(format_underscored_text("a__b"), "A B");
    }

    #[test]
    fn test_account_age_checker_bounds() {
        let epoch = now() - Duration::days(100);
        assert!(account_age_checker(0, epoch, now()));
        assert!(account_age_checker(99, epoch, now()));
        assert!(!account_age_checker(100, epoch, now()));
        assert!(!account_age_checker(5000, epoch, now()));
    }

    #[test]
    fn test_server_join_age_checker_bounds() {
        let created = now() - Duration::days(10);
        assert!(server_join_age_checker(9, created, now()));
        assert!(!server_join_age_checker(10, created, now()));
    }

    #[test]
    fn test_zero_days_passes_on_fresh_scope() {
        let created = now() - Duration::hours(3);
        assert!(server_join_age_checker(0, created, now()));
        assert!(!server_join_age_checker(1, created, now()));
        assert!(account_age_checker(0, now(), now()));
        assert!(account_age_checker(0, now() + Duration::days(1), now()));
    }

    #[test]
    fn test_meets_age() {
        let joined = now() - Duration::days(7) - Duration::hours(3);
        assert!(meets_age(joined, 7, now()));
        assert!(!meets_age(joined, 8, now()));
        assert!(meets_age(now() + Duration::days(1), 0, now()));
    }

    #[test]
    fn test_has_badge() {
        let badges: HashSet<Badge> = [Badge::Partner].into_iter().collect();
        assert!(has_badge(Badge::Partner, &badges));
        assert!(!has_badge(Badge::Staff, &badges));
    }
}
