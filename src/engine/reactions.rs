//! Reaction-triggered entry.
//!
//! Reaction raffles are bound to a message and an emoji. Adding the
//! reaction joins, removing it leaves. Join results go to the user by DM,
//! or to the channel when the DM cannot be delivered. Admissions get a
//! fixed acknowledgement and denials are sent in lower case.

use super::{JoinOutcome, REACTION_ENTRY_MESSAGE, RaffleEngine, Removal};
use crate::error::RaffleError;
use crate::notify::Target;
use crate::raffle::{ChannelId, MessageId, RaffleType, ScopeId, UserId};
use tracing::{debug, warn};

/// Result of one reaction raffle's join attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEntry {
    pub raffle: String,
    pub outcome: JoinOutcome,
    /// Where the result was delivered, if anywhere.
    pub delivered_to: Option<Target>,
    /// The caller should take the reaction back off the message.
    pub retract: bool,
}

impl RaffleEngine {
    /// Join every reaction raffle in `scope` bound to `message` and `emoji`.
    pub async fn reaction_added(
        &self,
        scope: ScopeId,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
        user: UserId,
    ) -> Result<Vec<ReactionEntry>, RaffleError> {
        let mut results = Vec::new();
        for name in self.reaction_raffles(scope, message, emoji).await? {
            let outcome = match self.join_raffle(scope, &name, user).await {
                Ok(outcome) => outcome,
                // Ended between the lookup and the join.
                Err(RaffleError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };

            let text = match &outcome {
                JoinOutcome::Admitted { .. } => REACTION_ENTRY_MESSAGE.to_string(),
                JoinOutcome::Denied(denial) => denial.message.to_lowercase(),
            };
            let delivered_to = self.deliver_to_user(scope, channel, user, &text).await;
            let retract = matches!(outcome, JoinOutcome::Denied(_));

            results.push(ReactionEntry {
                raffle: name,
                outcome,
                delivered_to,
                retract,
            });
        }
        Ok(results)
    }

    /// Leave the first reaction raffle bound to `message` and `emoji`.
    /// Returns its name if the user was removed.
    pub async fn reaction_removed(
        &self,
        scope: ScopeId,
        message: MessageId,
        emoji: &str,
        user: UserId,
    ) -> Result<Option<String>, RaffleError> {
        let Some(name) = self
            .reaction_raffles(scope, message, emoji)
            .await?
            .into_iter()
            .next()
        else {
            return Ok(None);
        };

        match self.leave_raffle(scope, &name, user).await {
            Ok(Removal::Removed) => Ok(Some(name)),
            Ok(Removal::NotEntered) | Err(RaffleError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn reaction_raffles(
        &self,
        scope: ScopeId,
        message: MessageId,
        emoji: &str,
    ) -> Result<Vec<String>, RaffleError> {
        Ok(self
            .repo
            .all(scope)
            .await?
            .into_iter()
            .filter(|def| {
                def.raffle_type() == RaffleType::Reaction && def.matches_reaction(message, emoji)
            })
            .map(|def| def.name)
            .collect())
    }

    async fn deliver_to_user(
        &self,
        scope: ScopeId,
        channel: ChannelId,
        user: UserId,
        text: &str,
    ) -> Option<Target> {
        let dm = Target::User(user);
        match self.notifier.send(scope, dm, text).await {
            Ok(()) => return Some(dm),
            Err(e) => debug!(scope, user, error = %e, "DM failed, falling back to channel"),
        }

        let fallback = Target::Channel(channel);
        let text = format!("{}: {}", self.mention(user), text);
        match self.notifier.send(scope, fallback, &text).await {
            Ok(()) => Some(fallback),
            Err(e) => {
                warn!(scope, user, error = %e, "Reaction reply undeliverable");
                None
            }
        }
    }
}
