//! The raffle engine.
//!
//! [`RaffleEngine`] is the operation surface the command layer calls:
//! create, edit, join, leave, kick, draw, end and the read-only queries.
//! It gathers facts from the [`Directory`], runs the pure checks in
//! [`crate::raffle`], and mutates raffles only through the
//! [`RaffleRepository`].

mod clock;
mod reactions;

pub use clock::{Clock, FixedClock, SystemClock};
pub use crate::raffle::{RandomSource, SeededRandom, ThreadRandom, choose};
pub use reactions::ReactionEntry;

use crate::directory::{Directory, ScopeInfo};
use crate::error::RaffleError;
use crate::metrics;
use crate::notify::{NotificationSink, Target};
use crate::raffle::lifecycle::{self, RaffleState};
use crate::raffle::safety::{self, Substitutions, TemplateKind};
use crate::raffle::schema::referenced_ids;
use crate::raffle::{
    ChannelId, Denial, Eligibility, EndAction, EntrantFacts, ExternalSettings, MessageId,
    RaffleDefinition, ResolvedEntities, SafeMember, ScopeId, UserId, ValidationContext,
    ValidationError, check_entry, shorten_description, humanize_list,
};
use crate::store::{RaffleKey, RaffleRepository, RaffleStore};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_END_MESSAGE: &str =
    "Congratulations {winner.mention}, you have won the {raffle} raffle!";
pub const PICKING_MESSAGE: &str = "Picking a winner from the pool...";
/// Sent to users admitted by reacting, in place of the command reply.
pub const REACTION_ENTRY_MESSAGE: &str = "You have been entered into the raffle!";
pub const DESCRIPTION_PREVIEW_LEN: usize = 50;

/// Engine-wide settings taken from `[raffle]` configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Suspense used when a raffle does not set `suspense_timer`.
    pub default_suspense: Duration,
    /// Earliest possible account creation date on the platform.
    pub platform_epoch: DateTime<Utc>,
    /// How a user is mentioned; `{id}` is replaced with the user id.
    pub mention_format: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_suspense: Duration::from_secs(2),
            platform_epoch: Utc
                .with_ymd_and_hms(2015, 1, 1, 0, 0, 0)
                .single()
                .unwrap_or_default(),
            mention_format: "<@{id}>".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    Admitted { message: String, entry_count: usize },
    Denied(Denial),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    NotEntered,
}

/// Why a draw was dropped after the suspense wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Abandoned {
    /// The raffle was ended or deleted during the wait.
    RaffleEnded,
    /// The winner left or was kicked during the wait.
    WinnerLeft,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawOutcome {
    NoParticipants,
    WinnerAnnounced {
        winner: UserId,
        message: String,
        action: EndAction,
        state: RaffleState,
    },
    Abandoned(Abandoned),
}

/// One line of `list_raffles` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaffleSummary {
    pub name: String,
    pub description: Option<String>,
}

pub struct RaffleEngine {
    repo: RaffleRepository,
    directory: Arc<dyn Directory>,
    notifier: Arc<dyn NotificationSink>,
    rng: Arc<dyn RandomSource>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
}

impl RaffleEngine {
    pub fn new(
        store: Arc<dyn RaffleStore>,
        directory: Arc<dyn Directory>,
        notifier: Arc<dyn NotificationSink>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            repo: RaffleRepository::new(store),
            directory,
            notifier,
            rng: Arc::new(ThreadRandom),
            clock: Arc::new(SystemClock),
            settings,
        }
    }

    pub fn with_random(mut self, rng: Arc<dyn RandomSource>) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn mention(&self, user: UserId) -> String {
        self.settings.mention_format.replace("{id}", &user.to_string())
    }

    // ------------------------------------------------------------------
    // Creation and editing
    // ------------------------------------------------------------------

    /// Validate `raw` as a command raffle owned by `actor` and store it.
    pub async fn create_raffle(
        &self,
        scope: ScopeId,
        raw: &Value,
        actor: UserId,
    ) -> Result<RaffleDefinition, RaffleError> {
        self.create_with(scope, raw, actor, ExternalSettings::Command)
            .await
    }

    /// Validate `raw` as a reaction raffle bound to `message` in `channel`.
    pub async fn create_reaction_raffle(
        &self,
        scope: ScopeId,
        raw: &Value,
        actor: UserId,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<RaffleDefinition, RaffleError> {
        let settings = ExternalSettings::Reaction {
            channel_id: channel,
            message_id: message,
        };
        self.create_with(scope, raw, actor, settings).await
    }

    async fn create_with(
        &self,
        scope: ScopeId,
        raw: &Value,
        actor: UserId,
        settings: ExternalSettings,
    ) -> Result<RaffleDefinition, RaffleError> {
        let def = self.validate(scope, raw, actor, settings).await?;
        let key = RaffleKey::new(scope, def.name.clone());

        let stored = def.clone();
        let inserted = self
            .repo
            .update(&key, move |slot| {
                if slot.is_some() {
                    return false;
                }
                *slot = Some(stored);
                true
            })
            .await?;
        if !inserted {
            return Err(RaffleError::AlreadyExists(def.name));
        }

        info!(
            scope,
            raffle = %def.name,
            owner = actor,
            kind = %def.raffle_type(),
            "Raffle created"
        );
        Ok(def)
    }

    /// Replace a raffle's definition. Owner, mode, bound message, entries
    /// and creation time carry over; the name cannot change.
    pub async fn edit_raffle(
        &self,
        scope: ScopeId,
        name: &str,
        raw: &Value,
    ) -> Result<RaffleDefinition, RaffleError> {
        let key = RaffleKey::new(scope, name);
        let current = self.require(&key).await?;

        let mut def = self
            .validate(scope, raw, current.owner, current.external_settings)
            .await?;
        if def.name != current.name {
            let err = ValidationError::InvalidValue {
                field: "name",
                message: "The name of a raffle cannot be changed by editing.".to_string(),
            };
            metrics::record_validation_failure(err.error_code());
            return Err(err.into());
        }

        let edited = self
            .repo
            .update(&key, |slot| {
                let existing = slot.as_mut()?;
                def.entries = existing.entries.clone();
                def.created_at = existing.created_at;
                *existing = def.clone();
                Some(def)
            })
            .await?;

        let def = edited.ok_or_else(|| RaffleError::NotFound(name.to_string()))?;
        info!(scope, raffle = %name, "Raffle edited");
        Ok(def)
    }

    async fn validate(
        &self,
        scope: ScopeId,
        raw: &Value,
        owner: UserId,
        settings: ExternalSettings,
    ) -> Result<RaffleDefinition, RaffleError> {
        let scope_info = self.scope_info(scope).await?;
        let resolved = self.resolve_entities(scope, raw).await?;
        let ctx = ValidationContext {
            owner,
            settings,
            now: self.clock.now(),
            platform_epoch: self.settings.platform_epoch,
            scope_created_at: scope_info.created_at,
            resolver: &resolved,
        };

        crate::raffle::validate(raw, &ctx).map_err(|e| {
            debug!(scope, error = %e, "Raffle definition rejected");
            metrics::record_validation_failure(e.error_code());
            RaffleError::Invalid(e)
        })
    }

    /// Look up every role and user the definition references so the
    /// validator can run without touching the directory.
    async fn resolve_entities(
        &self,
        scope: ScopeId,
        raw: &Value,
    ) -> Result<ResolvedEntities, RaffleError> {
        let (roles, users) = referenced_ids(raw);
        let mut resolved = ResolvedEntities::default();
        for role in roles {
            if self.directory.role(scope, role).await?.is_some() {
                resolved.roles.insert(role);
            }
        }
        for user in users {
            if self.directory.member(scope, user).await?.is_some() {
                resolved.users.insert(user);
            }
        }
        Ok(resolved)
    }

    // ------------------------------------------------------------------
    // Entrants
    // ------------------------------------------------------------------

    /// Run the eligibility battery and admit `user` if it passes.
    pub async fn join_raffle(
        &self,
        scope: ScopeId,
        name: &str,
        user: UserId,
    ) -> Result<JoinOutcome, RaffleError> {
        let facts = self.entrant_facts(scope, user).await?;
        let now = self.clock.now();
        let key = RaffleKey::new(scope, name);

        let checked = self
            .repo
            .update(&key, |slot| {
                let def = slot.as_mut()?;
                Some(match check_entry(&facts, def, now) {
                    Eligibility::Admitted => {
                        lifecycle::admit(def, user);
                        Ok((def.join_message.clone(), def.entries.len()))
                    }
                    Eligibility::Denied(kind) => Err(kind),
                })
            })
            .await?
            .ok_or_else(|| RaffleError::NotFound(name.to_string()))?;

        match checked {
            Ok((join_message, entry_count)) => {
                metrics::record_entry_admitted();
                info!(scope, raffle = %name, user, entry_count, "Entrant admitted");

                let mut message =
                    format!("{} you have been added to the raffle.", self.mention(user));
                let template = join_message
                    .as_ref()
                    .and_then(|p| p.pick(self.rng.as_ref()));
                if let Some(template) = template {
                    let member = self.safe_member(scope, user).await?;
                    let rendered = safety::render(
                        template,
                        TemplateKind::Join,
                        &Substitutions {
                            member: &member,
                            raffle: name,
                            entry_count: Some(entry_count),
                        },
                    );
                    message.push_str("\n---\n");
                    message.push_str(&rendered);
                }
                Ok(JoinOutcome::Admitted {
                    message,
                    entry_count,
                })
            }
            Err(kind) => {
                metrics::record_entry_denied(kind.error_code());
                debug!(scope, raffle = %name, user, reason = kind.error_code(), "Entrant denied");

                let role_name = match kind {
                    crate::raffle::DenialKind::MissingRole(role) => self
                        .directory
                        .role(scope, role)
                        .await?
                        .map(|r| r.name),
                    _ => None,
                };
                Ok(JoinOutcome::Denied(Denial::new(kind, role_name.as_deref())))
            }
        }
    }

    pub async fn leave_raffle(
        &self,
        scope: ScopeId,
        name: &str,
        user: UserId,
    ) -> Result<Removal, RaffleError> {
        let removal = self.remove(scope, name, user).await?;
        if removal == Removal::Removed {
            info!(scope, raffle = %name, user, "Entrant left");
        }
        Ok(removal)
    }

    pub async fn kick_entrant(
        &self,
        scope: ScopeId,
        name: &str,
        user: UserId,
    ) -> Result<Removal, RaffleError> {
        let removal = self.remove(scope, name, user).await?;
        if removal == Removal::Removed {
            info!(scope, raffle = %name, user, "Entrant kicked");
        }
        Ok(removal)
    }

    async fn remove(
        &self,
        scope: ScopeId,
        name: &str,
        user: UserId,
    ) -> Result<Removal, RaffleError> {
        let key = RaffleKey::new(scope, name);
        self.repo
            .update(&key, |slot| {
                let def = slot.as_mut()?;
                Some(if lifecycle::remove_entrant(def, user) {
                    Removal::Removed
                } else {
                    Removal::NotEntered
                })
            })
            .await?
            .ok_or_else(|| RaffleError::NotFound(name.to_string()))
    }

    // ------------------------------------------------------------------
    // Draw and end
    // ------------------------------------------------------------------

    /// Pick a winner, wait out the suspense, then apply the raffle's
    /// end action. The per-raffle lock is not held during the wait, so the
    /// raffle and winner are re-checked afterwards.
    pub async fn draw_raffle(
        &self,
        scope: ScopeId,
        name: &str,
        channel: ChannelId,
    ) -> Result<DrawOutcome, RaffleError> {
        let key = RaffleKey::new(scope, name);
        let rng = self.rng.as_ref();
        let (winner, snapshot) = self
            .repo
            .update(&key, |slot| {
                slot.as_ref()
                    .map(|def| (lifecycle::pick_winner(def, rng), def.clone()))
            })
            .await?
            .ok_or_else(|| RaffleError::NotFound(name.to_string()))?;

        let Some(winner) = winner else {
            debug!(scope, raffle = %name, "Draw with no participants");
            return Ok(DrawOutcome::NoParticipants);
        };

        let member = self.safe_member(scope, winner).await?;
        let template = snapshot
            .end_message
            .as_ref()
            .and_then(|p| p.pick(rng))
            .unwrap_or(DEFAULT_END_MESSAGE);
        let message = safety::render(
            template,
            TemplateKind::End,
            &Substitutions {
                member: &member,
                raffle: name,
                entry_count: None,
            },
        );

        self.notify(scope, Target::Channel(channel), PICKING_MESSAGE)
            .await;
        let suspense = snapshot
            .suspense_timer
            .map(|s| Duration::from_secs(u64::from(s)))
            .unwrap_or(self.settings.default_suspense);
        tokio::time::sleep(suspense).await;

        let applied = self
            .repo
            .update(&key, |slot| {
                let Some(def) = slot.as_mut() else {
                    return Err(Abandoned::RaffleEnded);
                };
                if !def.has_entrant(winner) {
                    return Err(Abandoned::WinnerLeft);
                }
                let action = def.on_end_action;
                let state = lifecycle::apply_end_action(def, winner);
                if state == RaffleState::Ended {
                    *slot = None;
                }
                Ok((action, state))
            })
            .await?;

        let (action, state) = match applied {
            Ok(applied) => applied,
            Err(reason) => {
                info!(scope, raffle = %name, winner, ?reason, "Draw abandoned");
                return Ok(DrawOutcome::Abandoned(reason));
            }
        };

        metrics::record_draw(action.as_str());
        info!(scope, raffle = %name, winner, action = %action, state = %state, "Winner drawn");
        self.notify(scope, Target::Channel(channel), &message).await;

        Ok(DrawOutcome::WinnerAnnounced {
            winner,
            message,
            action,
            state,
        })
    }

    /// Remove a raffle regardless of its end action.
    pub async fn end_raffle(&self, scope: ScopeId, name: &str) -> Result<(), RaffleError> {
        let key = RaffleKey::new(scope, name);
        if !self.repo.delete(&key).await? {
            return Err(RaffleError::NotFound(name.to_string()));
        }
        info!(scope, raffle = %name, "Raffle ended");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub async fn list_entrants(
        &self,
        scope: ScopeId,
        name: &str,
    ) -> Result<Vec<UserId>, RaffleError> {
        Ok(self.require(&RaffleKey::new(scope, name)).await?.entries)
    }

    /// Entrant mentions joined for display, or `None` with no entrants.
    pub async fn mention_entrants(
        &self,
        scope: ScopeId,
        name: &str,
    ) -> Result<Option<String>, RaffleError> {
        let entries = self.list_entrants(scope, name).await?;
        if entries.is_empty() {
            return Ok(None);
        }
        let mentions: Vec<String> = entries.iter().map(|u| self.mention(*u)).collect();
        Ok(Some(humanize_list(&mentions)))
    }

    pub async fn raffle_info(
        &self,
        scope: ScopeId,
        name: &str,
    ) -> Result<RaffleDefinition, RaffleError> {
        self.require(&RaffleKey::new(scope, name)).await
    }

    pub async fn list_raffles(&self, scope: ScopeId) -> Result<Vec<RaffleSummary>, RaffleError> {
        Ok(self
            .repo
            .all(scope)
            .await?
            .into_iter()
            .map(|def| RaffleSummary {
                description: def
                    .description
                    .as_deref()
                    .map(|d| shorten_description(d, DESCRIPTION_PREVIEW_LEN)),
                name: def.name,
            })
            .collect())
    }

    /// Whether `actor` may kick, draw, end or edit the raffle.
    pub async fn can_manage(
        &self,
        scope: ScopeId,
        name: &str,
        actor: UserId,
    ) -> Result<bool, RaffleError> {
        let def = self.require(&RaffleKey::new(scope, name)).await?;
        if def.owner == actor {
            return Ok(true);
        }
        Ok(self
            .directory
            .member(scope, actor)
            .await?
            .is_some_and(|m| m.manager))
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    async fn require(&self, key: &RaffleKey) -> Result<RaffleDefinition, RaffleError> {
        self.repo
            .get(key)
            .await?
            .ok_or_else(|| RaffleError::NotFound(key.name.clone()))
    }

    async fn scope_info(&self, scope: ScopeId) -> Result<ScopeInfo, RaffleError> {
        self.directory
            .scope(scope)
            .await?
            .ok_or(RaffleError::UnknownScope(scope))
    }

    async fn entrant_facts(
        &self,
        scope: ScopeId,
        user: UserId,
    ) -> Result<EntrantFacts, RaffleError> {
        let profile = self
            .directory
            .user(user)
            .await?
            .ok_or(RaffleError::UnknownEntrant(user))?;
        let member = self.directory.member(scope, user).await?;
        Ok(EntrantFacts {
            user_id: user,
            account_created_at: profile.created_at,
            joined_scope_at: member.as_ref().map(|m| m.joined_at),
            roles: member.map(|m| m.roles).unwrap_or_default(),
            badges: profile.badges,
        })
    }

    /// The template-visible view of a user.
    async fn safe_member(&self, scope: ScopeId, user: UserId) -> Result<SafeMember, RaffleError> {
        let mention = self.mention(user);
        if let Some(member) = self.directory.member(scope, user).await? {
            return Ok(SafeMember {
                id: user,
                display_name: member.display_name().to_string(),
                name: member.user.name,
                mention,
            });
        }
        Ok(match self.directory.user(user).await? {
            Some(profile) => SafeMember {
                id: user,
                display_name: profile.name.clone(),
                name: profile.name,
                mention,
            },
            None => SafeMember::unknown(user, mention),
        })
    }

    /// Deliver a notification. Failures are logged only.
    async fn notify(&self, scope: ScopeId, target: Target, text: &str) {
        if let Err(e) = self.notifier.send(scope, target, text).await {
            warn!(scope, target = %target, error = %e, "Notification failed");
        }
    }
}
