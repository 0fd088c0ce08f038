//! Raffle definition validation.
//!
//! A raw definition (any serde-compatible mapping, typically JSON or TOML)
//! is checked against [`FIELDS`], a descriptor table iterated in a fixed
//! order. Exactly one error is reported, by priority:
//!
//! 1. deprecated fields
//! 2. unrecognized fields
//! 3. mode crossovers (a reaction-only field on a command raffle)
//! 4. the first failing field, in table order

use super::checks::{Badge, account_age_checker, days_since, server_join_age_checker};
use super::safety::{self, TemplateKind};
use super::{
    EndAction, ExternalSettings, MAX_NAME_LEN, MAX_SUSPENSE_SECS, MessagePool, RaffleDefinition,
    RaffleType, RoleId, UserId,
};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// What kind of entity an unresolvable identifier was expected to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityCategory {
    Role,
    User,
    Badge,
}

impl fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role => f.write_str("role"),
            Self::User => f.write_str("user"),
            Self::Badge => f.write_str("badge"),
        }
    }
}

/// Why a raffle definition was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("the \"{field}\" condition is required")]
    RequiredKey { field: &'static str },

    #[error("\"{field}\" is not a documented condition/block")]
    UnrecognizedField { field: String },

    #[error(
        "\"{field}\" has been deprecated in favour of \"{replacement}\". Please use this condition instead."
    )]
    DeprecatedField {
        field: String,
        replacement: &'static str,
    },

    #[error("({field}) this condition cannot be used with the {mode} raffle type")]
    ConditionCrossover {
        field: &'static str,
        mode: RaffleType,
    },

    /// Wrong type or shape. `position` is the offending character index
    /// for name-character errors.
    #[error("({field}) {message}")]
    Syntax {
        field: &'static str,
        message: String,
        position: Option<usize>,
    },

    #[error("({field}) {category} \"{value}\" could not be found")]
    UnknownEntity {
        field: &'static str,
        value: String,
        category: EntityCategory,
    },

    #[error("({field}) {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

impl ValidationError {
    /// Static error code for metrics labeling and wire replies.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::RequiredKey { .. } => "required_key",
            Self::UnrecognizedField { .. } => "unrecognized_field",
            Self::DeprecatedField { .. } => "deprecated_field",
            Self::ConditionCrossover { .. } => "condition_crossover",
            Self::Syntax { .. } => "syntax",
            Self::UnknownEntity { .. } => "unknown_entity",
            Self::InvalidValue { .. } => "invalid_value",
        }
    }

    fn syntax(field: &'static str, message: impl Into<String>) -> Self {
        Self::Syntax {
            field,
            message: message.into(),
            position: None,
        }
    }

    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            message: message.into(),
        }
    }
}

/// Existence checks the validator needs from the hosting scope.
pub trait EntityResolver {
    fn role_exists(&self, role: RoleId) -> bool;
    fn user_exists(&self, user: UserId) -> bool;
}

/// Entities already looked up by the caller.
#[derive(Debug, Clone, Default)]
pub struct ResolvedEntities {
    pub roles: HashSet<RoleId>,
    pub users: HashSet<UserId>,
}

impl EntityResolver for ResolvedEntities {
    fn role_exists(&self, role: RoleId) -> bool {
        self.roles.contains(&role)
    }

    fn user_exists(&self, user: UserId) -> bool {
        self.users.contains(&user)
    }
}

/// Everything outside the raw definition that validation depends on.
pub struct ValidationContext<'a> {
    pub owner: UserId,
    pub settings: ExternalSettings,
    pub now: DateTime<Utc>,
    pub platform_epoch: DateTime<Utc>,
    pub scope_created_at: DateTime<Utc>,
    pub resolver: &'a dyn EntityResolver,
}

impl ValidationContext<'_> {
    fn mode(&self) -> RaffleType {
        self.settings.raffle_type()
    }
}

type Check =
    fn(&Value, &ValidationContext<'_>, &mut RaffleDefinition) -> Result<(), ValidationError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    Optional,
    Required,
    RequiredIn(RaffleType),
}

/// One recognized condition/block.
struct FieldSpec {
    name: &'static str,
    presence: Presence,
    /// `Some(mode)` restricts the field to raffles of that mode.
    mode: Option<RaffleType>,
    check: Check,
}

/// Recognized fields, in validation order.
const FIELDS: [FieldSpec; 14] = [
    FieldSpec {
        name: "account_age",
        presence: Presence::Optional,
        mode: None,
        check: check_account_age,
    },
    FieldSpec {
        name: "server_join_age",
        presence: Presence::Optional,
        mode: None,
        check: check_server_join_age,
    },
    FieldSpec {
        name: "maximum_entries",
        presence: Presence::Optional,
        mode: None,
        check: check_maximum_entries,
    },
    FieldSpec {
        name: "name",
        presence: Presence::Required,
        mode: None,
        check: check_name,
    },
    FieldSpec {
        name: "description",
        presence: Presence::Optional,
        mode: None,
        check: check_description,
    },
    FieldSpec {
        name: "roles_needed_to_enter",
        presence: Presence::Optional,
        mode: None,
        check: check_roles,
    },
    FieldSpec {
        name: "badges_needed_to_enter",
        presence: Presence::Optional,
        mode: None,
        check: check_badges,
    },
    FieldSpec {
        name: "prevented_users",
        presence: Presence::Optional,
        mode: None,
        check: check_prevented_users,
    },
    FieldSpec {
        name: "allowed_users",
        presence: Presence::Optional,
        mode: None,
        check: check_allowed_users,
    },
    FieldSpec {
        name: "end_message",
        presence: Presence::Optional,
        mode: None,
        check: check_end_message,
    },
    FieldSpec {
        name: "join_message",
        presence: Presence::Optional,
        mode: None,
        check: check_join_message,
    },
    FieldSpec {
        name: "on_end_action",
        presence: Presence::Optional,
        mode: None,
        check: check_on_end_action,
    },
    FieldSpec {
        name: "suspense_timer",
        presence: Presence::Optional,
        mode: None,
        check: check_suspense_timer,
    },
    FieldSpec {
        name: "reaction_emoji",
        presence: Presence::RequiredIn(RaffleType::Reaction),
        mode: Some(RaffleType::Reaction),
        check: check_reaction_emoji,
    },
];

/// Renamed fields and their replacements.
const DEPRECATED: [(&str, &str); 1] = [("join_age", "server_join_age")];

/// Names of every recognized field, in validation order.
pub fn recognized_fields() -> impl Iterator<Item = &'static str> {
    FIELDS.iter().map(|f| f.name)
}

/// Null, empty strings and empty lists count as not supplied.
fn lookup<'v>(map: &'v Map<String, Value>, key: &str) -> Option<&'v Value> {
    match map.get(key)? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::Array(a) if a.is_empty() => None,
        v => Some(v),
    }
}

/// Validate `raw` and build a definition for storage.
pub fn validate(
    raw: &Value,
    ctx: &ValidationContext<'_>,
) -> Result<RaffleDefinition, ValidationError> {
    let Value::Object(map) = raw else {
        return Err(ValidationError::syntax(
            "definition",
            "a raffle definition must be a mapping of conditions",
        ));
    };

    for (old, replacement) in DEPRECATED {
        if map.contains_key(old) {
            return Err(ValidationError::DeprecatedField {
                field: old.to_string(),
                replacement,
            });
        }
    }

    for key in map.keys() {
        if !FIELDS.iter().any(|f| f.name == key) {
            return Err(ValidationError::UnrecognizedField { field: key.clone() });
        }
    }

    let mode = ctx.mode();
    for spec in &FIELDS {
        if let Some(only) = spec.mode
            && only != mode
            && lookup(map, spec.name).is_some()
        {
            return Err(ValidationError::ConditionCrossover {
                field: spec.name,
                mode,
            });
        }
    }

    let mut def = RaffleDefinition::blank(ctx.owner, ctx.settings, ctx.now);
    for spec in &FIELDS {
        match lookup(map, spec.name) {
            Some(value) => (spec.check)(value, ctx, &mut def)?,
            None => match spec.presence {
                Presence::Required => return Err(ValidationError::RequiredKey { field: spec.name }),
                Presence::RequiredIn(m) if m == mode => {
                    return Err(ValidationError::RequiredKey { field: spec.name });
                }
                _ => {}
            },
        }
    }

    Ok(def)
}

/// Role and user ids a raw definition refers to, for prefetching.
pub fn referenced_ids(raw: &Value) -> (Vec<RoleId>, Vec<UserId>) {
    let ids = |key: &str| -> Vec<u64> {
        raw.get(key)
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_u64).collect())
            .unwrap_or_default()
    };
    let roles = ids("roles_needed_to_enter");
    let mut users = ids("prevented_users");
    users.extend(ids("allowed_users"));
    users.sort_unstable();
    users.dedup();
    (roles, users)
}

/// Render a value for a diagnostic without JSON quoting of strings.
fn show(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn day_count(field: &'static str, value: &Value) -> Result<u32, ValidationError> {
    let days = value
        .as_i64()
        .ok_or_else(|| ValidationError::syntax(field, "days must be a number"))?;
    if days < 0 {
        return Err(ValidationError::invalid(field, "days cannot be negative"));
    }
    u32::try_from(days).map_err(|_| ValidationError::invalid(field, "days is far too large"))
}

fn check_account_age(
    value: &Value,
    ctx: &ValidationContext<'_>,
    def: &mut RaffleDefinition,
) -> Result<(), ValidationError> {
    let days = day_count("account_age", value)?;
    if !account_age_checker(days, ctx.platform_epoch, ctx.now) {
        return Err(ValidationError::invalid(
            "account_age",
            format!(
                "days must be less than the platform's creation date ({} days)",
                days_since(ctx.platform_epoch, ctx.now)
            ),
        ));
    }
    def.account_age = Some(days);
    Ok(())
}

fn check_server_join_age(
    value: &Value,
    ctx: &ValidationContext<'_>,
    def: &mut RaffleDefinition,
) -> Result<(), ValidationError> {
    let days = day_count("server_join_age", value)?;
    if !server_join_age_checker(days, ctx.scope_created_at, ctx.now) {
        return Err(ValidationError::invalid(
            "server_join_age",
            format!(
                "days must be less than this server's creation date ({} days)",
                days_since(ctx.scope_created_at, ctx.now)
            ),
        ));
    }
    def.server_join_age = Some(days);
    Ok(())
}

fn check_maximum_entries(
    value: &Value,
    _ctx: &ValidationContext<'_>,
    def: &mut RaffleDefinition,
) -> Result<(), ValidationError> {
    let n = value.as_i64().ok_or_else(|| {
        ValidationError::syntax("maximum_entries", "Maximum entries must be a number")
    })?;
    if n <= 0 {
        return Err(ValidationError::invalid(
            "maximum_entries",
            "Maximum entries must be a positive number",
        ));
    }
    def.maximum_entries = Some(u32::try_from(n).map_err(|_| {
        ValidationError::invalid("maximum_entries", "Maximum entries is far too large")
    })?);
    Ok(())
}

fn check_name(
    value: &Value,
    _ctx: &ValidationContext<'_>,
    def: &mut RaffleDefinition,
) -> Result<(), ValidationError> {
    let name = value
        .as_str()
        .ok_or_else(|| ValidationError::syntax("name", "Name must be in quotation marks"))?;
    let len = name.chars().count();
    if len > MAX_NAME_LEN {
        return Err(ValidationError::syntax(
            "name",
            format!(
                "Name must be under {} characters, your raffle name had {}",
                MAX_NAME_LEN, len
            ),
        ));
    }
    if let Some((index, bad)) = name
        .chars()
        .enumerate()
        .find(|(_, c)| *c != '_' && !c.is_alphanumeric())
    {
        let marker = format!(
            "{}\n{}^\nCharacters must be alphanumeric or underscores, not \"{}\"",
            name,
            " ".repeat(index),
            bad
        );
        return Err(ValidationError::Syntax {
            field: "name",
            message: format!("In \"name\" field, character {}\n\n{}", index + 1, marker),
            position: Some(index),
        });
    }
    def.name = name.to_string();
    Ok(())
}

fn check_description(
    value: &Value,
    _ctx: &ValidationContext<'_>,
    def: &mut RaffleDefinition,
) -> Result<(), ValidationError> {
    let description = value.as_str().ok_or_else(|| {
        ValidationError::syntax("description", "Description must be in quotation marks")
    })?;
    def.description = Some(description.to_string());
    Ok(())
}

fn id_list(
    field: &'static str,
    value: &Value,
    what: &str,
    category: EntityCategory,
    exists: impl Fn(u64) -> bool,
) -> Result<Vec<u64>, ValidationError> {
    let items = value.as_array().ok_or_else(|| {
        ValidationError::syntax(field, format!("must be a list of {} IDs", what))
    })?;
    let mut ids = Vec::with_capacity(items.len());
    for item in items {
        let id = item.as_u64().ok_or_else(|| {
            ValidationError::syntax(
                field,
                format!(
                    "\"{}\" must be a number ({} ID) without quotation marks",
                    show(item),
                    what
                ),
            )
        })?;
        if !exists(id) {
            return Err(ValidationError::UnknownEntity {
                field,
                value: id.to_string(),
                category,
            });
        }
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

fn check_roles(
    value: &Value,
    ctx: &ValidationContext<'_>,
    def: &mut RaffleDefinition,
) -> Result<(), ValidationError> {
    def.roles_needed_to_enter = id_list(
        "roles_needed_to_enter",
        value,
        "role",
        EntityCategory::Role,
        |id| ctx.resolver.role_exists(id),
    )?;
    Ok(())
}

fn check_badges(
    value: &Value,
    _ctx: &ValidationContext<'_>,
    def: &mut RaffleDefinition,
) -> Result<(), ValidationError> {
    let field = "badges_needed_to_enter";
    let items = value
        .as_array()
        .ok_or_else(|| ValidationError::syntax(field, "Badges must be a list of badge names"))?;
    let mut badges = Vec::with_capacity(items.len());
    for item in items {
        let name = item.as_str().ok_or_else(|| {
            ValidationError::syntax(
                field,
                format!("\"{}\" must be a badge name wrapped in quotation marks", show(item)),
            )
        })?;
        let badge = Badge::parse(name).ok_or_else(|| ValidationError::UnknownEntity {
            field,
            value: name.to_string(),
            category: EntityCategory::Badge,
        })?;
        if !badges.contains(&badge) {
            badges.push(badge);
        }
    }
    def.badges_needed_to_enter = badges;
    Ok(())
}

fn check_prevented_users(
    value: &Value,
    ctx: &ValidationContext<'_>,
    def: &mut RaffleDefinition,
) -> Result<(), ValidationError> {
    def.prevented_users = id_list("prevented_users", value, "user", EntityCategory::User, |id| {
        ctx.resolver.user_exists(id)
    })?;
    Ok(())
}

fn check_allowed_users(
    value: &Value,
    ctx: &ValidationContext<'_>,
    def: &mut RaffleDefinition,
) -> Result<(), ValidationError> {
    def.allowed_users = id_list("allowed_users", value, "user", EntityCategory::User, |id| {
        ctx.resolver.user_exists(id)
    })?;
    Ok(())
}

fn message_pool(value: &Value, kind: TemplateKind) -> Result<MessagePool, ValidationError> {
    let field = kind.field_name();
    let scan = |template: &str| {
        safety::scan(template, kind).map_err(|unsafe_placeholder| {
            ValidationError::syntax(field, format!("placeholder {}", unsafe_placeholder))
        })
    };
    match value {
        Value::String(s) => {
            scan(s)?;
            Ok(MessagePool::One(s.clone()))
        }
        Value::Array(items) => {
            let mut templates = Vec::with_capacity(items.len());
            for item in items {
                let s = item.as_str().ok_or_else(|| {
                    ValidationError::syntax(
                        field,
                        "All messages must be wrapped by quotation marks",
                    )
                })?;
                scan(s)?;
                templates.push(s.to_string());
            }
            Ok(MessagePool::Many(templates))
        }
        _ => Err(ValidationError::syntax(
            field,
            "Message must be in quotation marks, by itself or inside a list",
        )),
    }
}

fn check_end_message(
    value: &Value,
    _ctx: &ValidationContext<'_>,
    def: &mut RaffleDefinition,
) -> Result<(), ValidationError> {
    def.end_message = Some(message_pool(value, TemplateKind::End)?);
    Ok(())
}

fn check_join_message(
    value: &Value,
    _ctx: &ValidationContext<'_>,
    def: &mut RaffleDefinition,
) -> Result<(), ValidationError> {
    def.join_message = Some(message_pool(value, TemplateKind::Join)?);
    Ok(())
}

fn check_on_end_action(
    value: &Value,
    _ctx: &ValidationContext<'_>,
    def: &mut RaffleDefinition,
) -> Result<(), ValidationError> {
    let action = value.as_str().ok_or_else(|| {
        ValidationError::syntax("on_end_action", "must be wrapped in quotation marks")
    })?;
    def.on_end_action = EndAction::parse(action).ok_or_else(|| {
        ValidationError::invalid(
            "on_end_action",
            "must be one of 'end', 'remove_winner', 'remove_and_prevent_winner', or 'keep_winner'",
        )
    })?;
    Ok(())
}

fn check_suspense_timer(
    value: &Value,
    _ctx: &ValidationContext<'_>,
    def: &mut RaffleDefinition,
) -> Result<(), ValidationError> {
    let secs = value
        .as_i64()
        .ok_or_else(|| ValidationError::syntax("suspense_timer", "must be a number"))?;
    if !(0..=MAX_SUSPENSE_SECS).contains(&secs) {
        return Err(ValidationError::invalid(
            "suspense_timer",
            format!("must be a number between 0 and {}", MAX_SUSPENSE_SECS),
        ));
    }
    def.suspense_timer = u8::try_from(secs).ok();
    Ok(())
}

fn check_reaction_emoji(
    value: &Value,
    _ctx: &ValidationContext<'_>,
    def: &mut RaffleDefinition,
) -> Result<(), ValidationError> {
    let emoji = value.as_str().map(str::trim).filter(|e| !e.is_empty()).ok_or_else(|| {
        ValidationError::syntax(
            "reaction_emoji",
            "Reaction emoji must be an emoji-string inside quotation marks, or an emoji",
        )
    })?;
    def.reaction_emoji = Some(emoji.to_string());
    Ok(())
}
