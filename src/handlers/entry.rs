//! JOIN, LEAVE and KICK.

use super::helpers::{ensure_manager, parse_id, require_arg, split_arg};
use super::{Context, Handler, Reply};
use crate::engine::{JoinOutcome, Removal};
use crate::error::HandlerResult;
use async_trait::async_trait;

/// `JOIN <name>`
pub struct JoinHandler;

#[async_trait]
impl Handler for JoinHandler {
    async fn handle(&self, ctx: &Context<'_>, args: &str) -> HandlerResult {
        let name = require_arg(args)?;
        Ok(
            match ctx.engine.join_raffle(ctx.scope, name, ctx.actor).await? {
                JoinOutcome::Admitted { message, .. } => Reply::ok(message),
                JoinOutcome::Denied(denial) => {
                    Reply::denied(denial.kind.error_code(), denial.message)
                }
            },
        )
    }
}

/// `LEAVE <name>`
pub struct LeaveHandler;

#[async_trait]
impl Handler for LeaveHandler {
    async fn handle(&self, ctx: &Context<'_>, args: &str) -> HandlerResult {
        let name = require_arg(args)?;
        Ok(
            match ctx.engine.leave_raffle(ctx.scope, name, ctx.actor).await? {
                Removal::Removed => Reply::ok("You have been removed from the raffle."),
                Removal::NotEntered => {
                    Reply::error("not_entered", "You are not entered into this raffle.")
                }
            },
        )
    }
}

/// `KICK <name> <user>`
pub struct KickHandler;

#[async_trait]
impl Handler for KickHandler {
    async fn handle(&self, ctx: &Context<'_>, args: &str) -> HandlerResult {
        let (name, rest) = split_arg(args)?;
        let user = parse_id("user", require_arg(rest)?)?;
        ensure_manager(ctx, name).await?;

        Ok(match ctx.engine.kick_entrant(ctx.scope, name, user).await? {
            Removal::Removed => Reply::ok(format!(
                "{} has been removed from the raffle.",
                ctx.engine.mention(user)
            )),
            Removal::NotEntered => Reply::error(
                "not_entered",
                "That user is not entered into this raffle.",
            ),
        })
    }
}
