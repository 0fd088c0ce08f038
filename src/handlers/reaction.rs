//! REACT and UNREACT: reaction events forwarded from the platform.

use super::helpers::{parse_id, require_arg, split_arg};
use super::{Context, Handler, Reply};
use crate::engine::JoinOutcome;
use crate::error::HandlerResult;
use async_trait::async_trait;

/// `REACT <channel> <message> <emoji>`
///
/// Replies with `<raffle>=admitted` or `<raffle>=retract:<code>` per
/// matching raffle; the user-facing text goes out as notices.
pub struct ReactHandler;

#[async_trait]
impl Handler for ReactHandler {
    async fn handle(&self, ctx: &Context<'_>, args: &str) -> HandlerResult {
        let (channel, rest) = split_arg(args)?;
        let (message, rest) = split_arg(rest)?;
        let channel = parse_id("channel", channel)?;
        let message = parse_id("message", message)?;
        let emoji = require_arg(rest)?;

        let entries = ctx
            .engine
            .reaction_added(ctx.scope, channel, message, emoji, ctx.actor)
            .await?;
        if entries.is_empty() {
            return Ok(Reply::ok("no raffles"));
        }

        let summary: Vec<String> = entries
            .iter()
            .map(|e| match &e.outcome {
                JoinOutcome::Admitted { .. } => format!("{}=admitted", e.raffle),
                JoinOutcome::Denied(denial) => {
                    format!("{}=retract:{}", e.raffle, denial.kind.error_code())
                }
            })
            .collect();
        Ok(Reply::ok(summary.join(" ")))
    }
}

/// `UNREACT <message> <emoji>`
pub struct UnreactHandler;

#[async_trait]
impl Handler for UnreactHandler {
    async fn handle(&self, ctx: &Context<'_>, args: &str) -> HandlerResult {
        let (message, rest) = split_arg(args)?;
        let message = parse_id("message", message)?;
        let emoji = require_arg(rest)?;

        Ok(
            match ctx
                .engine
                .reaction_removed(ctx.scope, message, emoji, ctx.actor)
                .await?
            {
                Some(name) => Reply::ok(format!("removed from {}", name)),
                None => Reply::ok("nothing to remove"),
            },
        )
    }
}
