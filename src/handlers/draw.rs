//! DRAW and END.

use super::helpers::{ensure_manager, parse_id, require_arg, split_arg};
use super::{Context, Handler, Reply};
use crate::engine::{Abandoned, DrawOutcome};
use crate::error::HandlerResult;
use async_trait::async_trait;

/// `DRAW <name> <channel>`
///
/// Replies after the suspense wait, once the winner is announced.
pub struct DrawHandler;

#[async_trait]
impl Handler for DrawHandler {
    async fn handle(&self, ctx: &Context<'_>, args: &str) -> HandlerResult {
        let (name, rest) = split_arg(args)?;
        let channel = parse_id("channel", require_arg(rest)?)?;
        ensure_manager(ctx, name).await?;

        Ok(match ctx.engine.draw_raffle(ctx.scope, name, channel).await? {
            DrawOutcome::WinnerAnnounced { message, .. } => Reply::ok(message),
            DrawOutcome::NoParticipants => Reply::error(
                "no_participants",
                "There are no participants yet for this raffle.",
            ),
            DrawOutcome::Abandoned(Abandoned::RaffleEnded) => Reply::error(
                "draw_abandoned",
                "The raffle ended before a winner could be announced.",
            ),
            DrawOutcome::Abandoned(Abandoned::WinnerLeft) => Reply::error(
                "draw_abandoned",
                "The winner left the raffle before they could be announced. Please draw again.",
            ),
        })
    }
}

/// `END <name>`
pub struct EndHandler;

#[async_trait]
impl Handler for EndHandler {
    async fn handle(&self, ctx: &Context<'_>, args: &str) -> HandlerResult {
        let name = require_arg(args)?;
        ensure_manager(ctx, name).await?;
        ctx.engine.end_raffle(ctx.scope, name).await?;
        Ok(Reply::ok("Raffle ended."))
    }
}
