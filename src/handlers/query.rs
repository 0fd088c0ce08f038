//! ENTRANTS, MENTION, INFO and LIST.

use super::helpers::require_arg;
use super::{Context, Handler, Reply};
use crate::error::{HandlerError, HandlerResult};
use async_trait::async_trait;

/// `ENTRANTS <name>`: entrant ids, space-separated, in entry order.
pub struct EntrantsHandler;

#[async_trait]
impl Handler for EntrantsHandler {
    async fn handle(&self, ctx: &Context<'_>, args: &str) -> HandlerResult {
        let name = require_arg(args)?;
        let entries = ctx.engine.list_entrants(ctx.scope, name).await?;
        if entries.is_empty() {
            return Ok(Reply::ok("There are no entries yet for this raffle."));
        }
        let ids: Vec<String> = entries.iter().map(u64::to_string).collect();
        Ok(Reply::ok(ids.join(" ")))
    }
}

/// `MENTION <name>`
pub struct MentionHandler;

#[async_trait]
impl Handler for MentionHandler {
    async fn handle(&self, ctx: &Context<'_>, args: &str) -> HandlerResult {
        let name = require_arg(args)?;
        Ok(match ctx.engine.mention_entrants(ctx.scope, name).await? {
            Some(mentions) => Reply::ok(mentions),
            None => Reply::error("no_entries", "There are no entries yet for this raffle."),
        })
    }
}

/// `INFO <name>`: the stored definition as JSON.
pub struct InfoHandler;

#[async_trait]
impl Handler for InfoHandler {
    async fn handle(&self, ctx: &Context<'_>, args: &str) -> HandlerResult {
        let name = require_arg(args)?;
        let def = ctx.engine.raffle_info(ctx.scope, name).await?;
        let json = serde_json::to_string(&def)
            .map_err(|e| HandlerError::BadArgument(format!("cannot encode raffle: {}", e)))?;
        Ok(Reply::ok(json))
    }
}

/// `LIST`: one raffle per line, with shortened descriptions.
pub struct ListHandler;

#[async_trait]
impl Handler for ListHandler {
    async fn handle(&self, ctx: &Context<'_>, _args: &str) -> HandlerResult {
        let raffles = ctx.engine.list_raffles(ctx.scope).await?;
        if raffles.is_empty() {
            return Ok(Reply::ok("There are no ongoing raffles."));
        }
        let lines: Vec<String> = raffles
            .into_iter()
            .map(|r| match r.description {
                Some(desc) => format!("{}: {}", r.name, desc),
                None => r.name,
            })
            .collect();
        Ok(Reply::ok(lines.join("\n")))
    }
}
