//! CREATE, CREATEREACT and EDIT.

use super::helpers::{ensure_manager, parse_definition, parse_id, split_arg};
use super::{Context, Handler, Reply};
use crate::error::HandlerResult;
use async_trait::async_trait;

/// `CREATE <json>`
pub struct CreateHandler;

#[async_trait]
impl Handler for CreateHandler {
    async fn handle(&self, ctx: &Context<'_>, args: &str) -> HandlerResult {
        let raw = parse_definition(args)?;
        let def = ctx.engine.create_raffle(ctx.scope, &raw, ctx.actor).await?;
        Ok(Reply::ok(format!(
            "Raffle created with the name \"{}\".",
            def.name
        )))
    }
}

/// `CREATEREACT <channel> <message> <json>`
pub struct CreateReactHandler;

#[async_trait]
impl Handler for CreateReactHandler {
    async fn handle(&self, ctx: &Context<'_>, args: &str) -> HandlerResult {
        let (channel, rest) = split_arg(args)?;
        let (message, rest) = split_arg(rest)?;
        let channel = parse_id("channel", channel)?;
        let message = parse_id("message", message)?;
        let raw = parse_definition(rest)?;

        let def = ctx
            .engine
            .create_reaction_raffle(ctx.scope, &raw, ctx.actor, channel, message)
            .await?;
        Ok(Reply::ok(format!(
            "Reaction raffle created with the name \"{}\". React with {} to enter.",
            def.name,
            def.reaction_emoji.as_deref().unwrap_or_default()
        )))
    }
}

/// `EDIT <name> <json>`
pub struct EditHandler;

#[async_trait]
impl Handler for EditHandler {
    async fn handle(&self, ctx: &Context<'_>, args: &str) -> HandlerResult {
        let (name, rest) = split_arg(args)?;
        ensure_manager(ctx, name).await?;
        let raw = parse_definition(rest)?;
        let def = ctx.engine.edit_raffle(ctx.scope, name, &raw).await?;
        Ok(Reply::ok(format!("Raffle \"{}\" has been edited.", def.name)))
    }
}
