//! Argument parsing and permission helpers shared by handlers.

use super::Context;
use crate::error::HandlerError;
use serde_json::Value;

/// Parse a numeric id argument.
pub fn parse_id(what: &str, raw: &str) -> Result<u64, HandlerError> {
    raw.parse().map_err(|_| {
        HandlerError::BadArgument(format!("{} must be a numeric id, got \"{}\"", what, raw))
    })
}

/// Split off the first space-separated argument.
pub fn split_arg(args: &str) -> Result<(&str, &str), HandlerError> {
    let args = args.trim_start();
    if args.is_empty() {
        return Err(HandlerError::NeedMoreParams);
    }
    Ok(match args.split_once(' ') {
        Some((first, rest)) => (first, rest.trim_start()),
        None => (args, ""),
    })
}

/// The single remaining argument, which must be present.
pub fn require_arg(args: &str) -> Result<&str, HandlerError> {
    let arg = args.trim();
    if arg.is_empty() {
        return Err(HandlerError::NeedMoreParams);
    }
    Ok(arg)
}

/// Parse a raffle definition document.
pub fn parse_definition(raw: &str) -> Result<Value, HandlerError> {
    let raw = require_arg(raw)?;
    serde_json::from_str(raw)
        .map_err(|e| HandlerError::BadArgument(format!("definition is not valid JSON: {}", e)))
}

/// Fail unless the actor owns the raffle or manages the scope.
pub async fn ensure_manager(ctx: &Context<'_>, name: &str) -> Result<(), HandlerError> {
    if ctx.engine.can_manage(ctx.scope, name, ctx.actor).await? {
        Ok(())
    } else {
        Err(HandlerError::NotPermitted)
    }
}
