//! Gateway command handlers.
//!
//! One request per line: `<scope> <actor> <VERB> [args]`. The [`Registry`]
//! maps verbs to [`Handler`]s, times each command, and turns every outcome
//! into exactly one [`Reply`] line.

mod create;
mod draw;
mod entry;
mod helpers;
mod query;
mod reaction;

pub use create::{CreateHandler, CreateReactHandler, EditHandler};
pub use draw::{DrawHandler, EndHandler};
pub use entry::{JoinHandler, KickHandler, LeaveHandler};
pub use query::{EntrantsHandler, InfoHandler, ListHandler, MentionHandler};
pub use reaction::{ReactHandler, UnreactHandler};

use crate::engine::RaffleEngine;
use crate::error::{HandlerError, HandlerResult};
use crate::raffle::{ScopeId, UserId};
use crate::telemetry::{CommandTimer, spans};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use tracing::{Instrument, debug, error};

/// One reply line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ok(String),
    Denied { code: &'static str, text: String },
    Err { code: &'static str, text: String },
}

impl Reply {
    pub fn ok(text: impl Into<String>) -> Self {
        Self::Ok(text.into())
    }

    pub fn denied(code: &'static str, text: impl Into<String>) -> Self {
        Self::Denied {
            code,
            text: text.into(),
        }
    }

    pub fn error(code: &'static str, text: impl Into<String>) -> Self {
        Self::Err {
            code,
            text: text.into(),
        }
    }
}

/// Line breaks inside a reply are sent as a literal `\n`.
pub fn escape_line(text: &str) -> String {
    text.replace('\r', "").replace('\n', "\\n")
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok(text) => write!(f, "OK {}", escape_line(text)),
            Self::Denied { code, text } => write!(f, "DENIED {} {}", code, escape_line(text)),
            Self::Err { code, text } => write!(f, "ERR {} {}", code, escape_line(text)),
        }
    }
}

/// A parsed request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request<'a> {
    pub scope: ScopeId,
    pub actor: UserId,
    pub verb: String,
    pub args: &'a str,
}

impl<'a> Request<'a> {
    pub fn parse(line: &'a str) -> Result<Self, HandlerError> {
        let mut parts = line.trim().splitn(4, ' ');
        let (Some(scope), Some(actor), Some(verb)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(HandlerError::NeedMoreParams);
        };
        Ok(Self {
            scope: helpers::parse_id("scope", scope)?,
            actor: helpers::parse_id("actor", actor)?,
            verb: verb.to_ascii_uppercase(),
            args: parts.next().unwrap_or("").trim(),
        })
    }
}

/// Handler context passed to each command handler.
pub struct Context<'a> {
    pub engine: &'a RaffleEngine,
    pub scope: ScopeId,
    pub actor: UserId,
}

/// Trait implemented by all command handlers.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, ctx: &Context<'_>, args: &str) -> HandlerResult;
}

/// Registry of command handlers.
pub struct Registry {
    handlers: HashMap<&'static str, Box<dyn Handler>>,
}

impl Registry {
    /// Create a new registry with all handlers registered.
    pub fn new() -> Self {
        let mut handlers: HashMap<&'static str, Box<dyn Handler>> = HashMap::new();

        // Creation and editing
        handlers.insert("CREATE", Box::new(CreateHandler));
        handlers.insert("CREATEREACT", Box::new(CreateReactHandler));
        handlers.insert("EDIT", Box::new(EditHandler));

        // Entrants
        handlers.insert("JOIN", Box::new(JoinHandler));
        handlers.insert("LEAVE", Box::new(LeaveHandler));
        handlers.insert("KICK", Box::new(KickHandler));

        // Draw and end
        handlers.insert("DRAW", Box::new(DrawHandler));
        handlers.insert("END", Box::new(EndHandler));

        // Queries
        handlers.insert("ENTRANTS", Box::new(EntrantsHandler));
        handlers.insert("MENTION", Box::new(MentionHandler));
        handlers.insert("INFO", Box::new(InfoHandler));
        handlers.insert("LIST", Box::new(ListHandler));

        // Reaction events
        handlers.insert("REACT", Box::new(ReactHandler));
        handlers.insert("UNREACT", Box::new(UnreactHandler));

        Self { handlers }
    }

    /// Parse and run one request line.
    pub async fn dispatch_line(&self, engine: &RaffleEngine, line: &str) -> Reply {
        match Request::parse(line) {
            Ok(request) => self.dispatch(engine, &request).await,
            Err(e) => e.to_reply(),
        }
    }

    /// Dispatch a request to the appropriate handler.
    pub async fn dispatch(&self, engine: &RaffleEngine, request: &Request<'_>) -> Reply {
        let Some((name, handler)) = self.handlers.get_key_value(request.verb.as_str()) else {
            return HandlerError::UnknownCommand(request.verb.clone()).to_reply();
        };
        let name: &'static str = *name;
        let _timer = CommandTimer::new(name);

        let ctx = Context {
            engine,
            scope: request.scope,
            actor: request.actor,
        };
        let span = spans::command(name, request.scope, request.actor);
        let result = handler.handle(&ctx, request.args).instrument(span).await;

        match result {
            Ok(reply) => reply,
            Err(e) => {
                crate::metrics::record_command_error(name, e.error_code());
                if e.is_fatal() {
                    error!(command = %name, scope = request.scope, error = %e, "Command failed");
                } else {
                    debug!(command = %name, scope = request.scope, error = %e, "Command rejected");
                }
                e.to_reply()
            }
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
