//! Telemetry utilities for command timing and span construction.

use std::time::Instant;

/// Guard for timing command execution and recording metrics.
///
/// Records command latency when dropped.
pub struct CommandTimer {
    command: &'static str,
    start: Instant,
}

impl CommandTimer {
    pub fn new(command: &'static str) -> Self {
        Self {
            command,
            start: Instant::now(),
        }
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_command(self.command, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use crate::raffle::{ScopeId, UserId};
    use std::net::SocketAddr;
    use tracing::{Span, info_span};

    /// Span for one gateway connection.
    pub fn connection(peer: SocketAddr) -> Span {
        info_span!("connection", peer = %peer)
    }

    /// Span for one command execution.
    pub fn command(name: &str, scope: ScopeId, actor: UserId) -> Span {
        info_span!("command", name = %name, scope, actor)
    }
}
