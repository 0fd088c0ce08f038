//! Connection - handles one gateway session.
//!
//! Each Connection runs in its own Tokio task and multiplexes two streams
//! with `tokio::select!`: request lines from the peer, each answered with
//! exactly one reply line, and notices broadcast by the engine.

use crate::engine::RaffleEngine;
use crate::handlers::{Registry, escape_line};
use crate::notify::Notice;
use crate::telemetry::spans;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{Instrument, debug, info, warn};

/// Longest accepted request line, in bytes.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

pub struct Connection {
    addr: SocketAddr,
    stream: TcpStream,
    engine: Arc<RaffleEngine>,
    registry: Arc<Registry>,
    notices: broadcast::Receiver<Notice>,
}

impl Connection {
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        engine: Arc<RaffleEngine>,
        registry: Arc<Registry>,
        notices: broadcast::Receiver<Notice>,
    ) -> Self {
        Self {
            addr,
            stream,
            engine,
            registry,
            notices,
        }
    }

    /// Run the session until the peer disconnects.
    pub async fn run(self) -> anyhow::Result<()> {
        let span = spans::connection(self.addr);
        self.serve().instrument(span).await
    }

    async fn serve(mut self) -> anyhow::Result<()> {
        info!("Session opened");
        crate::metrics::session_opened();

        let mut framed = Framed::new(
            self.stream,
            LinesCodec::new_with_max_length(MAX_LINE_LENGTH),
        );

        let result = loop {
            tokio::select! {
                line = framed.next() => {
                    match line {
                        Some(Ok(line)) => {
                            if line.trim().is_empty() {
                                continue;
                            }
                            debug!(raw = %line, "Received request");
                            let reply = self.registry.dispatch_line(&self.engine, &line).await;
                            if let Err(e) = framed.send(reply.to_string()).await {
                                break Err(e.into());
                            }
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "Read error");
                            break Err(e.into());
                        }
                        None => break Ok(()),
                    }
                }
                notice = self.notices.recv() => {
                    match notice {
                        Ok(notice) => {
                            let line = format!(
                                "NOTICE {} {}",
                                notice.target,
                                escape_line(&notice.text)
                            );
                            if let Err(e) = framed.send(line).await {
                                break Err(e.into());
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Session lagging, notices dropped");
                        }
                        Err(RecvError::Closed) => break Ok(()),
                    }
                }
            }
        };

        crate::metrics::session_closed();
        info!("Session closed");
        result
    }
}
