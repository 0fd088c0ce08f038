//! Gateway - TCP listener that accepts gateway sessions.

use crate::engine::RaffleEngine;
use crate::handlers::Registry;
use crate::network::Connection;
use crate::notify::BroadcastSink;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, instrument};

pub struct Gateway {
    listener: TcpListener,
    engine: Arc<RaffleEngine>,
    registry: Arc<Registry>,
    notices: Arc<BroadcastSink>,
}

impl Gateway {
    /// Bind the gateway to `addr`.
    pub async fn bind(
        addr: SocketAddr,
        engine: Arc<RaffleEngine>,
        notices: Arc<BroadcastSink>,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "Gateway listener bound");
        Ok(Self {
            listener,
            engine,
            registry: Arc::new(Registry::new()),
            notices,
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the gateway, accepting sessions forever.
    #[instrument(skip(self), name = "gateway")]
    pub async fn run(self) -> anyhow::Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    info!(%addr, "Connection accepted");
                    let connection = Connection::new(
                        stream,
                        addr,
                        Arc::clone(&self.engine),
                        Arc::clone(&self.registry),
                        self.notices.subscribe(),
                    );
                    tokio::spawn(async move {
                        if let Err(e) = connection.run().await {
                            error!(%addr, error = %e, "Connection error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}
