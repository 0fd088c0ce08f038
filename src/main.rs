//! raffled - raffle daemon.

use raffled::config::{Config, StoreBackend, validation};
use raffled::directory::{Directory, Roster};
use raffled::engine::{EngineSettings, RaffleEngine, SeededRandom};
use raffled::network::Gateway;
use raffled::notify::BroadcastSink;
use raffled::store::{MemoryStore, RaffleStore, RedbStore};
use raffled::{http, metrics};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = validation::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("{} configuration error(s) in {}", errors.len(), config_path);
    }

    info!(
        server = %config.server.name,
        listen = %config.listen.address,
        store = ?config.store.backend,
        "Starting raffled"
    );

    // Storage
    let store: Arc<dyn RaffleStore> = match config.store.backend {
        StoreBackend::Memory => {
            warn!("Using in-memory store; raffles will not survive a restart");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Redb => {
            let store = RedbStore::new(&config.store.path)?;
            info!(path = %config.store.path, "Redb store opened");
            Arc::new(store)
        }
    };

    // Directory
    let roster = match config.directory.roster {
        Some(ref path) => Roster::load(path)?,
        None => {
            warn!("No roster configured; every scope and user is unknown");
            Roster::new()
        }
    };

    // Notifications fan out to every gateway session
    let notices = Arc::new(BroadcastSink::new(config.listen.notice_capacity));
    for user in roster.users_refusing_dms() {
        notices.close_dms(user);
    }
    let directory: Arc<dyn Directory> = Arc::new(roster);

    let settings = EngineSettings {
        default_suspense: Duration::from_secs(config.raffle.default_suspense_secs),
        platform_epoch: config.raffle.platform_epoch,
        mention_format: config.raffle.mention_format.clone(),
    };
    let mut engine = RaffleEngine::new(store, directory, notices.clone(), settings);
    if let Some(seed) = config.raffle.rng_seed {
        info!(seed, "Using seeded random source");
        engine = engine.with_random(Arc::new(SeededRandom::new(seed)));
    }
    let engine = Arc::new(engine);

    // Prometheus metrics
    let metrics_port = config.server.metrics_port;
    if metrics_port != 0 {
        metrics::init();
        info!("Metrics initialized");

        tokio::spawn(async move {
            http::run_http_server(metrics_port).await;
        });
        info!(port = metrics_port, "Prometheus HTTP server started");
    }

    let addr: SocketAddr = config.listen.address.parse()?;
    let gateway = Gateway::bind(addr, engine, notices).await?;
    info!(addr = %gateway.local_addr()?, "raffled ready");

    gateway.run().await
}
