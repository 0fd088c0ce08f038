//! Test server management.
//!
//! Spawns `raffled` with a generated config and the shared roster.

use std::path::PathBuf;
use std::process::{Child, Command};
use std::time::Duration;
use tokio::time::sleep;

/// A running test server instance.
pub struct TestServer {
    child: Child,
    port: u16,
    data_dir: PathBuf,
}

impl TestServer {
    /// Spawn a new test server on the given port.
    pub async fn spawn(port: u16) -> anyhow::Result<Self> {
        let data_dir = std::env::temp_dir().join(format!("raffled-test-{}", port));
        std::fs::create_dir_all(&data_dir)?;

        let roster_path = data_dir.join("roster.toml");
        std::fs::write(&roster_path, super::ROSTER)?;

        let config_path = data_dir.join("config.toml");
        let config_content = format!(
            r#"
[server]
name = "test.raffled"
metrics_port = 0

[listen]
address = "127.0.0.1:{}"

[store]
backend = "memory"

[directory]
roster = "{}"

[raffle]
default_suspense_secs = 0
rng_seed = 7
"#,
            port,
            roster_path.display()
        );
        std::fs::write(&config_path, config_content)?;

        let child = Command::new(env!("CARGO_BIN_EXE_raffled"))
            .arg(&config_path)
            .env("RUST_LOG", "warn")
            .spawn()?;

        let server = Self {
            child,
            port,
            data_dir,
        };

        server.wait_until_ready().await?;
        Ok(server)
    }

    /// Wait until the server is accepting connections.
    async fn wait_until_ready(&self) -> anyhow::Result<()> {
        for _ in 0..30 {
            if tokio::net::TcpStream::connect(self.address()).await.is_ok() {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("Server did not become ready in time")
    }

    /// Get the server's address.
    pub fn address(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    /// Connect a client to this server.
    #[allow(dead_code)]
    pub async fn connect(&self) -> anyhow::Result<super::TestClient> {
        super::TestClient::connect(&self.address(), super::LOBBY).await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_dir_all(&self.data_dir);
    }
}
