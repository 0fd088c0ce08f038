//! Test gateway client.
//!
//! Sends `<scope> <actor> <VERB> [args]` lines and reads reply and
//! `NOTICE` lines back.

use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

/// A test client bound to one scope.
pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
    scope: u64,
}

impl TestClient {
    /// Connect to a test server.
    pub async fn connect(address: &str, scope: u64) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(address).await?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
            scope,
        })
    }

    /// Send a raw line.
    pub async fn send_raw(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        if !line.ends_with('\n') {
            self.writer.write_all(b"\n").await?;
        }
        self.writer.flush().await?;
        Ok(())
    }

    /// Send `VERB args` as `actor` in this client's scope.
    pub async fn send(&mut self, actor: u64, command: &str) -> anyhow::Result<()> {
        let line = format!("{} {} {}", self.scope, actor, command);
        self.send_raw(&line).await
    }

    /// Receive a single line.
    pub async fn recv(&mut self) -> anyhow::Result<String> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    /// Receive a line with a timeout.
    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<String> {
        let mut line = String::new();
        let read = timeout(dur, self.reader.read_line(&mut line)).await??;
        if read == 0 {
            anyhow::bail!("connection closed");
        }
        Ok(line.trim_end().to_string())
    }

    /// Receive lines until the predicate matches; returns all of them.
    pub async fn recv_until<F>(&mut self, mut predicate: F) -> anyhow::Result<Vec<String>>
    where
        F: FnMut(&str) -> bool,
    {
        let mut lines = Vec::new();
        loop {
            let line = self.recv().await?;
            let done = predicate(&line);
            lines.push(line);
            if done {
                break;
            }
        }
        Ok(lines)
    }

    /// Send a command and return its reply, skipping interleaved notices.
    pub async fn request(&mut self, actor: u64, command: &str) -> anyhow::Result<String> {
        self.send(actor, command).await?;
        let lines = self.recv_until(|l| !l.starts_with("NOTICE ")).await?;
        lines
            .last()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no reply"))
    }
}
