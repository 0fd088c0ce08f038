//! Outbound notifications.
//!
//! The engine hands formatted text to a [`NotificationSink`]. Delivery
//! failures are reported back so the caller can fall back (a refused DM
//! goes to the channel instead), but they never undo state changes.

use crate::raffle::{ChannelId, ScopeId, UserId};
use async_trait::async_trait;
use dashmap::DashSet;
use std::fmt;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    User(UserId),
    Channel(ChannelId),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{}", id),
            Self::Channel(id) => write!(f, "channel:{}", id),
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("cannot deliver to {0}")]
    Undeliverable(Target),
    #[error("notification channel closed")]
    Closed,
}

/// A delivered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub scope: ScopeId,
    pub target: Target,
    pub text: String,
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, scope: ScopeId, target: Target, text: &str) -> Result<(), NotifyError>;
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn send(&self, scope: ScopeId, target: Target, text: &str) -> Result<(), NotifyError> {
        info!(scope, target = %target, text, "notification");
        Ok(())
    }
}

/// Fans notifications out to every subscriber (gateway sessions).
pub struct BroadcastSink {
    tx: broadcast::Sender<Notice>,
    closed_dms: DashSet<UserId>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            closed_dms: DashSet::new(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    /// Refuse direct messages to `user` from now on.
    pub fn close_dms(&self, user: UserId) {
        self.closed_dms.insert(user);
    }
}

#[async_trait]
impl NotificationSink for BroadcastSink {
    async fn send(&self, scope: ScopeId, target: Target, text: &str) -> Result<(), NotifyError> {
        if let Target::User(user) = target
            && self.closed_dms.contains(&user)
        {
            return Err(NotifyError::Undeliverable(target));
        }
        self.tx
            .send(Notice {
                scope,
                target,
                text: text.to_string(),
            })
            .map(|_| ())
            .map_err(|_| NotifyError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_reaches_subscribers() {
        let sink = BroadcastSink::new(8);
        let mut rx = sink.subscribe();
        sink.send(1, Target::Channel(5), "hello").await.unwrap();
        let notice = rx.recv().await.unwrap();
        assert_eq!(notice.target, Target::Channel(5));
        assert_eq!(notice.text, "hello");
    }

    #[tokio::test]
    async fn test_closed_dms_are_undeliverable() {
        let sink = BroadcastSink::new(8);
        let _rx = sink.subscribe();
        sink.close_dms(9);
        assert!(matches!(
            sink.send(1, Target::User(9), "hi").await,
            Err(NotifyError::Undeliverable(Target::User(9)))
        ));
        assert!(sink.send(1, Target::User(8), "hi").await.is_ok());
    }

    #[tokio::test]
    async fn test_no_subscribers_is_closed() {
        let sink = BroadcastSink::new(8);
        assert!(matches!(
            sink.send(1, Target::Channel(1), "x").await,
            Err(NotifyError::Closed)
        ));
    }

    #[test]
    fn test_target_display() {
        assert_eq!(Target::User(3).to_string(), "user:3");
        assert_eq!(Target::Channel(4).to_string(), "channel:4");
    }
}
