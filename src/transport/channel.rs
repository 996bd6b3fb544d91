//! JSON channel transport — the shape of a `postMessage` bridge
//!
//! Each command is serialized to its wire form and pushed into a bounded
//! mpsc channel. The receiving end forwards the strings to the host.

use super::HostTransport;
use crate::error::{Result, SessionError};
use crate::types::WebviewCommand;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Default channel capacity
pub const DEFAULT_CAPACITY: usize = 64;

/// Transport that emits serialized commands on a channel
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::Sender<String>,
}

impl ChannelTransport {
    /// Create a transport and the receiver the host side drains
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Wrap an existing sender
    pub fn from_sender(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl HostTransport for ChannelTransport {
    async fn send(&self, command: WebviewCommand) -> Result<()> {
        let payload = command.to_json()?;
        self.tx
            .send(payload)
            .await
            .map_err(|_| SessionError::ChannelClosed)?;

        tracing::trace!(command = command.name(), "Command posted to host");
        Ok(())
    }

    fn name(&self) -> &str {
        "channel"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_commands_arrive_as_json() {
        let (transport, mut rx) = ChannelTransport::new(DEFAULT_CAPACITY);
        transport
            .send(WebviewCommand::StartSession {
                agent_id: "a1".to_string(),
            })
            .await
            .unwrap();

        let raw = rx.recv().await.unwrap();
        let parsed: WebviewCommand = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            parsed,
            WebviewCommand::StartSession {
                agent_id: "a1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_closed_receiver_is_error() {
        let (transport, rx) = ChannelTransport::new(1);
        drop(rx);
        let err = transport.send(WebviewCommand::EndSession).await.unwrap_err();
        assert!(matches!(err, SessionError::ChannelClosed));
    }

    #[tokio::test]
    async fn test_zero_capacity_is_clamped() {
        let (transport, mut rx) = ChannelTransport::new(0);
        transport.send(WebviewCommand::EndSession).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), r#"{"command":"endSession"}"#);
        assert_eq!(transport.name(), "channel");
    }
}
