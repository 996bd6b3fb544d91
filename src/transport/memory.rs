//! In-memory transport for tests and single-process use

use super::HostTransport;
use crate::error::{Result, SessionError};
use crate::types::WebviewCommand;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, Mutex};

/// Records every command and replays them through an awaitable queue
pub struct MemoryTransport {
    sent: Mutex<Vec<WebviewCommand>>,
    outbox: mpsc::UnboundedSender<WebviewCommand>,
    inbox: Mutex<mpsc::UnboundedReceiver<WebviewCommand>>,
    fail_next: AtomicBool,
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("fail_next", &self.fail_next.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl MemoryTransport {
    /// Create an empty transport
    pub fn new() -> Self {
        let (outbox, inbox) = mpsc::unbounded_channel();
        Self {
            sent: Mutex::new(Vec::new()),
            outbox,
            inbox: Mutex::new(inbox),
            fail_next: AtomicBool::new(false),
        }
    }

    /// Wait for the next command the controller sends
    pub async fn next_command(&self) -> Option<WebviewCommand> {
        self.inbox.lock().await.recv().await
    }

    /// Take the next command if one is already queued
    pub async fn try_next_command(&self) -> Option<WebviewCommand> {
        self.inbox.lock().await.try_recv().ok()
    }

    /// All commands sent so far, in order
    pub async fn sent_commands(&self) -> Vec<WebviewCommand> {
        self.sent.lock().await.clone()
    }

    /// Number of sent commands with the given wire name
    pub async fn count(&self, name: &str) -> usize {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|c| c.name() == name)
            .count()
    }

    /// Make the next `send` fail with a transport error
    pub fn fail_next_send(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HostTransport for MemoryTransport {
    async fn send(&self, command: WebviewCommand) -> Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(SessionError::Transport(format!(
                "injected failure sending '{}'",
                command.name()
            )));
        }
        self.sent.lock().await.push(command.clone());
        self.outbox
            .send(command)
            .map_err(|_| SessionError::ChannelClosed)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
