//! Host transport trait — the outbound half of the webview/host bridge
//!
//! The bridge is ordered and at-most-once per send. Replies are not
//! correlated to requests; they arrive as `HostMessage`s fed into the
//! controller by whoever owns the inbound side.

use crate::error::Result;
use crate::types::WebviewCommand;
use async_trait::async_trait;

pub mod channel;
pub mod memory;

pub use channel::ChannelTransport;
pub use memory::MemoryTransport;

/// Outbound channel from the webview to the host
#[async_trait]
pub trait HostTransport: Send + Sync {
    /// Deliver a command to the host
    async fn send(&self, command: WebviewCommand) -> Result<()>;

    /// Transport name (e.g., "memory", "channel")
    fn name(&self) -> &str;
}
