//! # agent-session
//!
//! Serialized agent-session transitions for an agent preview webview.
//!
//! ## Overview
//!
//! The webview never owns a session. It asks its host to start or end one
//! and learns the outcome from lifecycle messages pushed back over an
//! uncorrelated, ordered message bridge. `agent-session` turns that bridge
//! into a small cooperative state machine:
//!
//! - agent switches and forced restarts are queued so one transition runs
//!   at a time, and each run reads the *latest* desired agent, collapsing
//!   rapid switches into a single end + start
//! - start/end requests await host lifecycle messages through FIFO
//!   resolver queues that tolerate orphaned and error replies
//! - the displayed agent only changes after the host confirms a start
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use agent_session::{ControllerConfig, HostMessage, MemoryTransport, SessionController};
//!
//! # async fn example() -> agent_session::Result<()> {
//! let transport = Arc::new(MemoryTransport::new());
//! let config = ControllerConfig {
//!     request_configuration_on_start: false,
//!     ..Default::default()
//! };
//! let controller = SessionController::start(transport.clone(), config).await?;
//!
//! controller.select_agent("0Xx000000000001");
//!
//! // The host receives `startSession` and replies once the session is live
//! let _start = transport.next_command().await;
//! controller.handle_message(HostMessage::SessionStarted);
//! controller.settled().await;
//!
//! assert_eq!(controller.ui_state().displayed_agent_id, "0Xx000000000001");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **HostTransport** trait — outbound bridge to the host
//! - **LifecycleRegistry** — session-active flag and resolver queues
//! - **pipeline** — the per-run transition state machine
//! - **SessionController** — state owner, transition queue, message dispatch
//! - **UiState** — derived view state (tabs, transitioning)

pub mod config;
pub mod controller;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod transport;
pub mod types;
pub mod visibility;

// Re-export core types
pub use config::{ControllerConfig, DEFAULT_TRACER_SECTION};
pub use controller::SessionController;
pub use error::{Result, SessionError};
pub use pipeline::{TransitionOutcome, TransitionSnapshot};
pub use registry::{EndWaiter, LifecycleRegistry, StartWaiter};
pub use transport::{ChannelTransport, HostTransport, MemoryTransport};
pub use types::{HostMessage, WebviewCommand};
pub use visibility::{Tab, TabState, UiState};
