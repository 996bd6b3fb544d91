//! Session controller — state owner, transition queue and message dispatch
//!
//! `SessionController` owns the desired/displayed agents, the force-restart
//! flag, the lifecycle registry and the tab state. Inbound host messages
//! are applied synchronously. Anything that affects the session is pushed
//! onto a single-consumer queue so at most one transition runs at a time,
//! in scheduling order.

use crate::config::ControllerConfig;
use crate::error::Result;
use crate::pipeline::{self, TransitionSnapshot};
use crate::registry::{EndWaiter, LifecycleRegistry, StartWaiter};
use crate::transport::HostTransport;
use crate::types::{HostMessage, WebviewCommand};
use crate::visibility::{config_flag, Tab, TabState, UiState};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tracing::Instrument;

/// Mutable controller state, guarded by one lock
#[derive(Debug, Default)]
struct Inner {
    desired_agent_id: String,
    displayed_agent_id: String,
    force_restart: bool,
    transitioning: bool,
    tabs: TabState,
    last_error: Option<String>,
    registry: LifecycleRegistry,
}

impl Inner {
    fn ui_state(&self) -> UiState {
        UiState {
            desired_agent_id: self.desired_agent_id.clone(),
            displayed_agent_id: self.displayed_agent_id.clone(),
            session_active: self.registry.session_active(),
            transitioning: self.transitioning,
            tabs: self.tabs,
            last_error: self.last_error.clone(),
        }
    }
}

/// State shared between the controller handle and the transition worker
pub(crate) struct Shared {
    inner: Mutex<Inner>,
    pub(crate) transport: Arc<dyn HostTransport>,
    pub(crate) config: ControllerConfig,
    ui_tx: watch::Sender<UiState>,
    scheduled: AtomicU64,
    completed: watch::Sender<u64>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking run is caught at the queue tail; keep using the state
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutate state and publish the resulting UI snapshot
    ///
    /// Publishing happens under the lock so snapshots reach `ui_tx` in the
    /// same order the mutations were applied.
    fn update<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut inner = self.lock();
        let result = f(&mut inner);
        let snapshot = inner.ui_state();
        self.ui_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
        drop(inner);
        result
    }

    /// Capture run inputs, consuming the force-restart flag
    pub(crate) fn begin_run(&self) -> TransitionSnapshot {
        self.update(|inner| TransitionSnapshot {
            force_restart: std::mem::take(&mut inner.force_restart),
            previous_agent_id: inner.displayed_agent_id.clone(),
            next_agent_id: inner.desired_agent_id.clone(),
            session_active: inner.registry.session_active(),
        })
    }

    pub(crate) fn set_transitioning(&self, transitioning: bool) {
        self.update(|inner| inner.transitioning = transitioning);
    }

    pub(crate) fn clear_displayed(&self) {
        self.update(|inner| {
            inner.displayed_agent_id.clear();
            inner.transitioning = false;
        });
    }

    pub(crate) fn finish_start(&self, agent_id: &str) {
        self.update(|inner| {
            inner.displayed_agent_id = agent_id.to_string();
            inner.transitioning = false;
            inner.last_error = None;
        });
    }

    pub(crate) fn wait_for_session_end(&self) -> EndWaiter {
        self.lock().registry.wait_for_session_end()
    }

    pub(crate) fn wait_for_session_start(&self) -> StartWaiter {
        self.lock().registry.wait_for_session_start()
    }
}

/// Drives agent sessions for one webview
///
/// Must be created inside a Tokio runtime; it spawns the transition worker.
/// Dropping the controller aborts the worker, including a run stuck on a
/// host that never replies.
pub struct SessionController {
    shared: Arc<Shared>,
    queue: mpsc::UnboundedSender<()>,
    worker: JoinHandle<()>,
}

impl SessionController {
    /// Create a controller and spawn its transition worker
    ///
    /// Requests the tracer configuration from the host when
    /// `request_configuration_on_start` is set.
    pub async fn start(
        transport: Arc<dyn HostTransport>,
        config: ControllerConfig,
    ) -> Result<Self> {
        config.validate()?;

        let (ui_tx, _) = watch::channel(UiState::default());
        let (completed, _) = watch::channel(0);
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner::default()),
            transport,
            config,
            ui_tx,
            scheduled: AtomicU64::new(0),
            completed,
        });

        let (queue, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_queue(shared.clone(), rx));

        let controller = Self {
            shared,
            queue,
            worker,
        };

        tracing::info!(
            transport = controller.shared.transport.name(),
            "Session controller started"
        );

        if controller.shared.config.request_configuration_on_start {
            controller.request_configuration().await?;
        }

        Ok(controller)
    }

    /// Ask the host for the tracer configuration section
    pub async fn request_configuration(&self) -> Result<()> {
        self.shared
            .transport
            .send(WebviewCommand::GetConfiguration {
                section: self.shared.config.tracer_section.clone(),
            })
            .await
    }

    /// User picked an agent (empty string deselects)
    ///
    /// Returns whether a transition was scheduled; re-picking the desired
    /// agent is a no-op.
    pub fn select_agent(&self, agent_id: impl Into<String>) -> bool {
        let agent_id = agent_id.into();
        let changed = self.shared.update(|inner| {
            if inner.desired_agent_id == agent_id {
                false
            } else {
                inner.desired_agent_id = agent_id;
                true
            }
        });
        if changed {
            self.schedule();
        }
        changed
    }

    /// Tear down and recreate the session for the desired agent
    pub fn restart_session(&self) {
        self.shared.update(|inner| inner.force_restart = true);
        self.schedule();
    }

    /// Apply a message pushed by the host
    pub fn handle_message(&self, message: HostMessage) {
        tracing::debug!(command = message.name(), "Host message received");

        match message {
            HostMessage::Configuration { section, value } => {
                if section == self.shared.config.tracer_section {
                    let enabled = config_flag(&value);
                    self.shared
                        .update(|inner| inner.tabs.set_tracer_enabled(enabled));
                    tracing::debug!(enabled, "Tracer tab configured");
                } else {
                    tracing::debug!(section = %section, "Ignoring unrelated configuration");
                }
            }
            HostMessage::SelectAgent { agent_id } => {
                tracing::info!(agent_id = %agent_id, "Host selected agent");
                self.shared.update(|inner| {
                    inner.desired_agent_id = agent_id;
                    inner.force_restart = true;
                });
                self.schedule();
            }
            HostMessage::SessionStarting => {
                self.shared.update(|inner| inner.registry.on_session_starting());
            }
            HostMessage::SessionStarted => {
                self.shared.update(|inner| {
                    inner.registry.on_session_started();
                });
            }
            HostMessage::SessionEnded => {
                self.shared.update(|inner| {
                    inner.registry.on_session_ended();
                });
            }
            HostMessage::Error { message } => {
                tracing::warn!(error = %message, "Host reported session error");
                self.shared.update(|inner| {
                    inner.registry.on_error();
                    inner.last_error = Some(message);
                });
            }
        }
    }

    /// Parse and apply a raw JSON message from the host
    pub fn handle_json(&self, raw: &str) -> Result<()> {
        let message = HostMessage::from_json(raw)?;
        self.handle_message(message);
        Ok(())
    }

    /// Select a tab; the tracer tab falls back to preview when disabled
    pub fn set_active_tab(&self, tab: Tab) {
        self.shared.update(|inner| inner.tabs.select(tab));
    }

    /// Current UI snapshot
    pub fn ui_state(&self) -> UiState {
        self.shared.ui_tx.borrow().clone()
    }

    /// Watch UI state changes
    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.shared.ui_tx.subscribe()
    }

    /// UI state changes as a stream (yields the current state first)
    pub fn updates(&self) -> WatchStream<UiState> {
        WatchStream::new(self.subscribe())
    }

    /// Resolve once every transition scheduled so far has finished
    pub async fn settled(&self) {
        let target = self.shared.scheduled.load(Ordering::SeqCst);
        let mut completed = self.shared.completed.subscribe();
        // The sender lives in `shared`, which we hold; the wait cannot close
        let _ = completed.wait_for(|done| *done >= target).await;
    }

    /// Number of transitions finished so far
    pub fn completed_transitions(&self) -> u64 {
        *self.shared.completed.borrow()
    }

    fn schedule(&self) {
        self.shared.scheduled.fetch_add(1, Ordering::SeqCst);
        if self.queue.send(()).is_err() {
            self.shared.scheduled.fetch_sub(1, Ordering::SeqCst);
            tracing::error!("Transition worker is gone, dropping transition");
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("transport", &self.shared.transport.name())
            .field("state", &self.ui_state())
            .finish_non_exhaustive()
    }
}

/// Single consumer of the transition queue
///
/// Each run fully settles, error path included, before the next starts.
/// Failures and panics are logged and never stop the loop.
async fn run_queue(shared: Arc<Shared>, mut rx: mpsc::UnboundedReceiver<()>) {
    while rx.recv().await.is_some() {
        let run_id = format!("run-{}", uuid::Uuid::new_v4());
        let span = tracing::info_span!("transition", run_id = %run_id);

        let result = AssertUnwindSafe(pipeline::run(&shared).instrument(span))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(outcome)) => {
                tracing::debug!(run_id = %run_id, ?outcome, "Transition settled");
            }
            Ok(Err(e)) => {
                tracing::error!(run_id = %run_id, error = %e, "Transition failed");
                shared.set_transitioning(false);
            }
            Err(_) => {
                tracing::error!(run_id = %run_id, "Transition panicked");
                shared.set_transitioning(false);
            }
        }

        shared.completed.send_modify(|done| *done += 1);
    }

    tracing::debug!("Transition queue closed");
}
