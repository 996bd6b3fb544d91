//! Transition pipeline — one logical agent-session transition
//!
//! A run captures the desired/displayed agents, the one-shot force-restart
//! flag and the session-active flag at the moment it starts executing (not
//! when it was scheduled), then ends the current session, starts the next
//! one, both, or neither. End always completes before start is requested.

use crate::controller::Shared;
use crate::error::{Result, SessionError};
use crate::types::WebviewCommand;
use std::future::Future;

/// Inputs of a run, captured when it starts executing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionSnapshot {
    /// One-shot force-restart flag (consumed by the run)
    pub force_restart: bool,
    /// Displayed agent before the run
    pub previous_agent_id: String,
    /// Desired agent the run converges to
    pub next_agent_id: String,
    /// Session-active flag before the run
    pub session_active: bool,
}

impl TransitionSnapshot {
    pub fn has_existing_agent(&self) -> bool {
        !self.previous_agent_id.is_empty()
    }

    pub fn has_target_agent(&self) -> bool {
        !self.next_agent_id.is_empty()
    }

    pub fn changing_agents(&self) -> bool {
        self.force_restart || self.previous_agent_id != self.next_agent_id
    }

    /// Nothing displayed, nothing desired, nothing forced
    pub fn is_idle(&self) -> bool {
        !self.changing_agents() && !self.has_existing_agent() && !self.has_target_agent()
    }

    /// Whether the UI should show the transitioning state for this run
    pub fn marks_transitioning(&self) -> bool {
        self.changing_agents() || self.force_restart
    }

    /// An end-session round trip is needed before anything else
    pub fn needs_end(&self) -> bool {
        self.has_existing_agent() && self.marks_transitioning() && self.session_active
    }

    /// A start-session round trip is needed
    pub fn should_start(&self) -> bool {
        self.has_target_agent()
            && (self.changing_agents() || self.force_restart || !self.session_active)
    }
}

/// How a run settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Nothing displayed or desired
    Idle,
    /// Target unchanged with a live session
    Unchanged,
    /// No target agent; displayed agent cleared
    Cleared,
    /// New session started and displayed
    Started,
    /// Host refused or failed the start; displayed agent untouched
    StartFailed,
}

/// Execute one transition against the shared controller state
pub(crate) async fn run(shared: &Shared) -> Result<TransitionOutcome> {
    let snapshot = shared.begin_run();

    if snapshot.is_idle() {
        return Ok(TransitionOutcome::Idle);
    }

    if snapshot.marks_transitioning() {
        shared.set_transitioning(true);
    }

    if snapshot.needs_end() {
        // Register before sending so a fast reply cannot slip past
        let ended = shared.wait_for_session_end();
        if ended.is_immediate() {
            tracing::debug!(
                agent_id = %snapshot.previous_agent_id,
                "Session already inactive, skipping end request"
            );
        } else {
            tracing::info!(agent_id = %snapshot.previous_agent_id, "Ending session");
            shared.transport.send(WebviewCommand::EndSession).await?;
            with_deadline(shared, ended)
                .await
                .ok_or_else(|| SessionError::Timeout("waiting for sessionEnded".to_string()))?;
        }
    }

    if !snapshot.has_target_agent() {
        shared.clear_displayed();
        tracing::info!(agent_id = %snapshot.previous_agent_id, "Agent deselected");
        return Ok(TransitionOutcome::Cleared);
    }

    if !snapshot.should_start() {
        shared.set_transitioning(false);
        return Ok(TransitionOutcome::Unchanged);
    }

    let started = shared.wait_for_session_start();
    tracing::info!(
        agent_id = %snapshot.next_agent_id,
        force = snapshot.force_restart,
        "Starting session"
    );
    shared
        .transport
        .send(WebviewCommand::StartSession {
            agent_id: snapshot.next_agent_id.clone(),
        })
        .await?;

    let success = match with_deadline(shared, started).await {
        Some(success) => success,
        None => {
            tracing::warn!(
                agent_id = %snapshot.next_agent_id,
                "Timed out waiting for sessionStarted"
            );
            false
        }
    };

    if success {
        shared.finish_start(&snapshot.next_agent_id);
        tracing::info!(agent_id = %snapshot.next_agent_id, "Session started");
        Ok(TransitionOutcome::Started)
    } else {
        shared.set_transitioning(false);
        tracing::warn!(agent_id = %snapshot.next_agent_id, "Session failed to start");
        Ok(TransitionOutcome::StartFailed)
    }
}

/// Await a lifecycle waiter, bounded by the configured timeout if any
async fn with_deadline<F: Future>(shared: &Shared, waiter: F) -> Option<F::Output> {
    match shared.config.lifecycle_timeout() {
        Some(deadline) => tokio::time::timeout(deadline, waiter).await.ok(),
        None => Some(waiter.await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(force: bool, previous: &str, next: &str, active: bool) -> TransitionSnapshot {
        TransitionSnapshot {
            force_restart: force,
            previous_agent_id: previous.to_string(),
            next_agent_id: next.to_string(),
            session_active: active,
        }
    }

    #[test]
    fn test_idle() {
        let s = snapshot(false, "", "", false);
        assert!(s.is_idle());
        assert!(!s.marks_transitioning());
    }

    #[test]
    fn test_forced_with_nothing_selected_is_not_idle() {
        let s = snapshot(true, "", "", false);
        assert!(!s.is_idle());
        assert!(!s.needs_end());
        assert!(!s.should_start());
    }

    #[test]
    fn test_first_selection_starts_without_end() {
        let s = snapshot(false, "", "a1", false);
        assert!(s.marks_transitioning());
        assert!(!s.needs_end());
        assert!(s.should_start());
    }

    #[test]
    fn test_switch_with_active_session_ends_then_starts() {
        let s = snapshot(false, "a1", "a2", true);
        assert!(s.needs_end());
        assert!(s.should_start());
    }

    #[test]
    fn test_switch_with_inactive_session_skips_end() {
        let s = snapshot(false, "a1", "a2", false);
        assert!(!s.needs_end());
        assert!(s.should_start());
    }

    #[test]
    fn test_steady_state_is_unchanged() {
        let s = snapshot(false, "a1", "a1", true);
        assert!(!s.is_idle());
        assert!(!s.marks_transitioning());
        assert!(!s.needs_end());
        assert!(!s.should_start());
    }

    #[test]
    fn test_same_agent_with_dead_session_restarts() {
        let s = snapshot(false, "a1", "a1", false);
        assert!(!s.marks_transitioning());
        assert!(!s.needs_end());
        assert!(s.should_start());
    }

    #[test]
    fn test_force_restart_same_agent() {
        let s = snapshot(true, "a1", "a1", true);
        assert!(s.changing_agents());
        assert!(s.needs_end());
        assert!(s.should_start());
    }

    #[test]
    fn test_deselect() {
        let s = snapshot(false, "a1", "", true);
        assert!(s.needs_end());
        assert!(!s.has_target_agent());
        assert!(!s.should_start());
    }
}
