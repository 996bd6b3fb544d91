//! Lifecycle resolver registry
//!
//! Bridges unsolicited host lifecycle messages to the transition pipeline
//! awaiting them. Two FIFO queues hold single-use resolvers: one for
//! "session ended" waiters and one for "session started" waiters. The
//! serialized pipeline is the only producer, so shifting the front entry
//! on message arrival always resolves the right waiter.
//!
//! The registry also owns the session-active flag, the single source of
//! truth for whether an end-session round trip is needed.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Pending "session ended" wait
///
/// Resolves immediately when no session was active at creation.
#[derive(Debug)]
pub struct EndWaiter(Option<oneshot::Receiver<()>>);

impl EndWaiter {
    /// Whether the wait completed without suspending
    pub fn is_immediate(&self) -> bool {
        self.0.is_none()
    }
}

impl Future for EndWaiter {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        match self.0.as_mut() {
            None => Poll::Ready(()),
            // A dropped resolver still unblocks the waiter
            Some(rx) => Pin::new(rx).poll(cx).map(|_| ()),
        }
    }
}

/// Pending "session started" wait, resolving to whether the start succeeded
#[derive(Debug)]
pub struct StartWaiter(oneshot::Receiver<bool>);

impl Future for StartWaiter {
    type Output = bool;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        Pin::new(&mut self.0)
            .poll(cx)
            .map(|result| result.unwrap_or(false))
    }
}

/// Session-active flag plus the two resolver queues
#[derive(Debug, Default)]
pub struct LifecycleRegistry {
    session_active: bool,
    end_resolvers: VecDeque<oneshot::Sender<()>>,
    start_resolvers: VecDeque<oneshot::Sender<bool>>,
}

impl LifecycleRegistry {
    /// Create a registry with no active session
    pub fn new() -> Self {
        Self::default()
    }

    /// Host's view of whether a session is live
    pub fn session_active(&self) -> bool {
        self.session_active
    }

    /// Number of live "session ended" waiters
    pub fn pending_ends(&self) -> usize {
        self.end_resolvers.iter().filter(|tx| !tx.is_closed()).count()
    }

    /// Number of live "session started" waiters
    pub fn pending_starts(&self) -> usize {
        self.start_resolvers.iter().filter(|tx| !tx.is_closed()).count()
    }

    /// Wait for the active session to end
    ///
    /// Register before sending the end request so a fast reply cannot be
    /// missed.
    pub fn wait_for_session_end(&mut self) -> EndWaiter {
        if !self.session_active {
            return EndWaiter(None);
        }
        let (tx, rx) = oneshot::channel();
        self.end_resolvers.push_back(tx);
        EndWaiter(Some(rx))
    }

    /// Wait for the next session start
    ///
    /// There is no "already started" shortcut: starting is always an
    /// explicit request.
    pub fn wait_for_session_start(&mut self) -> StartWaiter {
        let (tx, rx) = oneshot::channel();
        self.start_resolvers.push_back(tx);
        StartWaiter(rx)
    }

    /// Handle `sessionStarted`; returns whether a waiter was resolved
    pub fn on_session_started(&mut self) -> bool {
        self.session_active = true;
        let resolved = resolve_front(&mut self.start_resolvers, true);
        if !resolved {
            tracing::warn!("sessionStarted received with no pending start waiter");
        }
        resolved
    }

    /// Handle `sessionEnded`; returns whether a waiter was resolved
    pub fn on_session_ended(&mut self) -> bool {
        self.session_active = false;
        let resolved = resolve_front(&mut self.end_resolvers, ());
        if !resolved {
            tracing::debug!("sessionEnded received with no pending end waiter");
        }
        resolved
    }

    /// Handle `sessionStarting`: the session is about to restart
    pub fn on_session_starting(&mut self) {
        self.session_active = false;
    }

    /// Handle `error`: unblock one end waiter and fail one start waiter
    ///
    /// Returns `(end_resolved, start_resolved)`.
    pub fn on_error(&mut self) -> (bool, bool) {
        self.session_active = false;
        let ended = resolve_front(&mut self.end_resolvers, ());
        let started = resolve_front(&mut self.start_resolvers, false);
        tracing::debug!(
            end_resolved = ended,
            start_resolved = started,
            "Session error drained lifecycle waiters"
        );
        (ended, started)
    }
}

/// Resolve the oldest live waiter, discarding ones whose receiver is gone
/// (timed out or dropped).
fn resolve_front<T>(queue: &mut VecDeque<oneshot::Sender<T>>, value: T) -> bool {
    while let Some(tx) = queue.pop_front() {
        if tx.is_closed() {
            continue;
        }
        return tx.send(value).is_ok();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::task;
    use tokio_test::{assert_pending, assert_ready, assert_ready_eq};

    #[test]
    fn test_end_wait_immediate_when_inactive() {
        let mut registry = LifecycleRegistry::new();
        let waiter = registry.wait_for_session_end();
        assert!(waiter.is_immediate());
        assert_eq!(registry.pending_ends(), 0);

        let mut waiter = task::spawn(waiter);
        assert_ready!(waiter.poll());
    }

    #[test]
    fn test_end_wait_resolved_by_session_ended() {
        let mut registry = LifecycleRegistry::new();
        registry.on_session_started();

        let mut waiter = task::spawn(registry.wait_for_session_end());
        assert_pending!(waiter.poll());

        assert!(registry.on_session_ended());
        assert!(waiter.is_woken());
        assert_ready!(waiter.poll());
        assert!(!registry.session_active());
    }

    #[test]
    fn test_start_wait_resolved_true() {
        let mut registry = LifecycleRegistry::new();
        let mut waiter = task::spawn(registry.wait_for_session_start());
        assert_pending!(waiter.poll());

        assert!(registry.on_session_started());
        assert_ready_eq!(waiter.poll(), true);
        assert!(registry.session_active());
    }

    #[test]
    fn test_start_wait_always_suspends() {
        let mut registry = LifecycleRegistry::new();
        registry.on_session_started();
        let mut waiter = task::spawn(registry.wait_for_session_start());
        assert_pending!(waiter.poll());
        assert_eq!(registry.pending_starts(), 1);
    }

    #[test]
    fn test_error_fails_start_and_unblocks_end() {
        let mut registry = LifecycleRegistry::new();
        registry.on_session_started();

        let mut end = task::spawn(registry.wait_for_session_end());
        let mut start = task::spawn(registry.wait_for_session_start());

        assert_eq!(registry.on_error(), (true, true));
        assert_ready!(end.poll());
        assert_ready_eq!(start.poll(), false);
        assert!(!registry.session_active());
    }

    #[test]
    fn test_error_with_no_waiters() {
        let mut registry = LifecycleRegistry::new();
        registry.on_session_started();
        assert_eq!(registry.on_error(), (false, false));
        assert!(!registry.session_active());
    }

    #[test]
    fn test_orphan_started_does_not_corrupt_later_wait() {
        let mut registry = LifecycleRegistry::new();
        assert!(!registry.on_session_started());

        let mut waiter = task::spawn(registry.wait_for_session_start());
        assert_pending!(waiter.poll());

        assert!(registry.on_session_started());
        assert_ready_eq!(waiter.poll(), true);
    }

    #[test]
    fn test_starting_clears_flag_without_resolving() {
        let mut registry = LifecycleRegistry::new();
        registry.on_session_started();
        let mut start = task::spawn(registry.wait_for_session_start());

        registry.on_session_starting();
        assert!(!registry.session_active());
        assert_pending!(start.poll());
        assert_eq!(registry.pending_starts(), 1);
    }

    #[test]
    fn test_fifo_order() {
        let mut registry = LifecycleRegistry::new();
        let mut first = task::spawn(registry.wait_for_session_start());
        let mut second = task::spawn(registry.wait_for_session_start());

        registry.on_error();
        assert_ready_eq!(first.poll(), false);
        assert_pending!(second.poll());

        registry.on_session_started();
        assert_ready_eq!(second.poll(), true);
    }

    #[test]
    fn test_dropped_waiter_is_skipped() {
        let mut registry = LifecycleRegistry::new();
        let abandoned = registry.wait_for_session_start();
        let mut live = task::spawn(registry.wait_for_session_start());
        drop(abandoned);

        assert_eq!(registry.pending_starts(), 1);
        assert!(registry.on_session_started());
        assert_ready_eq!(live.poll(), true);
    }

    #[test]
    fn test_resolver_invoked_once() {
        let mut registry = LifecycleRegistry::new();
        registry.on_session_started();
        let mut end = task::spawn(registry.wait_for_session_end());

        assert!(registry.on_session_ended());
        assert!(!registry.on_session_ended());
        assert_ready!(end.poll());
    }
}
