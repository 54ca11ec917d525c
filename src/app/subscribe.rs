//! Cancellable backoff state of the subscribe retry loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;

/// Flags and the cancellable timer shared between the subscribe loop and the
/// handlers that cut it short.
///
/// Only one loop runs at a time; `begin` hands out the single slot. The
/// backoff sleep parks on a oneshot that external events can resolve early,
/// and cancelling is safe when no timer is pending.
#[derive(Default)]
pub(crate) struct SubscribeRetryState {
    should_retry: AtomicBool,
    is_subscribing: AtomicBool,
    cancel: Mutex<Option<oneshot::Sender<()>>>,
}

impl SubscribeRetryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the single subscribe slot. Returns false when a loop already
    /// runs.
    pub fn begin(&self) -> bool {
        !self.is_subscribing.swap(true, Ordering::SeqCst)
    }

    /// Release the subscribe slot.
    pub fn end(&self) {
        self.is_subscribing.store(false, Ordering::SeqCst);
    }

    pub fn is_subscribing(&self) -> bool {
        self.is_subscribing.load(Ordering::SeqCst)
    }

    pub fn request_retry(&self) {
        self.should_retry.store(true, Ordering::SeqCst);
    }

    pub fn should_retry(&self) -> bool {
        self.should_retry.load(Ordering::SeqCst)
    }

    /// Stop the loop at its next checkpoint and wake a pending backoff.
    pub fn stop_retrying(&self) {
        self.should_retry.store(false, Ordering::SeqCst);
        self.cancel_wait();
    }

    /// Resolve a pending backoff early. No-op when none is pending.
    pub fn cancel_wait(&self) {
        if let Some(cancel) = self.cancel.lock().take() {
            let _ = cancel.send(());
        }
    }

    /// Park for `delay`. Returns true when the timer expired naturally,
    /// false when it was cancelled.
    pub async fn wait(&self, delay: Duration) -> bool {
        let (cancel, cancelled) = oneshot::channel();
        *self.cancel.lock() = Some(cancel);
        let expired = tokio::select! {
            () = tokio::time::sleep(delay) => true,
            _ = cancelled => false,
        };
        self.cancel.lock().take();
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn begin_hands_out_a_single_slot() {
        let state = SubscribeRetryState::new();
        assert!(state.begin());
        assert!(!state.begin());
        state.end();
        assert!(state.begin());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_expires_naturally() {
        let state = SubscribeRetryState::new();
        assert!(state.wait(Duration::from_secs(3)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_resolves_a_pending_wait_early() {
        let state = Arc::new(SubscribeRetryState::new());
        let waiter = Arc::clone(&state);
        let task = tokio::spawn(async move { waiter.wait(Duration::from_secs(300)).await });

        // Let the waiter park before cancelling.
        tokio::time::sleep(Duration::from_millis(10)).await;
        state.cancel_wait();
        assert!(!task.await.unwrap());
    }

    #[test]
    fn cancel_without_pending_wait_is_a_no_op() {
        let state = SubscribeRetryState::new();
        state.cancel_wait();
        state.stop_retrying();
        assert!(!state.should_retry());
    }
}
