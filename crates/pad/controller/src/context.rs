//! Per-pass request context
//!
//! Carries the request id used in logs and events, plus the caller's deadline
//! and cancellation signal. Store calls made under the context stop waiting
//! once either fires.

use tokio::sync::watch;
use tokio::time::Instant;
use uuid::Uuid;

/// Context for one reconciliation pass
#[derive(Debug, Clone)]
pub struct ReconcileContext {
    /// Unique request ID for tracing
    pub request_id: Uuid,
    /// Absolute deadline for the whole pass
    pub deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

impl Default for ReconcileContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconcileContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            deadline: None,
            cancel: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Abort outstanding store calls once the channel holds `true`
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves when the pass is cancelled; never resolves without a signal
    pub async fn cancelled(&self) {
        match self.cancel.clone() {
            Some(rx) => wait_for_cancel(rx).await,
            None => std::future::pending().await,
        }
    }
}

/// Resolves once `rx` holds `true`. A dropped sender never cancels.
pub async fn wait_for_cancel(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancelled_resolves_after_signal() {
        let (tx, rx) = watch::channel(false);
        let ctx = ReconcileContext::new().with_cancellation(rx);
        assert!(!ctx.is_cancelled());

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), ctx.cancelled())
            .await
            .expect("cancellation should resolve");
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn test_no_signal_never_cancels() {
        let ctx = ReconcileContext::new();
        let waited = tokio::time::timeout(Duration::from_millis(20), ctx.cancelled()).await;
        assert!(waited.is_err());
    }
}
