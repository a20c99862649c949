//! Shutdown signalling
//!
//! A [`ShutdownTrigger`] is handed to whatever observes interruptions (the
//! binary's signal handler, or a test). A [`ShutdownSignal`] is awaited by the
//! orchestrator. Only the first trigger counts; later ones report `false` so
//! the caller can log and ignore them.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

/// Create a connected trigger/signal pair
pub fn channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    let trigger = ShutdownTrigger {
        tx: Arc::new(tx),
        fired: Arc::new(AtomicBool::new(false)),
    };
    (trigger, ShutdownSignal { rx })
}

/// Sending half; cheap to clone
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    tx: Arc<watch::Sender<bool>>,
    fired: Arc<AtomicBool>,
}

impl ShutdownTrigger {
    /// Request shutdown. Returns `true` only for the first call.
    pub fn trigger(&self) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.tx.send_replace(true);
        true
    }

    /// Whether shutdown was already requested
    pub fn is_triggered(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

/// Receiving half; cheap to clone
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Wait until shutdown is requested.
    ///
    /// Returns immediately if it already was. If every trigger is dropped
    /// without firing, this waits forever.
    pub async fn wait(&mut self) {
        if self.rx.wait_for(|fired| *fired).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Whether shutdown was already requested
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn first_trigger_wins() {
        let (trigger, signal) = channel();
        assert!(!signal.is_triggered());

        assert!(trigger.trigger());
        assert!(!trigger.trigger());
        assert!(!trigger.clone().trigger());

        assert!(signal.is_triggered());
        assert!(trigger.is_triggered());
    }

    #[tokio::test]
    async fn wait_returns_after_trigger() {
        let (trigger, mut signal) = channel();

        let waiter = tokio::spawn(async move {
            signal.wait().await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.trigger();

        tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .expect("waiter should finish")
            .unwrap();
    }

    #[tokio::test]
    async fn wait_is_immediate_when_already_triggered() {
        let (trigger, mut signal) = channel();
        trigger.trigger();
        tokio::time::timeout(Duration::from_millis(100), signal.wait())
            .await
            .expect("already-triggered signal resolves at once");
    }

    #[tokio::test]
    async fn dropped_trigger_does_not_release_waiters() {
        let (trigger, mut signal) = channel();
        drop(trigger);
        let res = tokio::time::timeout(Duration::from_millis(50), signal.wait()).await;
        assert!(res.is_err());
    }

    #[test]
    fn wait_is_pending_until_triggered() {
        let (trigger, mut signal) = channel();
        let mut wait = tokio_test::task::spawn(async move { signal.wait().await });

        tokio_test::assert_pending!(wait.poll());
        trigger.trigger();
        assert!(wait.is_woken());
        tokio_test::assert_ready!(wait.poll());
    }
}
