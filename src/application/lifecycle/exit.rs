//! Single-assignment exit code channel.
//!
//! Any number of [`ExitSender`] clones may race to resolve; the first value
//! sticks. The lone [`ExitReceiver`] is consumed by the process entry point.

use tokio::sync::watch;

/// Final process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    pub code: u8,
}

impl ExitOutcome {
    pub const SUCCESS: Self = Self { code: 0 };
    pub const FAILURE: Self = Self { code: 1 };

    #[must_use]
    pub const fn new(code: u8) -> Self {
        Self { code }
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        self.code == 0
    }
}

/// Create a connected sender/receiver pair.
#[must_use]
pub fn exit_channel() -> (ExitSender, ExitReceiver) {
    let (tx, rx) = watch::channel(None);
    (ExitSender { tx }, ExitReceiver { rx })
}

/// Write side of the exit channel.
#[derive(Debug, Clone)]
pub struct ExitSender {
    tx: watch::Sender<Option<ExitOutcome>>,
}

impl ExitSender {
    /// Set the outcome unless one is already set.
    ///
    /// Returns `true` if this call was the one that resolved the channel.
    pub fn resolve(&self, code: u8) -> bool {
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(ExitOutcome::new(code));
            true
        })
    }

    /// The resolved outcome, if any.
    #[must_use]
    pub fn outcome(&self) -> Option<ExitOutcome> {
        *self.tx.borrow()
    }
}

/// Read side of the exit channel. Not cloneable: there is exactly one waiter.
#[derive(Debug)]
pub struct ExitReceiver {
    rx: watch::Receiver<Option<ExitOutcome>>,
}

impl ExitReceiver {
    /// Suspend until the channel is resolved.
    ///
    /// If every sender is dropped without resolving, the process is treated as
    /// having failed.
    pub async fn wait(mut self) -> ExitOutcome {
        match self.rx.wait_for(Option::is_some).await {
            Ok(outcome) => (*outcome).unwrap_or(ExitOutcome::FAILURE),
            Err(_) => ExitOutcome::FAILURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready_eq, task};

    #[tokio::test]
    async fn test_first_resolve_wins() {
        let (tx, rx) = exit_channel();
        assert!(tx.resolve(5));
        assert!(!tx.resolve(7));
        assert_eq!(rx.wait().await, ExitOutcome::new(5));
    }

    #[tokio::test]
    async fn test_clones_share_single_slot() {
        let (tx, rx) = exit_channel();
        let other = tx.clone();
        assert!(other.resolve(1));
        assert!(!tx.resolve(0));
        assert_eq!(tx.outcome(), Some(ExitOutcome::FAILURE));
        assert_eq!(rx.wait().await.code, 1);
    }

    #[test]
    fn test_wait_pends_until_resolved() {
        let (tx, rx) = exit_channel();
        let mut waiter = task::spawn(rx.wait());
        assert_pending!(waiter.poll());

        tx.resolve(3);
        assert!(waiter.is_woken());
        assert_ready_eq!(waiter.poll(), ExitOutcome::new(3));
    }

    #[tokio::test]
    async fn test_dropped_senders_count_as_failure() {
        let (tx, rx) = exit_channel();
        drop(tx);
        assert_eq!(rx.wait().await, ExitOutcome::FAILURE);
    }

    #[tokio::test]
    async fn test_resolve_after_wait_started() {
        let (tx, rx) = exit_channel();
        let waiter = tokio::spawn(rx.wait());
        tokio::task::yield_now().await;
        tx.resolve(0);
        assert!(waiter.await.unwrap().is_success());
    }
}
