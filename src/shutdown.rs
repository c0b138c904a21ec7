//! Run-level cancellation: a shutdown broadcast plus an optional deadline.
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;

use crate::clock::Clock;

pub type ShutdownSender = broadcast::Sender<()>;
pub type ShutdownReceiver = broadcast::Receiver<()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CancelReason {
    #[error("run cancelled")]
    Shutdown,
    #[error("run deadline exceeded")]
    DeadlineExceeded,
}

/// Threaded through the runner and executor; consulted before every case,
/// repeat, and attempt, and raced against every await.
///
/// Once cancelled it stays cancelled.
pub struct RunControl {
    clock: Arc<dyn Clock>,
    shutdown_rx: Option<ShutdownReceiver>,
    deadline_ms: Option<u64>,
    cancelled: Option<CancelReason>,
}

impl RunControl {
    /// A control that never cancels on its own.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            shutdown_rx: None,
            deadline_ms: None,
            cancelled: None,
        }
    }

    #[must_use]
    pub fn with_shutdown(mut self, shutdown_rx: ShutdownReceiver) -> Self {
        self.shutdown_rx = Some(shutdown_rx);
        self
    }

    /// Bounds the whole run to `budget`, measured from now on the run clock.
    #[must_use]
    pub fn with_deadline(mut self, budget: Duration) -> Self {
        let budget_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX);
        self.deadline_ms = Some(self.clock.now_ms().saturating_add(budget_ms));
        self
    }

    #[must_use]
    pub const fn cancelled(&self) -> Option<CancelReason> {
        self.cancelled
    }

    /// Returns the cancellation reason if the run must stop now.
    ///
    /// # Errors
    ///
    /// Returns the [`CancelReason`] once shutdown was signalled or the deadline passed.
    pub fn check(&mut self) -> Result<(), CancelReason> {
        if let Some(reason) = self.cancelled {
            return Err(reason);
        }
        if let Some(shutdown_rx) = self.shutdown_rx.as_mut() {
            match shutdown_rx.try_recv() {
                Ok(()) | Err(broadcast::error::TryRecvError::Lagged(_)) => {
                    return Err(self.cancel(CancelReason::Shutdown));
                }
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => {}
            }
        }
        if let Some(deadline_ms) = self.deadline_ms
            && self.clock.now_ms() >= deadline_ms
        {
            return Err(self.cancel(CancelReason::DeadlineExceeded));
        }
        Ok(())
    }

    /// Sleeps on the run clock, cut short by shutdown or the deadline.
    ///
    /// # Errors
    ///
    /// Returns the [`CancelReason`] when the pause did not run to completion.
    pub async fn pause(&mut self, duration: Duration) -> Result<(), CancelReason> {
        self.check()?;
        let (duration, clamped) = match self.remaining() {
            Some(remaining) if remaining < duration => (remaining, true),
            _ => (duration, false),
        };
        let clock = Arc::clone(&self.clock);
        self.race(clock.sleep(duration), None).await?;
        if clamped {
            return Err(self.cancel(CancelReason::DeadlineExceeded));
        }
        Ok(())
    }

    /// Drives `future` to completion unless shutdown arrives or the deadline
    /// passes first.
    ///
    /// # Errors
    ///
    /// Returns the [`CancelReason`] when the run was cancelled before or during the await.
    pub async fn guard<F>(&mut self, future: F) -> Result<F::Output, CancelReason>
    where
        F: Future,
    {
        self.check()?;
        let remaining = self.remaining();
        self.race(future, remaining).await
    }

    /// Races `future` against shutdown and, when `deadline` is set, a sleep of
    /// that length on the run clock.
    async fn race<F>(
        &mut self,
        future: F,
        deadline: Option<Duration>,
    ) -> Result<F::Output, CancelReason>
    where
        F: Future,
    {
        let clock = Arc::clone(&self.clock);
        let outcome = {
            let shutdown_rx = self.shutdown_rx.as_mut();
            let shutdown = async move {
                let Some(shutdown_rx) = shutdown_rx else {
                    return std::future::pending::<()>().await;
                };
                loop {
                    match shutdown_rx.recv().await {
                        Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => return,
                        Err(broadcast::error::RecvError::Closed) => {
                            std::future::pending::<()>().await;
                        }
                    }
                }
            };
            let expiry = async move {
                match deadline {
                    Some(remaining) => clock.sleep(remaining).await,
                    None => std::future::pending::<()>().await,
                }
            };
            tokio::select! {
                biased;
                output = future => Ok(output),
                () = shutdown => Err(CancelReason::Shutdown),
                () = expiry => Err(CancelReason::DeadlineExceeded),
            }
        };
        outcome.map_err(|reason| self.cancel(reason))
    }

    fn remaining(&self) -> Option<Duration> {
        let deadline_ms = self.deadline_ms?;
        Some(Duration::from_millis(
            deadline_ms.saturating_sub(self.clock.now_ms()),
        ))
    }

    fn cancel(&mut self, reason: CancelReason) -> CancelReason {
        *self.cancelled.get_or_insert(reason)
    }
}
