//! Request cancellation and deadlines
//!
//! A [`RequestContext`] is supplied by the caller of a catalog listing. Any
//! provider round-trip run through it is raced against the caller's cancel
//! signal and deadline, so a stuck Stripe call never hangs the request.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::{BillingError, BillingResult};

/// Cancellation signal and optional deadline for one request
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

/// Handle used to cancel the [`RequestContext`] it was created with
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Cancel the associated context. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl RequestContext {
    /// A context that is never canceled and has no deadline
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().deadline_at(Instant::now() + timeout)
    }

    /// A cancelable context plus the handle that cancels it
    pub fn with_cancel() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let ctx = Self {
            deadline: None,
            cancel: Some(rx),
        };
        (ctx, CancelHandle { tx })
    }

    /// Set (or tighten) the deadline of this context
    #[must_use]
    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_canceled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Run `fut` until it completes, the context is canceled, or the deadline
    /// passes, whichever happens first.
    ///
    /// An already-canceled or already-expired context fails without polling
    /// `fut`. Cancellation and expiry win over a result that is ready at the
    /// same time.
    pub async fn run<T, F>(&self, fut: F) -> BillingResult<T>
    where
        F: Future<Output = BillingResult<T>>,
    {
        if self.is_canceled() {
            return Err(BillingError::Canceled);
        }
        if self.is_expired() {
            return Err(BillingError::DeadlineExceeded(Duration::ZERO));
        }
        let started = Instant::now();

        tokio::select! {
            biased;
            _ = self.canceled() => Err(BillingError::Canceled),
            _ = self.expired() => Err(BillingError::DeadlineExceeded(started.elapsed())),
            result = fut => result,
        }
    }

    async fn canceled(&self) {
        let Some(rx) = &self.cancel else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        let handle_dropped = rx.wait_for(|canceled| *canceled).await.is_err();
        // A dropped handle can never cancel
        if handle_dropped {
            std::future::pending::<()>().await;
        }
    }

    async fn expired(&self) {
        match self.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}
