//! Cancellation and deadline scope for dispatch.

use std::future::Future;
use std::time::Duration;

use futures_util::future::select_all;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::TransportError;

/// Carries cancellation signals and an optional deadline into a dispatch.
///
/// Contexts are cheap to clone. A derived context keeps every cancellation
/// signal of its parent and the earlier of the two deadlines.
#[derive(Debug, Clone)]
pub struct Context {
    signals: Vec<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

/// Cancels the contexts created alongside it.
#[derive(Debug)]
pub struct CancelHandle {
    notify: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.notify.send_replace(true);
    }
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self {
            signals: Vec::new(),
            deadline: None,
        }
    }

    /// Derive a context that can also be cancelled through the returned handle.
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let mut ctx = self.clone();
        ctx.signals.push(rx);
        (ctx, CancelHandle { notify: tx })
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let mut ctx = self.clone();
        ctx.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        ctx
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.signals.iter().any(|rx| *rx.borrow())
    }

    /// Resolves once any cancellation signal fires. Never resolves for a
    /// context without signals.
    pub async fn cancelled(&self) {
        if self.signals.is_empty() {
            return std::future::pending().await;
        }
        let waits = self.signals.iter().cloned().map(|mut rx| {
            Box::pin(async move {
                let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
                // A dropped handle can no longer cancel.
                if closed {
                    std::future::pending::<()>().await;
                }
            })
        });
        select_all(waits).await;
    }

    /// Drive `fut` to completion unless the context is cancelled or its
    /// deadline passes first; in that case `fut` is dropped.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, TransportError> {
        if self.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(TransportError::Cancelled),
            _ = deadline => Err(TransportError::DeadlineExceeded),
            output = fut => Ok(output),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}
