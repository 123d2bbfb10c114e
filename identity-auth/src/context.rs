//! Cancellation and deadline carrier for outbound provider calls.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{network_error, Error, NetworkErrorKind};

/// Caller-owned context bounding every network call made by a provider.
///
/// The token exchange and userinfo requests are the only suspension points of a
/// login attempt; both are raced against this context so a hung provider endpoint
/// cannot block the calling task indefinitely.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancellation: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context driven by an existing cancellation token.
    pub fn with_cancellation(cancellation: CancellationToken) -> Self {
        Self {
            cancellation,
            deadline: None,
        }
    }

    /// Set an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set a deadline relative to now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Run a network future bounded by this context.
    ///
    /// Returns `Network(Cancelled)` if the context is cancelled first and
    /// `Network(Timeout)` if the deadline passes first. The pending future is
    /// dropped in both cases, aborting the in-flight request.
    pub async fn run<F, T>(&self, future: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>>,
    {
        if self.is_cancelled() {
            return Err(network_error(
                NetworkErrorKind::Cancelled,
                "request context was cancelled before the call started",
            ));
        }

        let bounded = async {
            match self.deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, future).await {
                    Ok(result) => result,
                    Err(_) => Err(network_error(
                        NetworkErrorKind::Timeout,
                        "request context deadline exceeded",
                    )),
                },
                None => future.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(network_error(
                NetworkErrorKind::Cancelled,
                "request context was cancelled",
            )),
            result = bounded => result,
        }
    }
}
