//! Caller-scoped cancellation and deadline for stream operations.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{EventError, EventResult};

/// Cancellation token plus an optional deadline.
///
/// Every blocking wait in the connection manager selects against both.
/// Cloning shares the token, so cancelling any clone cancels them all.
#[derive(Debug, Clone, Default)]
pub struct StreamContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl StreamContext {
    /// Context that only ends when cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context driven by an existing token.
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Same token, ending at `deadline` at the latest.
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = self.deadline.map_or(deadline, |d| d.min(deadline));
        Self {
            token: self.token.clone(),
            deadline: Some(deadline),
        }
    }

    /// Same token, ending `timeout` from now at the latest.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Child context: cancelled with its parent, cancellable alone.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// `Cancelled` or `DeadlineExceeded` once the context has ended.
    pub fn check(&self) -> EventResult<()> {
        if self.token.is_cancelled() {
            return Err(EventError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(EventError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Resolves with the reason once the context ends.
    pub async fn done(&self) -> EventError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                () = self.token.cancelled() => EventError::Cancelled,
                () = tokio::time::sleep_until(deadline) => EventError::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                EventError::Cancelled
            }
        }
    }
}
