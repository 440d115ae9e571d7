//! Per-call execution context.
//!
//! A [`CallContext`] carries the caller's cancellation and deadline plus
//! ambient values (currently a request id for log correlation). Providers
//! race their work against [`CallContext::done`].

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::ExchangeError;

#[derive(Debug, Clone)]
pub struct CallContext {
    request_id: Uuid,
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CallContext {
    /// Unbounded context with a fresh request id.
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Sets the deadline to `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Ties this context to an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Copy that keeps the ambient values but none of the caller's
    /// cancellation or deadline.
    pub fn detached(&self) -> Self {
        Self {
            request_id: self.request_id,
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Resolves once this context has ended, with the reason.
    ///
    /// Never resolves for an uncancelled context without a deadline.
    pub async fn done(&self) -> ExchangeError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.cancel.cancelled() => ExchangeError::Cancelled,
                    _ = tokio::time::sleep_until(deadline) => ExchangeError::DeadlineExceeded,
                }
            }
            None => {
                self.cancel.cancelled().await;
                ExchangeError::Cancelled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_resolves_done() {
        let ctx = CallContext::new().with_timeout(Duration::from_millis(50));
        assert_eq!(ctx.done().await, ExchangeError::DeadlineExceeded);
    }

    #[tokio::test]
    async fn test_cancel_resolves_done() {
        let ctx = CallContext::new();
        ctx.cancel();
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.done().await, ExchangeError::Cancelled);
    }

    #[tokio::test]
    async fn test_detached_keeps_request_id_but_not_cancellation() {
        let ctx = CallContext::new().with_timeout(Duration::from_secs(1));
        ctx.cancel();

        let detached = ctx.detached();
        assert_eq!(detached.request_id(), ctx.request_id());
        assert!(detached.deadline().is_none());
        assert!(!detached.is_cancelled());
    }

    #[tokio::test]
    async fn test_external_token_cancels_context() {
        let token = CancellationToken::new();
        let ctx = CallContext::new().with_cancellation(token.clone());
        token.cancel();
        assert!(ctx.is_cancelled());
    }
}
