use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

#[derive(Default)]
struct TokenInner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// A cancellation token that can be used to cancel async operations.
///
/// Clone this token and pass it to functions that should be cancellable.
/// When `cancel()` is called, all operations checking this token will be cancelled,
/// and every task awaiting [`CancellationToken::cancelled`] is woken.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel all operations using this token
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Check if cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel()` has been called. Returns immediately if it already was.
    pub async fn cancelled(&self) {
        loop {
            // registered before the flag check so a concurrent cancel() is not missed
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// RAII guard that owns a spawned task and aborts it when dropped.
///
/// The token is cancelled first so the task can observe the cancellation at
/// its next check even if the abort lands late.
pub struct TaskGuard {
    handle: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
}

impl TaskGuard {
    pub fn new(handle: JoinHandle<()>, cancel_token: CancellationToken) -> Self {
        Self {
            handle: Some(handle),
            cancel_token,
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel_token
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |handle| handle.is_finished())
    }

    pub fn abort(&mut self) {
        self.cancel_token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.abort();
    }
}
