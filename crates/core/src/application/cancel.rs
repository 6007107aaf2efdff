// Cancellation Token

use crate::error::{AppError, Result};
use std::future::Future;
use tokio::sync::watch;

/// Caller-supplied cancellation signal
#[derive(Clone)]
pub struct CancellationToken {
    rx: Option<watch::Receiver<bool>>,
}

impl CancellationToken {
    /// A token that never fires
    pub fn none() -> Self {
        Self { rx: None }
    }

    /// Check if cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    /// Resolves once cancellation is requested. Never resolves for
    /// [`CancellationToken::none`] or after the handle is dropped unfired.
    pub async fn cancelled(&self) {
        let Some(rx) = self.rx.as_ref() else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        if rx.wait_for(|fired| *fired).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::none()
    }
}

/// Fires the paired tokens
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Signal cancellation to every token clone
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Create a cancellation channel
pub fn cancel_channel() -> (CancelHandle, CancellationToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancellationToken { rx: Some(rx) })
}

/// Race `future` against the token. A fired token wins, dropping the future.
pub async fn cancellable<F, T>(cancel: &CancellationToken, operation: &str, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if cancel.is_cancelled() {
        return Err(AppError::Cancelled(operation.to_string()));
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AppError::Cancelled(operation.to_string())),
        result = future => result,
    }
}
