//! Worker-thread wrapper for long-running fits, with cooperative cancellation
//! and a hard deadline.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, RecvTimeoutError},
        Arc,
    },
    thread,
    time::Duration,
};

use tracing::warn;

use crate::CoreError;

/// Shared flag checked by the ensemble and the optimiser between iterations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns [`CoreError::Cancelled`] once [`CancelToken::cancel`] was called.
    pub fn check(&self) -> Result<(), CoreError> {
        if self.is_cancelled() {
            Err(CoreError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A job running on its own thread.
///
/// A job that outlives its deadline is signalled to stop and then abandoned; the
/// caller sees [`CoreError::TrainingFailure`].
pub struct AnalyticsTask<T> {
    name: String,
    receiver: mpsc::Receiver<Result<T, CoreError>>,
    token: CancelToken,
}

impl<T: Send + 'static> AnalyticsTask<T> {
    pub fn spawn<F>(name: impl Into<String>, job: F) -> Result<Self, CoreError>
    where
        F: FnOnce(&CancelToken) -> Result<T, CoreError> + Send + 'static,
    {
        let name = name.into();
        let token = CancelToken::new();
        let worker_token = token.clone();
        let (sender, receiver) = mpsc::channel();
        thread::Builder::new()
            .name(format!("spendwatch-{name}"))
            .spawn(move || {
                // The receiver may already be gone after a timeout.
                let _ = sender.send(job(&worker_token));
            })?;
        Ok(Self {
            name,
            receiver,
            token,
        })
    }

    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Blocks until the job finishes.
    pub fn wait(self) -> Result<T, CoreError> {
        self.receiver.recv().unwrap_or_else(|_| {
            Err(CoreError::TrainingFailure(format!(
                "analytics task `{}` stopped without producing a result",
                self.name
            )))
        })
    }

    /// Blocks for at most `timeout`; past the deadline the job is cancelled and
    /// the wait reported as a training failure.
    pub fn wait_timeout(self, timeout: Duration) -> Result<T, CoreError> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                self.token.cancel();
                warn!(task = %self.name, ?timeout, "analytics task exceeded its deadline");
                Err(CoreError::TrainingFailure(format!(
                    "analytics task `{}` exceeded its deadline of {:?}",
                    self.name, timeout
                )))
            }
            Err(RecvTimeoutError::Disconnected) => Err(CoreError::TrainingFailure(format!(
                "analytics task `{}` stopped without producing a result",
                self.name
            ))),
        }
    }
}
