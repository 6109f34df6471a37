use log::trace;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Snapshot sent after each completed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub processed: usize,
    pub total: usize,
}

/// Progress notifications and cancellation for one long-running operation. Both are only
/// observed between batches.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    updates: Option<UnboundedSender<BatchProgress>>,
    cancellation: CancellationToken,
}

impl Progress {
    /// No notifications, never cancelled unless a token is attached.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn channel() -> (Self, UnboundedReceiver<BatchProgress>) {
        let (sender, receiver) = unbounded_channel();
        (
            Self {
                updates: Some(sender),
                cancellation: CancellationToken::new(),
            },
            receiver,
        )
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn report(&self, processed: usize, total: usize) {
        trace!("progress {processed}/{total}");
        if let Some(updates) = &self.updates
            && updates.send(BatchProgress { processed, total }).is_err()
        {
            trace!("progress receiver is gone");
        }
    }

    /// Fails with [`Error::Cancelled`] once cancellation has been requested.
    pub fn checkpoint(&self, processed: usize, total: usize) -> Result<()> {
        if self.cancellation.is_cancelled() {
            Err(Error::Cancelled { processed, total })
        } else {
            Ok(())
        }
    }
}
