//! Extendable lifecycle events
//!
//! Every event delivered to the worker carries an [`ExtendableEvent`]: work
//! the handler wants finished before the event counts as complete is handed
//! to [`ExtendableEvent::wait_until`], and the host awaits
//! [`ExtendableEvent::settle`].

use crate::error::{ShopError, ShopResult};
use std::fmt;
use std::future::Future;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Kind of host-delivered event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Install,
    Activate,
    Fetch,
    Sync,
    Push,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Install => "install",
            Self::Activate => "activate",
            Self::Fetch => "fetch",
            Self::Sync => "sync",
            Self::Push => "push",
        };
        f.write_str(s)
    }
}

/// Completion token of a single event
pub struct ExtendableEvent {
    kind: EventKind,
    pending: JoinSet<ShopResult<()>>,
}

impl ExtendableEvent {
    /// Create a token for an event of `kind`
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            pending: JoinSet::new(),
        }
    }

    /// Event kind
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Number of extensions not yet settled
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Extend the event's lifetime until `work` completes.
    ///
    /// The work starts immediately on the runtime; it does not wait for
    /// [`settle`](Self::settle).
    pub fn wait_until<F>(&mut self, work: F)
    where
        F: Future<Output = ShopResult<()>> + Send + 'static,
    {
        self.pending.spawn(work);
    }

    /// Wait for every extension. All extensions run to completion; the first
    /// failure is returned.
    pub async fn settle(mut self) -> ShopResult<()> {
        let mut first_error = None;
        let mut settled = 0usize;

        while let Some(joined) = self.pending.join_next().await {
            settled += 1;
            let result = joined
                .map_err(|e| ShopError::Internal(format!("{} event task failed: {}", self.kind, e)))
                .and_then(|r| r);
            if let Err(e) = result {
                warn!("{} event extension failed: {}", self.kind, e);
                first_error.get_or_insert(e);
            }
        }

        debug!("{} event settled ({} extensions)", self.kind, settled);
        first_error.map_or(Ok(()), Err)
    }
}
