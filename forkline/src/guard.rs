//! Stale-result discard for overlapping loads.
//!
//! Each load takes a ticket before it starts. Only the holder of the latest
//! ticket may commit, and nothing commits after [`LoadGuard::close`].

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

/// Identifies one load invocation. Later tickets compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadTicket(u64);

impl LoadTicket {
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

/// Last committed outcome of a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "lowercase")]
pub enum LoadState<T> {
    /// Nothing committed yet
    Idle,
    Ready(T),
    Failed(String),
}

impl<T> LoadState<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            LoadState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, LoadState::Idle)
    }
}

/// What happened to a commit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// A newer load was started; this result was dropped
    Superseded,
    /// The guard was closed; this result was dropped
    Closed,
}

pub struct LoadGuard<T> {
    latest: AtomicU64,
    closed: AtomicBool,
    state: RwLock<LoadState<T>>,
}

impl<T: Clone> LoadGuard<T> {
    pub fn new() -> Self {
        Self {
            latest: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            state: RwLock::new(LoadState::Idle),
        }
    }

    /// Issue a new ticket, superseding every earlier one.
    pub fn begin(&self) -> LoadTicket {
        LoadTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        ticket.0 == self.latest.load(Ordering::SeqCst)
    }

    /// Store `state` if `ticket` is still the latest and the guard is open.
    pub async fn commit(&self, ticket: LoadTicket, state: LoadState<T>) -> CommitOutcome {
        let mut current = self.state.write().await;
        if self.closed.load(Ordering::SeqCst) {
            debug!(ticket = ticket.0, "guard closed, discarding result");
            return CommitOutcome::Closed;
        }
        if !self.is_current(ticket) {
            debug!(
                ticket = ticket.0,
                latest = self.latest.load(Ordering::SeqCst),
                "stale result discarded"
            );
            return CommitOutcome::Superseded;
        }
        *current = state;
        CommitOutcome::Committed
    }

    /// Begin, await `load`, and commit its value or error message.
    pub async fn run<F, E>(&self, load: F) -> CommitOutcome
    where
        F: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let ticket = self.begin();
        let state = match load.await {
            Ok(value) => LoadState::Ready(value),
            Err(e) => LoadState::Failed(e.to_string()),
        };
        self.commit(ticket, state).await
    }

    /// Refuse every later commit.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub async fn state(&self) -> LoadState<T> {
        self.state.read().await.clone()
    }
}

impl<T: Clone> Default for LoadGuard<T> {
    fn default() -> Self {
        Self::new()
    }
}
