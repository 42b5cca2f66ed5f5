//! Request lifecycle state and its single-writer cell.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::watch;

use crate::error::ErrorInfo;

/// Coarse lifecycle phase derived from a [`RequestState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing has run yet.
    Idle,

    /// An execution is outstanding.
    Loading,

    /// The last execution produced data and no error.
    Success,

    /// The last execution failed. Stale data may still be present.
    Error,
}

/// Observable state of one asynchronous operation.
///
/// `data` survives later failures: a failed refetch sets `error` and leaves the
/// last good payload in place.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestState<T> {
    /// Last successfully retrieved payload.
    pub data: Option<T>,

    /// True while an execution, retries included, is outstanding.
    pub loading: bool,

    /// Failure from the most recent completed execution.
    pub error: Option<ErrorInfo>,
}

impl<T> RequestState<T> {
    /// Fresh state with no data and no error.
    pub fn new(loading: bool) -> Self {
        Self {
            data: None,
            loading,
            error: None,
        }
    }

    /// The derived lifecycle phase.
    pub fn phase(&self) -> Phase {
        if self.loading {
            Phase::Loading
        } else if self.error.is_some() {
            Phase::Error
        } else if self.data.is_some() {
            Phase::Success
        } else {
            Phase::Idle
        }
    }

    /// True when an error is shown next to a payload from an earlier success.
    pub fn is_stale(&self) -> bool {
        self.data.is_some() && self.error.is_some()
    }
}

impl<T> Default for RequestState<T> {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Owns a [`RequestState`] and gates writes by ticket and owner liveness.
pub(crate) struct StateCell<T> {
    tx: watch::Sender<RequestState<T>>,
    epoch: AtomicU64,
    alive: AtomicBool,
}

impl<T> StateCell<T> {
    /// Creates a cell whose initial `loading` flag is `loading`.
    pub(crate) fn new(loading: bool) -> Self {
        let (tx, _rx) = watch::channel(RequestState::new(loading));
        Self {
            tx,
            epoch: AtomicU64::new(0),
            alive: AtomicBool::new(true),
        }
    }

    /// Starts an execution and returns its ticket.
    pub(crate) fn begin(&self) -> u64 {
        let ticket = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        if self.is_alive() {
            self.tx.send_modify(|state| {
                state.loading = true;
                state.error = None;
            });
        }
        ticket
    }

    /// Whether `ticket` belongs to the most recently started execution.
    pub(crate) fn is_current(&self, ticket: u64) -> bool {
        self.epoch.load(Ordering::Acquire) == ticket
    }

    /// Whether a result carrying `ticket` may still be written.
    pub(crate) fn accepts(&self, ticket: u64, discard_superseded: bool) -> bool {
        self.is_alive() && (!discard_superseded || self.is_current(ticket))
    }

    pub(crate) fn set_data(&self, data: T) {
        self.tx.send_modify(|state| state.data = Some(data));
    }

    pub(crate) fn set_error(&self, error: ErrorInfo) {
        self.tx.send_modify(|state| state.error = Some(error));
    }

    /// Clears `loading` for the execution holding `ticket`.
    ///
    /// Without `discard_superseded` any live ticket clears it, including one
    /// that a newer execution has overtaken.
    pub(crate) fn finish(&self, ticket: u64, discard_superseded: bool) {
        if self.accepts(ticket, discard_superseded) {
            self.tx.send_modify(|state| state.loading = false);
        }
    }

    /// Marks the owner as gone; later writes are dropped.
    pub(crate) fn retire(&self) {
        self.alive.store(false, Ordering::Release);
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<RequestState<T>> {
        self.tx.subscribe()
    }

    pub(crate) fn with<R>(&self, f: impl FnOnce(&RequestState<T>) -> R) -> R {
        f(&self.tx.borrow())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn phase_follows_fields() {
        let mut state = RequestState::<u32>::new(true);
        assert_eq!(state.phase(), Phase::Loading);

        state.loading = false;
        assert_eq!(state.phase(), Phase::Idle);

        state.data = Some(7);
        assert_eq!(state.phase(), Phase::Success);

        state.error = Some(ErrorInfo::api("nope", Value::Null));
        assert_eq!(state.phase(), Phase::Error);
        assert!(state.is_stale());
    }

    #[test]
    fn superseded_tickets_are_rejected_only_when_asked() {
        let cell = StateCell::<u32>::new(false);
        let first = cell.begin();
        let second = cell.begin();

        assert!(!cell.is_current(first));
        assert!(cell.is_current(second));
        assert!(cell.accepts(first, false));
        assert!(!cell.accepts(first, true));

        cell.finish(first, true);
        assert!(cell.with(|s| s.loading));
        cell.finish(second, true);
        assert!(!cell.with(|s| s.loading));
    }

    #[test]
    fn retired_cell_ignores_finish() {
        let cell = StateCell::<u32>::new(false);
        let ticket = cell.begin();
        cell.retire();
        cell.finish(ticket, false);
        assert!(cell.with(|s| s.loading));
    }
}
