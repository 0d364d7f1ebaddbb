//! Single-flight gate for credential refreshes.
//!
//! The first caller to [`enter`](RefreshGate::enter) an idle gate becomes the
//! leader and receives a [`RefreshLease`]; everyone arriving while the lease
//! is held receives a [`RefreshWaiter`] that resolves to the leader's
//! outcome. Resolving (or dropping) the lease reopens the gate.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::ReauthError;
use crate::state::Session;

/// What a refresh produced, as seen by every caller that waited for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed(Arc<Session>),
    Failed(ReauthError),
    /// The leader left the session as it was, e.g. a rejected login.
    /// Waiters needing fresh credentials enter the gate again.
    Unchanged,
}

impl RefreshOutcome {
    pub fn into_result(self) -> Result<Arc<Session>, ReauthError> {
        match self {
            RefreshOutcome::Refreshed(session) => Ok(session),
            RefreshOutcome::Failed(err) => Err(err),
            RefreshOutcome::Unchanged => Err(ReauthError::Abandoned),
        }
    }
}

type OutcomeRx = watch::Receiver<Option<RefreshOutcome>>;
type OutcomeTx = watch::Sender<Option<RefreshOutcome>>;

/// At most one refresh in flight; its outcome is broadcast to all waiters.
#[derive(Default)]
pub struct RefreshGate {
    /// `Some` while a lease is outstanding.
    in_flight: Mutex<Option<OutcomeRx>>,
}

/// Result of entering the gate.
pub enum Admission<'a> {
    /// The gate was idle; the caller performs the refresh.
    Leader(RefreshLease<'a>),
    /// A refresh is already in flight; the caller waits for it.
    Follower(RefreshWaiter),
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while a refresh is in flight.
    pub fn is_locked(&self) -> bool {
        self.in_flight.lock().unwrap().is_some()
    }

    /// Enters the gate as leader or follower.
    pub fn enter(&self) -> Admission<'_> {
        let mut slot = self.in_flight.lock().unwrap();
        if let Some(rx) = slot.as_ref() {
            return Admission::Follower(RefreshWaiter { rx: rx.clone() });
        }
        let (tx, rx) = watch::channel(None);
        *slot = Some(rx);
        debug!("refresh gate acquired");
        Admission::Leader(RefreshLease {
            gate: self,
            tx: Some(tx),
        })
    }

    fn release(&self, tx: OutcomeTx, outcome: RefreshOutcome) {
        let mut slot = self.in_flight.lock().unwrap();
        tx.send_replace(Some(outcome));
        *slot = None;
        debug!("refresh gate released");
    }
}

/// Exclusive right to perform the in-flight refresh.
///
/// Dropping a lease without [`resolve`](Self::resolve) publishes
/// [`ReauthError::Abandoned`] so waiters never block on a dead leader.
pub struct RefreshLease<'a> {
    gate: &'a RefreshGate,
    tx: Option<OutcomeTx>,
}

impl RefreshLease<'_> {
    /// Publishes `outcome` to every waiter and reopens the gate.
    pub fn resolve(mut self, outcome: RefreshOutcome) {
        if let Some(tx) = self.tx.take() {
            self.gate.release(tx, outcome);
        }
    }
}

impl Drop for RefreshLease<'_> {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            warn!("refresh lease dropped without an outcome");
            self.gate
                .release(tx, RefreshOutcome::Failed(ReauthError::Abandoned));
        }
    }
}

/// Handle on a refresh performed by another caller.
pub struct RefreshWaiter {
    rx: OutcomeRx,
}

impl RefreshWaiter {
    /// Waits until the leader resolves and returns its outcome.
    pub async fn outcome(mut self) -> RefreshOutcome {
        match self.rx.wait_for(Option::is_some).await {
            Ok(value) => value
                .clone()
                .unwrap_or(RefreshOutcome::Failed(ReauthError::Abandoned)),
            Err(_) => RefreshOutcome::Failed(ReauthError::Abandoned),
        }
    }
}
