use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use s3deck_protocol::constants::TransferDirection;

use crate::event::TransferEvent;
use crate::types::{Transfer, TransferCounts, TransferStatus};

/// Callback invoked with the transfer's new state after an event changed it.
pub type ChangeCallback = Box<dyn Fn(&Transfer) + Send + Sync>;

/// Engine inconsistencies the registry tolerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anomaly {
    /// The event names a transfer that was never started.
    UnknownTransferId,
    /// The reported size is below the recorded one.
    SizeRegression { recorded: u64, reported: u64 },
    /// The reported size is above the transfer's total.
    ExceedsTotal { reported: u64, total: u64 },
    /// A second start for an id already in the registry.
    DuplicateStart,
    /// The transfer already finished.
    AlreadyFinished,
    /// The event is not valid in the transfer's current status.
    InvalidTransition { from: TransferStatus },
}

/// What applying one event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Created,
    Updated,
    /// Applied after correcting the reported size.
    Clamped(Anomaly),
    /// Not applied; the registry is unchanged.
    Ignored(Anomaly),
}

impl ApplyOutcome {
    /// Returns `true` if the registry changed.
    pub fn changed(&self) -> bool {
        !matches!(self, ApplyOutcome::Ignored(_))
    }
}

/// Insertion-ordered map of transfers, mutated only by [`apply`](Self::apply).
pub struct TransferRegistry {
    inner: RwLock<RegistryInner>,
    callbacks: RwLock<Vec<ChangeCallback>>,
}

#[derive(Default)]
struct RegistryInner {
    transfers: Vec<Transfer>,
    /// id -> position in `transfers`.
    index: HashMap<String, usize>,
}

impl Default for TransferRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
            callbacks: RwLock::new(Vec::new()),
        }
    }

    /// Registers a change callback.
    ///
    /// Callbacks run on the applying thread after the registry lock is
    /// released, so they may query the registry.
    pub fn on_change(&self, callback: ChangeCallback) {
        self.callbacks.write().unwrap().push(callback);
    }

    /// Applies one event at the current time.
    pub fn apply(&self, event: TransferEvent) -> ApplyOutcome {
        self.apply_at(event, Utc::now())
    }

    /// Applies one event, stamping a finish with `now`.
    pub fn apply_at(&self, event: TransferEvent, now: DateTime<Utc>) -> ApplyOutcome {
        let id = event.id().to_string();
        let kind = event.kind();

        let (outcome, snapshot) = {
            let mut inner = self.inner.write().unwrap();
            let outcome = inner.apply(event, now);
            let snapshot = if outcome.changed() {
                inner.get(&id).cloned()
            } else {
                None
            };
            (outcome, snapshot)
        };

        match outcome {
            ApplyOutcome::Ignored(Anomaly::UnknownTransferId) => {
                debug!(transfer = %id, event = kind, "event for unknown transfer ignored");
            }
            ApplyOutcome::Ignored(anomaly) | ApplyOutcome::Clamped(anomaly) => {
                warn!(transfer = %id, event = kind, ?anomaly, "progress anomaly");
            }
            ApplyOutcome::Created | ApplyOutcome::Updated => {
                debug!(transfer = %id, event = kind, "transfer updated");
            }
        }

        if let Some(transfer) = snapshot {
            for cb in self.callbacks.read().unwrap().iter() {
                cb(&transfer);
            }
        }
        outcome
    }

    /// Returns a transfer by id.
    pub fn get(&self, id: &str) -> Option<Transfer> {
        self.inner.read().unwrap().get(id).cloned()
    }

    /// Snapshot of the transfers matching `predicate`, in insertion order.
    pub fn query<F>(&self, predicate: F) -> Vec<Transfer>
    where
        F: Fn(&Transfer) -> bool,
    {
        let inner = self.inner.read().unwrap();
        inner
            .transfers
            .iter()
            .filter(|t| predicate(t))
            .cloned()
            .collect()
    }

    /// Every transfer, in insertion order.
    pub fn all(&self) -> Vec<Transfer> {
        self.query(|_| true)
    }

    /// Unfinished uploads.
    pub fn uploading(&self) -> Vec<Transfer> {
        self.query(|t| !t.is_finished() && t.direction == TransferDirection::Upload)
    }

    /// Unfinished downloads.
    pub fn downloading(&self) -> Vec<Transfer> {
        self.query(|t| !t.is_finished() && t.direction == TransferDirection::Download)
    }

    /// Finished transfers in either direction.
    pub fn finished(&self) -> Vec<Transfer> {
        self.query(Transfer::is_finished)
    }

    pub fn counts(&self) -> TransferCounts {
        let inner = self.inner.read().unwrap();
        let mut counts = TransferCounts::default();
        for t in &inner.transfers {
            match (t.status, t.direction) {
                (TransferStatus::Finished, _) => counts.finished += 1,
                (status, direction) => {
                    match direction {
                        TransferDirection::Upload => counts.uploading += 1,
                        TransferDirection::Download => counts.downloading += 1,
                    }
                    if status == TransferStatus::Failed {
                        counts.failed += 1;
                    }
                }
            }
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().transfers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RegistryInner {
    fn get(&self, id: &str) -> Option<&Transfer> {
        self.index.get(id).map(|&i| &self.transfers[i])
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Transfer> {
        self.index.get(id).map(|&i| &mut self.transfers[i])
    }

    fn apply(&mut self, event: TransferEvent, now: DateTime<Utc>) -> ApplyOutcome {
        if let TransferEvent::Start {
            id,
            direction,
            path,
            total_size,
            transferred_size,
        } = event
        {
            return self.start(id, direction, &path, total_size, transferred_size);
        }

        let Some(transfer) = self.get_mut(event.id()) else {
            return ApplyOutcome::Ignored(Anomaly::UnknownTransferId);
        };
        if transfer.is_finished() {
            return ApplyOutcome::Ignored(Anomaly::AlreadyFinished);
        }

        match event {
            TransferEvent::Start { .. } => ApplyOutcome::Ignored(Anomaly::DuplicateStart),
            TransferEvent::Update {
                transferred_size, ..
            } => {
                let clamp = advance(transfer, transferred_size);
                transfer.status = TransferStatus::Transferring;
                transfer.error = None;
                clamp.map_or(ApplyOutcome::Updated, ApplyOutcome::Clamped)
            }
            TransferEvent::End {
                transferred_size, ..
            } => {
                let clamp = advance(transfer, transferred_size);
                transfer.status = TransferStatus::Finished;
                transfer.finished_at = Some(now);
                clamp.map_or(ApplyOutcome::Updated, ApplyOutcome::Clamped)
            }
            TransferEvent::Stop { .. } => {
                transfer.status = TransferStatus::Stopping;
                ApplyOutcome::Updated
            }
            TransferEvent::Continue { .. } => {
                if transfer.status != TransferStatus::Stopping {
                    return ApplyOutcome::Ignored(Anomaly::InvalidTransition {
                        from: transfer.status,
                    });
                }
                transfer.status = TransferStatus::Transferring;
                ApplyOutcome::Updated
            }
            TransferEvent::Failed { reason, .. } => {
                transfer.status = TransferStatus::Failed;
                transfer.error = Some(reason);
                ApplyOutcome::Updated
            }
        }
    }

    fn start(
        &mut self,
        id: String,
        direction: TransferDirection,
        path: &str,
        total_size: u64,
        transferred_size: u64,
    ) -> ApplyOutcome {
        if self.index.contains_key(&id) {
            return ApplyOutcome::Ignored(Anomaly::DuplicateStart);
        }
        let transfer = Transfer::new(
            id.clone(),
            path,
            direction,
            total_size,
            transferred_size.min(total_size),
        );
        self.index.insert(id, self.transfers.len());
        self.transfers.push(transfer);
        if transferred_size > total_size {
            return ApplyOutcome::Clamped(Anomaly::ExceedsTotal {
                reported: transferred_size,
                total: total_size,
            });
        }
        ApplyOutcome::Created
    }
}

/// Moves `transferred_size` forward to `reported`, keeping it within
/// `recorded..=total`. Returns the anomaly if the value had to be corrected.
fn advance(transfer: &mut Transfer, reported: u64) -> Option<Anomaly> {
    let recorded = transfer.transferred_size;
    let (next, anomaly) = if reported < recorded {
        (recorded, Some(Anomaly::SizeRegression { recorded, reported }))
    } else if reported > transfer.total_size {
        (
            transfer.total_size,
            Some(Anomaly::ExceedsTotal {
                reported,
                total: transfer.total_size,
            }),
        )
    } else {
        (reported, None)
    };
    transfer.increment = next - recorded;
    transfer.transferred_size = next;
    anomaly
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn start(id: &str, total: u64, transferred: u64) -> TransferEvent {
        TransferEvent::Start {
            id: id.into(),
            direction: TransferDirection::Upload,
            path: format!("/home/me/{id}.bin"),
            total_size: total,
            transferred_size: transferred,
        }
    }

    fn start_download(id: &str, total: u64) -> TransferEvent {
        TransferEvent::Start {
            id: id.into(),
            direction: TransferDirection::Download,
            path: format!("/dl/{id}.bin"),
            total_size: total,
            transferred_size: 0,
        }
    }

    fn update(id: &str, t: u64) -> TransferEvent {
        TransferEvent::Update {
            id: id.into(),
            transferred_size: t,
        }
    }

    fn end(id: &str, t: u64) -> TransferEvent {
        TransferEvent::End {
            id: id.into(),
            transferred_size: t,
        }
    }

    fn stop(id: &str) -> TransferEvent {
        TransferEvent::Stop { id: id.into() }
    }

    fn resume(id: &str) -> TransferEvent {
        TransferEvent::Continue { id: id.into() }
    }

    fn failed(id: &str) -> TransferEvent {
        TransferEvent::Failed {
            id: id.into(),
            reason: "connection reset".into(),
        }
    }

    #[test]
    fn full_lifecycle_records_increments() {
        let reg = TransferRegistry::new();
        let now = Utc::now();
        let mut increments = Vec::new();

        assert_eq!(reg.apply(start("A", 100, 0)), ApplyOutcome::Created);
        for t in [40, 90] {
            assert_eq!(reg.apply(update("A", t)), ApplyOutcome::Updated);
            increments.push(reg.get("A").unwrap().increment);
        }
        assert_eq!(reg.apply_at(end("A", 100), now), ApplyOutcome::Updated);

        assert_eq!(increments, vec![40, 50]);
        let a = reg.get("A").unwrap();
        assert_eq!(a.status, TransferStatus::Finished);
        assert_eq!(a.transferred_size, 100);
        assert_eq!(a.finished_at, Some(now));
        assert_eq!(a.name, "A.bin");
    }

    #[test]
    fn update_for_unknown_id_is_noop() {
        let reg = TransferRegistry::new();
        reg.apply(start("A", 100, 0));
        reg.apply(update("A", 10));
        let before = reg.all();

        assert_eq!(
            reg.apply(update("B", 50)),
            ApplyOutcome::Ignored(Anomaly::UnknownTransferId)
        );
        for ev in [end("B", 1), stop("B"), resume("B"), failed("B")] {
            assert!(!reg.apply(ev).changed());
        }
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.all(), before);
    }

    #[test]
    fn regression_keeps_size_with_zero_increment() {
        let reg = TransferRegistry::new();
        reg.apply(start("A", 100, 0));
        reg.apply(update("A", 60));

        assert_eq!(
            reg.apply(update("A", 20)),
            ApplyOutcome::Clamped(Anomaly::SizeRegression {
                recorded: 60,
                reported: 20
            })
        );
        let a = reg.get("A").unwrap();
        assert_eq!(a.transferred_size, 60);
        assert_eq!(a.increment, 0);
    }

    #[test]
    fn size_never_exceeds_total() {
        let reg = TransferRegistry::new();
        assert_eq!(
            reg.apply(start("A", 100, 150)),
            ApplyOutcome::Clamped(Anomaly::ExceedsTotal {
                reported: 150,
                total: 100
            })
        );
        assert_eq!(reg.get("A").unwrap().transferred_size, 100);

        reg.apply(start("B", 100, 0));
        for t in [30, 70, 130, 99, 100, 250] {
            reg.apply(update("B", t));
            let b = reg.get("B").unwrap();
            assert!(b.transferred_size <= b.total_size);
        }
        reg.apply(end("B", 400));
        assert_eq!(reg.get("B").unwrap().transferred_size, 100);
    }

    #[test]
    fn monotone_sequences_stay_within_bounds() {
        let reg = TransferRegistry::new();
        let total = 1_000;
        reg.apply(start("M", total, 0));
        let mut previous = 0;
        let mut t = 0u64;
        for step in [0, 1, 7, 13, 100, 250, 0, 629] {
            t += step;
            reg.apply(update("M", t));
            let m = reg.get("M").unwrap();
            assert!(m.transferred_size <= total);
            assert!(m.transferred_size >= previous);
            assert_eq!(m.increment, m.transferred_size - previous);
            previous = m.transferred_size;
        }
        assert_eq!(previous, total);
    }

    #[test]
    fn stop_and_continue() {
        let reg = TransferRegistry::new();
        reg.apply(start("A", 100, 0));

        assert_eq!(
            reg.apply(resume("A")),
            ApplyOutcome::Ignored(Anomaly::InvalidTransition {
                from: TransferStatus::Transferring
            })
        );
        reg.apply(stop("A"));
        assert_eq!(reg.get("A").unwrap().status, TransferStatus::Stopping);
        reg.apply(resume("A"));
        assert_eq!(reg.get("A").unwrap().status, TransferStatus::Transferring);
    }

    #[test]
    fn update_while_stopping_resumes() {
        let reg = TransferRegistry::new();
        reg.apply(start("A", 100, 0));
        reg.apply(stop("A"));
        reg.apply(update("A", 5));
        assert_eq!(reg.get("A").unwrap().status, TransferStatus::Transferring);
    }

    #[test]
    fn finished_is_absorbing() {
        let reg = TransferRegistry::new();
        let now = Utc::now();
        reg.apply(start("A", 100, 0));
        reg.apply_at(end("A", 100), now);

        for ev in [update("A", 10), stop("A"), resume("A"), failed("A"), end("A", 50)] {
            assert_eq!(reg.apply(ev), ApplyOutcome::Ignored(Anomaly::AlreadyFinished));
        }
        let a = reg.get("A").unwrap();
        assert_eq!(a.transferred_size, 100);
        assert_eq!(a.finished_at, Some(now));
    }

    #[test]
    fn failure_is_retained_and_recoverable() {
        let reg = TransferRegistry::new();
        reg.apply(start("A", 100, 0));
        reg.apply(update("A", 30));
        reg.apply(failed("A"));

        let a = reg.get("A").unwrap();
        assert_eq!(a.status, TransferStatus::Failed);
        assert_eq!(a.error.as_deref(), Some("connection reset"));
        assert_eq!(a.transferred_size, 30);
        assert_eq!(reg.counts().failed, 1);

        reg.apply(update("A", 60));
        let a = reg.get("A").unwrap();
        assert_eq!(a.status, TransferStatus::Transferring);
        assert!(a.error.is_none());
    }

    #[test]
    fn duplicate_start_is_ignored() {
        let reg = TransferRegistry::new();
        reg.apply(start("A", 100, 0));
        reg.apply(update("A", 40));
        assert_eq!(
            reg.apply(start("A", 999, 0)),
            ApplyOutcome::Ignored(Anomaly::DuplicateStart)
        );
        let a = reg.get("A").unwrap();
        assert_eq!(a.total_size, 100);
        assert_eq!(a.transferred_size, 40);
    }

    #[test]
    fn views_and_counts() {
        let reg = TransferRegistry::new();
        reg.apply(start("u1", 10, 0));
        reg.apply(start_download("d1", 10));
        reg.apply(start("u2", 10, 0));
        reg.apply(start_download("d2", 10));
        reg.apply(end("u1", 10));
        reg.apply(failed("d2"));

        let ids = |v: Vec<Transfer>| v.into_iter().map(|t| t.id).collect::<Vec<_>>();
        assert_eq!(ids(reg.uploading()), vec!["u2"]);
        assert_eq!(ids(reg.downloading()), vec!["d1", "d2"]);
        assert_eq!(ids(reg.finished()), vec!["u1"]);
        assert_eq!(ids(reg.all()), vec!["u1", "d1", "u2", "d2"]);
        assert_eq!(
            reg.counts(),
            TransferCounts {
                uploading: 1,
                downloading: 2,
                finished: 1,
                failed: 1,
            }
        );
    }

    #[test]
    fn query_preserves_insertion_order() {
        let reg = TransferRegistry::new();
        for id in ["c", "a", "b"] {
            reg.apply(start(id, 10, 0));
        }
        reg.apply(update("a", 5));
        let ids: Vec<_> = reg.query(|t| t.total_size == 10).into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn on_change_sees_applied_events_only() {
        let reg = Arc::new(TransferRegistry::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        reg.on_change(Box::new(move |t| {
            s.lock().unwrap().push((t.id.clone(), t.transferred_size));
        }));

        reg.apply(start("A", 100, 0));
        reg.apply(update("A", 40));
        reg.apply(update("B", 40));
        reg.apply(update("A", 10));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ("A".to_string(), 0),
                ("A".to_string(), 40),
                ("A".to_string(), 40)
            ]
        );
    }

    #[test]
    fn callback_may_query_registry() {
        let reg = Arc::new(TransferRegistry::new());
        let counts = Arc::new(Mutex::new(Vec::new()));
        let (r, c) = (Arc::clone(&reg), Arc::clone(&counts));
        reg.on_change(Box::new(move |_| {
            c.lock().unwrap().push(r.len());
        }));

        reg.apply(start("A", 1, 0));
        reg.apply(start("B", 1, 0));
        assert_eq!(*counts.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn concurrent_readers_see_consistent_snapshots() {
        use std::thread;

        let reg = Arc::new(TransferRegistry::new());
        reg.apply(start("A", 10_000, 0));

        let writer = {
            let r = Arc::clone(&reg);
            thread::spawn(move || {
                for t in 1..=10_000 {
                    r.apply(update("A", t));
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let r = Arc::clone(&reg);
                thread::spawn(move || {
                    let mut last = 0;
                    for _ in 0..1_000 {
                        let a = r.get("A").unwrap();
                        assert!(a.transferred_size >= last);
                        assert!(a.transferred_size <= a.total_size);
                        last = a.transferred_size;
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for h in readers {
            h.join().unwrap();
        }
        assert_eq!(reg.get("A").unwrap().transferred_size, 10_000);
    }
}
