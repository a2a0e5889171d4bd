//! Per-order status ledger
//!
//! Tracks every accepted submission through
//! `pending → persisted → completed | failed`. All writes go through
//! [`StatusLedger::transition`], a compare-and-set on the entry guarded by the
//! map's per-key lock, so two asynchronous stages racing on the same order can
//! never overwrite each other and a terminal state is never left.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;
use types::ids::{OrderId, SubmissionId};
use types::order::OrderStatus;

/// Ledger record for a single submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub status: OrderStatus,
    /// Present once the store has assigned an identifier
    pub order_id: Option<OrderId>,
    pub updated_at: DateTime<Utc>,
}

/// Number of entries in each state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedgerCounts {
    pub pending: usize,
    pub persisted: usize,
    pub completed: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
pub struct StatusLedger {
    entries: DashMap<SubmissionId, LedgerEntry>,
    by_order_id: DashMap<OrderId, SubmissionId>,
}

impl StatusLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fresh submission as `pending`.
    ///
    /// Returns false if the submission is already known.
    pub fn open(&self, id: SubmissionId) -> bool {
        let mut inserted = false;
        self.entries.entry(id).or_insert_with(|| {
            inserted = true;
            LedgerEntry {
                status: OrderStatus::Pending,
                order_id: None,
                updated_at: Utc::now(),
            }
        });
        inserted
    }

    /// Move `id` to `to` if the current state allows it.
    ///
    /// With `expected = Some(s)` the entry must currently be `s`. With `None`
    /// only edge legality is checked. Either way the edge must exist in the
    /// lifecycle, so terminal states are never left and no state is revisited.
    /// Returns false, leaving the entry untouched, when another writer got
    /// there first or the submission is unknown.
    pub fn transition(&self, id: SubmissionId, expected: Option<OrderStatus>, to: OrderStatus) -> bool {
        let Some(mut entry) = self.entries.get_mut(&id) else {
            return false;
        };

        let current = entry.status;
        if expected.is_some_and(|e| e != current) || !current.can_transition_to(to) {
            debug!(
                submission_id = %id,
                from = %current,
                to = %to,
                "ledger transition refused"
            );
            return false;
        }

        entry.status = to;
        entry.updated_at = Utc::now();
        true
    }

    /// Attach the store-assigned identifier to a submission.
    pub fn bind_order_id(&self, id: SubmissionId, order_id: OrderId) {
        if let Some(mut entry) = self.entries.get_mut(&id) {
            entry.order_id = Some(order_id);
            self.by_order_id.insert(order_id, id);
        }
    }

    /// Drop a `pending` entry whose order never made it into the queue.
    pub fn discard(&self, id: SubmissionId) -> bool {
        self.entries
            .remove_if(&id, |_, entry| entry.status == OrderStatus::Pending)
            .is_some()
    }

    pub fn status(&self, id: SubmissionId) -> Option<OrderStatus> {
        self.entries.get(&id).map(|e| e.status)
    }

    pub fn entry(&self, id: SubmissionId) -> Option<LedgerEntry> {
        self.entries.get(&id).map(|e| e.value().clone())
    }

    pub fn find_by_order_id(&self, order_id: OrderId) -> Option<SubmissionId> {
        self.by_order_id.get(&order_id).map(|e| *e.value())
    }

    pub fn counts(&self) -> LedgerCounts {
        let mut counts = LedgerCounts::default();
        for entry in self.entries.iter() {
            match entry.status {
                OrderStatus::Pending => counts.pending += 1,
                OrderStatus::Persisted => counts.persisted += 1,
                OrderStatus::Completed => counts.completed += 1,
                OrderStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget terminal entries last updated more than `older_than` ago.
    ///
    /// Returns the number of entries removed.
    pub fn prune_terminal(&self, older_than: Duration) -> usize {
        let Ok(age) = chrono::Duration::from_std(older_than) else {
            return 0;
        };
        let cutoff = Utc::now() - age;

        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let stale = entry.status.is_terminal() && entry.updated_at <= cutoff;
            if stale {
                if let Some(order_id) = entry.order_id {
                    self.by_order_id.remove(&order_id);
                }
                removed += 1;
            }
            !stale
        });
        removed
    }
}
