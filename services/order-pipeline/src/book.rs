//! In-memory order book
//!
//! Maps each symbol to the append-only sequence of orders that completed the
//! book-update stage for it. Each symbol owns a dedicated mutex, so the
//! read-modify-write of an append can never lose a concurrent append to the
//! same symbol. The outer map's shard lock is held only long enough to find
//! or create a symbol's slot; appends to different symbols do not wait on
//! each other.
//!
//! This is not a matching structure: orders are kept in arrival order and
//! never crossed.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use types::ids::Symbol;
use types::order::PersistedOrder;

type Slot = Arc<Mutex<Vec<PersistedOrder>>>;

#[derive(Debug, Default)]
pub struct OrderBook {
    symbols: DashMap<Symbol, Slot>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an order to its symbol's sequence.
    ///
    /// Position within the symbol equals the order in which appends complete.
    pub fn append(&self, order: PersistedOrder) {
        let slot = self.slot(order.symbol());
        lock(&slot).push(order);
    }

    /// Copy of the sequence for `symbol`, empty if the symbol was never seen.
    pub fn snapshot(&self, symbol: &Symbol) -> Vec<PersistedOrder> {
        let Some(slot) = self.existing_slot(symbol) else {
            return Vec::new();
        };
        let orders = lock(&slot);
        orders.clone()
    }

    /// Number of orders booked under `symbol`.
    pub fn len(&self, symbol: &Symbol) -> usize {
        let Some(slot) = self.existing_slot(symbol) else {
            return 0;
        };
        let orders = lock(&slot);
        orders.len()
    }

    /// Symbols with at least one slot, sorted.
    pub fn symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self.symbols.iter().map(|e| e.key().clone()).collect();
        symbols.sort();
        symbols
    }

    /// Orders across every symbol.
    pub fn total_orders(&self) -> usize {
        let slots: Vec<Slot> = self.symbols.iter().map(|e| Arc::clone(e.value())).collect();
        slots.iter().map(|slot| lock(slot).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_orders() == 0
    }

    fn slot(&self, symbol: &Symbol) -> Slot {
        // Fast path avoids cloning the symbol key once the slot exists.
        if let Some(slot) = self.existing_slot(symbol) {
            return slot;
        }
        Arc::clone(self.symbols.entry(symbol.clone()).or_default().value())
    }

    fn existing_slot(&self, symbol: &Symbol) -> Option<Slot> {
        self.symbols.get(symbol).map(|e| Arc::clone(e.value()))
    }
}

// A panic while holding the lock cannot leave a half-pushed Vec behind, so the
// data is still consistent after poisoning.
fn lock(slot: &Slot) -> MutexGuard<'_, Vec<PersistedOrder>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}
