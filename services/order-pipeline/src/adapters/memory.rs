//! In-process store and cache
//!
//! Used when the gateway runs without backends and by the test suites. Both
//! can be told to fail or stall; a store built with
//! [`MemoryOrderStore::recording`] also keeps every order passed to `insert`.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::watch;
use types::ids::OrderId;
use types::order::{Order, OrderStatus};

use super::{CacheError, OrderCache, OrderStore, StoreError};

/// Row-per-order store with sequential identifiers starting at 1
pub struct MemoryOrderStore {
    next_id: AtomicI64,
    rows: DashMap<OrderId, Order>,
    inserted: Option<Mutex<Vec<Order>>>,
    status_updates: AtomicU64,
    fail_inserts: AtomicBool,
    fail_status_updates: AtomicBool,
    latency: Mutex<Duration>,
    hold: watch::Sender<bool>,
}

impl Default for MemoryOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            rows: DashMap::new(),
            inserted: None,
            status_updates: AtomicU64::new(0),
            fail_inserts: AtomicBool::new(false),
            fail_status_updates: AtomicBool::new(false),
            latency: Mutex::new(Duration::ZERO),
            hold: watch::channel(false).0,
        }
    }

    /// Store that also records every insert attempt, for assertions.
    pub fn recording() -> Self {
        Self {
            inserted: Some(Mutex::new(Vec::new())),
            ..Self::new()
        }
    }

    /// Simulated round-trip time added to every call.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap_or_else(PoisonError::into_inner) = latency;
    }

    pub fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_status_updates(&self, fail: bool) {
        self.fail_status_updates.store(fail, Ordering::SeqCst);
    }

    /// Stall every insert until [`release`](Self::release) is called.
    pub fn hold(&self) {
        self.hold.send_replace(true);
    }

    pub fn release(&self) {
        self.hold.send_replace(false);
    }

    /// Orders exactly as they were passed to `insert`, in call order.
    ///
    /// Always empty unless the store was built with [`recording`](Self::recording).
    pub fn inserted(&self) -> Vec<Order> {
        match &self.inserted {
            Some(inserted) => inserted.lock().unwrap_or_else(PoisonError::into_inner).clone(),
            None => Vec::new(),
        }
    }

    pub fn row(&self, order_id: OrderId) -> Option<Order> {
        self.rows.get(&order_id).map(|r| r.value().clone())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn status_updates(&self) -> u64 {
        self.status_updates.load(Ordering::SeqCst)
    }

    async fn simulate_io(&self) {
        let latency = *self.latency.lock().unwrap_or_else(PoisonError::into_inner);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, order: &Order) -> Result<OrderId, StoreError> {
        let mut held = self.hold.subscribe();
        // The sender lives in self, so this only errors if self is gone.
        let _ = held.wait_for(|held| !*held).await;
        self.simulate_io().await;

        if let Some(inserted) = &self.inserted {
            inserted.lock().unwrap_or_else(PoisonError::into_inner).push(order.clone());
        }

        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("insert rejected".to_string()));
        }

        let order_id = OrderId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.rows.insert(order_id, order.clone());
        Ok(order_id)
    }

    async fn update_status(&self, order_id: OrderId, status: OrderStatus) -> Result<(), StoreError> {
        self.simulate_io().await;
        self.status_updates.fetch_add(1, Ordering::SeqCst);

        if self.fail_status_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("status update rejected".to_string()));
        }

        let mut row = self.rows.get_mut(&order_id).ok_or(StoreError::NotFound(order_id))?;
        row.status = status;
        Ok(())
    }
}

/// Expired entries are swept after this many writes.
const PURGE_EVERY_WRITES: u64 = 256;

struct CachedValue {
    value: String,
    expires_at: Instant,
}

/// Key/value cache with per-entry expiry
#[derive(Default)]
pub struct MemoryOrderCache {
    entries: DashMap<String, CachedValue>,
    writes: AtomicU64,
    fail_writes: AtomicBool,
}

impl MemoryOrderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Live value for `key`, `None` once expired.
    pub fn get(&self, key: &str) -> Option<String> {
        let entry = self.entries.get(key)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(entry.value.clone())
    }

    /// Successful writes so far.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop expired entries.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
    }
}

#[async_trait]
impl OrderCache for MemoryOrderCache {
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::Write(format!("write to {key} rejected")));
        }

        self.entries.insert(
            key.to_string(),
            CachedValue {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        let writes = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
        if writes % PURGE_EVERY_WRITES == 0 {
            self.purge_expired();
        }
        Ok(())
    }
}
