//! In-flight request coalescing
//!
//! Callers asking for the same key while a computation is pending attach to
//! that computation instead of starting another one. The table only holds
//! weak handles: the pending future is owned by its waiters, so once every
//! waiter is gone the entry is dead and the next caller starts over.

use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

type SharedComputation<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

struct InFlight<T, E>
where
    T: Clone,
    E: Clone,
{
    id: u64,
    handle: WeakShared<BoxFuture<'static, Result<T, E>>>,
}

struct Table<T, E>
where
    T: Clone,
    E: Clone,
{
    next_id: u64,
    entries: HashMap<String, InFlight<T, E>>,
}

/// Deduplicates concurrent computations per key
pub struct RequestCoalescer<T, E>
where
    T: Clone,
    E: Clone,
{
    table: Arc<Mutex<Table<T, E>>>,
}

impl<T, E> RequestCoalescer<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(Table {
                next_id: 0,
                entries: HashMap::new(),
            })),
        }
    }

    /// Awaits the pending computation for `key`, or starts one with `compute`
    ///
    /// Every caller attached to the same computation receives a clone of the
    /// same outcome. The key is released as soon as the computation settles,
    /// whether it succeeded or failed.
    pub async fn get_or_create<F, Fut>(&self, key: &str, compute: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let shared = self.join_or_register(key, compute);
        shared.await
    }

    /// Number of keys with a live pending computation
    pub fn in_flight(&self) -> usize {
        self.live_handles(None).len()
    }

    /// True if `key` has a live pending computation
    pub fn is_in_flight(&self, key: &str) -> bool {
        !self.live_handles(Some(key)).is_empty()
    }

    // Upgraded handles must outlive the guard: dropping the last strong
    // handle runs `Release`, which takes the same lock.
    fn live_handles(&self, key: Option<&str>) -> Vec<SharedComputation<T, E>> {
        let table = self
            .table
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        table
            .entries
            .iter()
            .filter(|(k, _)| key.map_or(true, |key| k.as_str() == key))
            .filter_map(|(_, e)| e.handle.upgrade())
            .collect()
    }

    fn join_or_register<F, Fut>(&self, key: &str, compute: F) -> SharedComputation<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let mut table = self
            .table
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(existing) = table.entries.get(key).and_then(|e| e.handle.upgrade()) {
            tracing::debug!(key, "Joining in-flight pricing computation");
            return existing;
        }

        table.next_id += 1;
        let id = table.next_id;
        let release = Release {
            table: Arc::downgrade(&self.table),
            key: key.to_string(),
            id,
        };

        let work = compute();
        let shared = async move {
            // Dropped when the computation settles or is abandoned
            let _release = release;
            work.await
        }
        .boxed()
        .shared();

        if let Some(handle) = shared.downgrade() {
            table
                .entries
                .insert(key.to_string(), InFlight { id, handle });
        }
        shared
    }
}

impl<T, E> Default for RequestCoalescer<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Removes its table entry on drop, unless the key was re-registered since
struct Release<T, E>
where
    T: Clone,
    E: Clone,
{
    table: std::sync::Weak<Mutex<Table<T, E>>>,
    key: String,
    id: u64,
}

impl<T, E> Drop for Release<T, E>
where
    T: Clone,
    E: Clone,
{
    fn drop(&mut self) {
        let Some(table) = self.table.upgrade() else {
            return;
        };
        let mut table = table.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if table.entries.get(&self.key).is_some_and(|e| e.id == self.id) {
            table.entries.remove(&self.key);
        }
    }
}
