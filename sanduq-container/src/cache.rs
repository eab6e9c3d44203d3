//! Instance cache for the shared lifetimes.
//!
//! Each key owns a [`Slot`]: a write-once cell plus the thread currently
//! building it. Construction follows a double-checked protocol:
//!
//! 1. read the cell without locking; a warm entry is returned as-is;
//! 2. otherwise claim the slot, waiting while another thread builds it,
//!    and read the cell again once woken;
//! 3. if it is still empty, run the factory and store the result.
//!
//! A failed factory leaves the cell empty, so the next caller retries.
//! Slots are per key: first resolutions of unrelated keys never wait on
//! each other.
//!
//! Before blocking on a slot built by another thread, the caller records
//! the wait in the tree's [`WaitGraph`]. If the builder is itself
//! (transitively) waiting on a slot the caller is building, the wait
//! would never end, and the caller fails instead.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::{Condvar, Mutex};
use tracing::trace;

use crate::error::SanduqError;
use crate::key::DependencyKey;
use crate::service::Instance;

#[derive(Default)]
struct Slot {
    cell: OnceCell<Instance>,
    /// Thread running the factory, if any.
    builder: Mutex<Option<ThreadId>>,
    built: Condvar,
}

/// A thread blocked on a slot that another thread is building.
#[derive(Clone, Copy)]
struct Wait {
    builder: ThreadId,
    slot: usize,
    key: DependencyKey,
}

/// Who waits on whom, across every cache of one provider tree.
///
/// Each thread has at most one outgoing edge, and an edge that would
/// close a cycle is refused, so the graph stays acyclic.
#[derive(Default)]
pub(crate) struct WaitGraph {
    edges: Mutex<HashMap<ThreadId, Wait>>,
}

impl WaitGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `waiter` blocks on `wait`. Fails with the key of a
    /// slot `waiter` is building if the builder already waits on it.
    fn begin(&self, waiter: ThreadId, wait: Wait) -> Result<(), DependencyKey> {
        if wait.builder == waiter {
            return Err(wait.key);
        }
        let mut edges = self.edges.lock();
        let mut builder = wait.builder;
        while let Some(next) = edges.get(&builder) {
            if next.builder == waiter {
                return Err(next.key);
            }
            builder = next.builder;
        }
        edges.insert(waiter, wait);
        Ok(())
    }

    fn end(&self, waiter: ThreadId) {
        self.edges.lock().remove(&waiter);
    }

    /// Drops every wait on `slot`; its builder has let go of it.
    fn release(&self, slot: usize) {
        self.edges.lock().retain(|_, wait| wait.slot != slot);
    }

    #[cfg(test)]
    fn waiting(&self) -> usize {
        self.edges.lock().len()
    }
}

impl fmt::Debug for WaitGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitGraph")
            .field("waiting", &self.edges.lock().len())
            .finish()
    }
}

/// Clears a slot's builder when construction ends, including by panic.
struct Building<'a> {
    slot: &'a Slot,
    id: usize,
    waits: &'a WaitGraph,
}

impl Drop for Building<'_> {
    fn drop(&mut self) {
        let mut builder = self.slot.builder.lock();
        *builder = None;
        self.waits.release(self.id);
        drop(builder);
        self.slot.built.notify_all();
    }
}

/// Grow-only map from key to a single shared instance.
#[derive(Default)]
pub(crate) struct SharedCache {
    slots: DashMap<DependencyKey, Arc<Slot>>,
}

impl SharedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached instance for `key`, constructing it with
    /// `construct` if this is the first successful resolution.
    ///
    /// When waiting for another thread would deadlock, returns
    /// `cycle(held)`, where `held` is the slot this thread is building
    /// that the other thread waits on.
    pub fn get_or_construct<F, C>(
        &self,
        key: &DependencyKey,
        waits: &WaitGraph,
        construct: F,
        cycle: C,
    ) -> Result<Instance, SanduqError>
    where
        F: FnOnce() -> Result<Instance, SanduqError>,
        C: FnOnce(DependencyKey) -> SanduqError,
    {
        let slot = self.slot(key);

        if let Some(instance) = slot.cell.get() {
            trace!(key = %key, "Cache hit");
            return Ok(instance.clone());
        }

        let me = thread::current().id();
        let id = Arc::as_ptr(&slot) as usize;
        let mut builder = slot.builder.lock();
        loop {
            if let Some(instance) = slot.cell.get() {
                trace!(key = %key, "Constructed by another caller while waiting");
                return Ok(instance.clone());
            }
            let Some(other) = *builder else { break };
            let wait = Wait { builder: other, slot: id, key: *key };
            if let Err(held) = waits.begin(me, wait) {
                return Err(cycle(held));
            }
            slot.built.wait(&mut builder);
            waits.end(me);
        }
        *builder = Some(me);
        drop(builder);

        let _building = Building { slot: &slot, id, waits };
        trace!(key = %key, "Constructing shared instance");
        let instance = construct()?;
        // Only the claimed builder writes; `set` cannot find the cell full.
        let _ = slot.cell.set(instance.clone());
        Ok(instance)
    }

    /// Number of constructed instances.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.cell.get().is_some()).count()
    }

    /// The slot for `key`, created on first use.
    ///
    /// The map guard is dropped before returning, so no shard lock is
    /// held while a factory runs.
    fn slot(&self, key: &DependencyKey) -> Arc<Slot> {
        if let Some(slot) = self.slots.get(key) {
            return Arc::clone(slot.value());
        }
        Arc::clone(self.slots.entry(*key).or_default().value())
    }
}

impl fmt::Debug for SharedCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedCache")
            .field("constructed", &self.len())
            .finish()
    }
}
