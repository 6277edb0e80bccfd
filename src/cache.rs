//! Context-scoped, single-flight caching of expensive idempotent calls
//!
//! Every [`Context`] carries a cache scope. Within a scope, caches are
//! addressed by a static cache key and created lazily the first time they are
//! asked for. Each [`CacheInstance`] maps keys to cells that are either
//! pending (one caller is computing the value) or ready.
//!
//! For a given key, exactly one caller runs the computation at a time. The
//! others wait on the cell and receive a clone of the result. Failed
//! computations are not remembered: the cell is dropped, a waiting caller
//! takes over, and later calls compute again.

use std::any::Any;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock};
use std::time::Duration;

use log::debug;

use crate::context::Context;
use crate::error::{Error, Result};

/// How often a waiting caller re-checks its own context.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Store of cache instances attached to a context.
#[derive(Default)]
pub(crate) struct CacheScope {
    instances: Mutex<HashMap<&'static str, Arc<dyn Any + Send + Sync>>>,
}

impl CacheScope {
    fn instance<K, V>(&self, cache_key: &'static str) -> Result<Arc<CacheInstance<K, V>>>
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        let mut instances = self.instances.lock().map_err(|_| Error::LockPoisoned {
            context: format!("cache scope while resolving {}", cache_key),
        })?;
        let instance = instances
            .entry(cache_key)
            .or_insert_with(|| {
                Arc::new(CacheInstance::<K, V>::new(cache_key)) as Arc<dyn Any + Send + Sync>
            });
        Arc::clone(instance)
            .downcast::<CacheInstance<K, V>>()
            .map_err(|_| Error::CacheTypeMismatch {
                cache_key: cache_key.to_string(),
            })
    }
}

enum CellState<V> {
    Pending,
    Ready(V),
    /// The computing caller failed or panicked; waiters must start over.
    Abandoned,
}

struct Cell<V> {
    state: Mutex<CellState<V>>,
    changed: Condvar,
}

impl<V> Cell<V> {
    fn pending() -> Self {
        Self {
            state: Mutex::new(CellState::Pending),
            changed: Condvar::new(),
        }
    }

    fn settle(&self, state: CellState<V>) {
        let mut current = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *current = state;
        self.changed.notify_all();
    }

    fn resolved(&self) -> Option<V>
    where
        V: Clone,
    {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &*state {
            CellState::Ready(value) => Some(value.clone()),
            _ => None,
        }
    }

    fn is_pending(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        matches!(*state, CellState::Pending)
    }
}

/// A memoization table living in one cache scope.
pub struct CacheInstance<K, V> {
    name: &'static str,
    entries: RwLock<HashMap<K, Arc<Cell<V>>>>,
}

impl<K, V> std::fmt::Debug for CacheInstance<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheInstance")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

enum Lookup<V> {
    Lead(Arc<Cell<V>>),
    Wait(Arc<Cell<V>>),
}

impl<K, V> CacheInstance<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The cache key this instance is registered under.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Return the cached value for `key`, computing it if needed.
    ///
    /// `compute` runs at most once per call and only when this caller wins the
    /// right to compute. While another caller computes the same key, this
    /// call waits, returning `Error::Canceled` if `ctx` is done first.
    pub fn get_or_compute<F>(&self, ctx: &Context, key: K, compute: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        let cell = loop {
            match self.lookup(&key)? {
                Lookup::Lead(cell) => break cell,
                Lookup::Wait(cell) => {
                    if let Some(value) = self.wait(ctx, &cell)? {
                        return Ok(value);
                    }
                }
            }
        };
        self.lead(&key, cell, compute)
    }

    fn lookup(&self, key: &K) -> Result<Lookup<V>> {
        {
            let entries = self.entries.read().map_err(|_| self.poisoned())?;
            if let Some(cell) = entries.get(key) {
                return Ok(Lookup::Wait(Arc::clone(cell)));
            }
        }

        let mut entries = self.entries.write().map_err(|_| self.poisoned())?;
        if let Some(cell) = entries.get(key) {
            return Ok(Lookup::Wait(Arc::clone(cell)));
        }
        let cell = Arc::new(Cell::pending());
        entries.insert(key.clone(), Arc::clone(&cell));
        Ok(Lookup::Lead(cell))
    }

    fn lead<F>(&self, key: &K, cell: Arc<Cell<V>>, compute: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        debug!("Cache {}: computing entry", self.name);
        let mut guard = LeaderGuard {
            instance: self,
            key,
            cell,
            settled: false,
        };

        match compute() {
            Ok(value) => {
                guard.cell.settle(CellState::Ready(value.clone()));
                guard.settled = true;
                Ok(value)
            }
            Err(err) => {
                debug!("Cache {}: computation failed, entry dropped", self.name);
                // The guard abandons the cell on drop.
                Err(err)
            }
        }
    }

    /// Wait for a pending cell. `Ok(None)` means the leader gave up.
    fn wait(&self, ctx: &Context, cell: &Cell<V>) -> Result<Option<V>> {
        let mut state = cell
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        loop {
            match &*state {
                CellState::Ready(value) => return Ok(Some(value.clone())),
                CellState::Abandoned => return Ok(None),
                CellState::Pending => {}
            }
            if let Some(reason) = ctx.err() {
                return Err(Error::Canceled {
                    operation: format!("cache {}", self.name),
                    reason,
                });
            }
            let (next, _timeout) = cell
                .changed
                .wait_timeout(state, WAIT_POLL_INTERVAL)
                .unwrap_or_else(PoisonError::into_inner);
            state = next;
        }
    }

    fn abandon(&self, key: &K, cell: &Arc<Cell<V>>) {
        {
            let mut entries = self
                .entries
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if entries.get(key).is_some_and(|current| Arc::ptr_eq(current, cell)) {
                entries.remove(key);
            }
        }
        cell.settle(CellState::Abandoned);
    }

    /// Get a resolved value without computing.
    pub fn get(&self, key: &K) -> Result<Option<V>> {
        let entries = self.entries.read().map_err(|_| self.poisoned())?;
        Ok(entries.get(key).and_then(|cell| cell.resolved()))
    }

    /// Check if a resolved value exists for `key`.
    pub fn contains(&self, key: &K) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Number of resolved entries.
    pub fn len(&self) -> Result<usize> {
        let entries = self.entries.read().map_err(|_| self.poisoned())?;
        Ok(entries
            .values()
            .filter(|cell| cell.resolved().is_some())
            .count())
    }

    /// Check if no entry has been resolved yet.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Drop all resolved entries. Computations in flight keep running and
    /// still hand their result to the callers already waiting on them.
    pub fn clear(&self) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| self.poisoned())?;
        entries.retain(|_, cell| cell.is_pending());
        Ok(())
    }

    fn poisoned(&self) -> Error {
        Error::LockPoisoned {
            context: format!("cache {}", self.name),
        }
    }
}

/// Releases a pending cell if the computing caller fails or panics.
struct LeaderGuard<'a, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    instance: &'a CacheInstance<K, V>,
    key: &'a K,
    cell: Arc<Cell<V>>,
    settled: bool,
}

impl<K, V> Drop for LeaderGuard<'_, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn drop(&mut self) {
        if !self.settled {
            self.instance.abandon(self.key, &self.cell);
        }
    }
}

/// Get the cache instance registered under `cache_key` in the scope of `ctx`,
/// creating it on first use.
pub fn context_cache<K, V>(ctx: &Context, cache_key: &'static str) -> Result<Arc<CacheInstance<K, V>>>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    ctx.cache_scope().instance(cache_key)
}

/// Return the value cached under `key` in the `cache_key` cache of `ctx`,
/// computing it with `compute` when absent.
///
/// ```
/// use provision_shell::cache;
/// use provision_shell::context::Context;
///
/// let ctx = Context::background();
/// let first: String = cache::get_or_compute(&ctx, "greetings", "en", || Ok("hello".to_string())).unwrap();
/// let second: String = cache::get_or_compute(&ctx, "greetings", "en", || Ok("ignored".to_string())).unwrap();
/// assert_eq!(first, second);
/// ```
pub fn get_or_compute<K, V, F>(ctx: &Context, cache_key: &'static str, key: K, compute: F) -> Result<V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    F: FnOnce() -> Result<V>,
{
    context_cache::<K, V>(ctx, cache_key)?.get_or_compute(ctx, key, compute)
}
