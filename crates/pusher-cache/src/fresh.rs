//! Single-flight TTL cache.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;

use crate::{CacheError, CachePolicy};

type Loader<K, V, E> = Arc<dyn Fn(K) -> BoxFuture<'static, Result<V, E>> + Send + Sync>;
type Flight<V, E> = Shared<BoxFuture<'static, Result<V, Arc<E>>>>;

/// A cache in front of an async loader.
pub struct FreshCache<K, V, E> {
    inner: Arc<Inner<K, V, E>>,
}

impl<K, V, E> Clone for FreshCache<K, V, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<K, V, E> {
    name: &'static str,
    policy: CachePolicy,
    loader: Loader<K, V, E>,
    state: Mutex<State<K, V, E>>,
    loads: AtomicU64,
}

struct State<K, V, E> {
    slots: HashMap<K, Slot<V, E>>,
    tick: u64,
}

struct Slot<V, E> {
    value: Option<Stored<V>>,
    inflight: Option<Flight<V, E>>,
    last_used: u64,
}

struct Stored<V> {
    value: V,
    loaded_at: Instant,
}

enum Lookup<V, E> {
    Ready(V),
    Wait(Flight<V, E>),
}

impl<K, V, E> FreshCache<K, V, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: fmt::Display + Send + Sync + 'static,
{
    /// Create a cache named `name` (used in logs) around `loader`.
    pub fn new<F, Fut>(name: &'static str, policy: CachePolicy, loader: F) -> Self
    where
        F: Fn(K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let loader: Loader<K, V, E> = Arc::new(move |key| loader(key).boxed());
        Self {
            inner: Arc::new(Inner {
                name,
                policy,
                loader,
                state: Mutex::new(State {
                    slots: HashMap::new(),
                    tick: 0,
                }),
                loads: AtomicU64::new(0),
            }),
        }
    }

    /// Get the value for `key`, loading it if needed.
    pub async fn get(&self, key: K) -> Result<V, CacheError<E>> {
        match self.lookup(key) {
            Lookup::Ready(value) => Ok(value),
            Lookup::Wait(flight) => flight.await.map_err(CacheError::Load),
        }
    }

    /// Number of loads started so far.
    pub fn loads(&self) -> u64 {
        self.inner.loads.load(Ordering::Relaxed)
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.inner.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    fn lookup(&self, key: K) -> Lookup<V, E> {
        let now = Instant::now();
        let policy = self.inner.policy;
        let mut state = self.inner.lock();
        state.tick += 1;
        let tick = state.tick;

        let slot = state.slots.entry(key.clone()).or_insert_with(|| Slot {
            value: None,
            inflight: None,
            last_used: tick,
        });
        slot.last_used = tick;

        if let Some(stored) = &slot.value {
            let age = now.saturating_duration_since(stored.loaded_at);
            if age < policy.fresh_for {
                return Lookup::Ready(stored.value.clone());
            }
            if age < policy.ttl {
                let value = stored.value.clone();
                if slot.inflight.is_none() {
                    let flight = self.start(key);
                    slot.inflight = Some(flight.clone());
                    tokio::spawn(flight);
                }
                return Lookup::Ready(value);
            }
        }

        let flight = match &slot.inflight {
            Some(flight) => flight.clone(),
            None => {
                let flight = self.start(key.clone());
                slot.inflight = Some(flight.clone());
                flight
            }
        };
        state.evict(policy.capacity, &key);
        Lookup::Wait(flight)
    }

    fn start(&self, key: K) -> Flight<V, E> {
        self.inner.loads.fetch_add(1, Ordering::Relaxed);
        let load = (self.inner.loader)(key.clone());
        let weak = Arc::downgrade(&self.inner);
        async move {
            let result = load.await.map_err(Arc::new);
            if let Some(inner) = weak.upgrade() {
                inner.complete(&key, &result);
            }
            result
        }
        .boxed()
        .shared()
    }
}

impl<K, V, E> Inner<K, V, E>
where
    K: Eq + Hash,
    V: Clone,
    E: fmt::Display,
{
    fn lock(&self) -> MutexGuard<'_, State<K, V, E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn complete(&self, key: &K, result: &Result<V, Arc<E>>) {
        let mut state = self.lock();
        let Some(slot) = state.slots.get_mut(key) else {
            return;
        };
        slot.inflight = None;
        match result {
            Ok(value) => {
                slot.value = Some(Stored {
                    value: value.clone(),
                    loaded_at: Instant::now(),
                });
            }
            Err(e) => {
                tracing::warn!(cache = self.name, error = %e, "cache reload failed");
            }
        }
    }
}

impl<K: Eq + Hash + Clone, V, E> State<K, V, E> {
    /// Drop least recently used idle keys until within `capacity`.
    fn evict(&mut self, capacity: Option<usize>, keep: &K) {
        let Some(capacity) = capacity else {
            return;
        };
        while self.slots.len() > capacity {
            let victim = self
                .slots
                .iter()
                .filter(|(k, slot)| *k != keep && slot.inflight.is_none())
                .min_by_key(|(_, slot)| slot.last_used)
                .map(|(k, _)| k.clone());
            match victim {
                Some(k) => {
                    self.slots.remove(&k);
                }
                None => break,
            }
        }
    }
}
