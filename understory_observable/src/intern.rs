// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared string cache for stored values.
//!
//! Property bags see the same short strings written over and over (status
//! codes, names, enum-like text). [`ValueCache`] hands out one shared
//! `Arc<str>` per distinct string so repeated writes compare by pointer and do
//! not allocate.
//!
//! Entries that nobody else references any more are removed lazily: the cache
//! records when it was last swept and, on the next use after the sweep
//! interval has elapsed, drops every entry whose only owner is the cache. No
//! background thread is involved.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use understory_observable::intern::ValueCache;
//!
//! let cache = ValueCache::new();
//! let a = cache.intern_str("ready");
//! let b = cache.intern_str("ready");
//! assert!(Arc::ptr_eq(&a, &b));
//! ```

use std::sync::{Arc, LazyLock, Mutex};
use std::time::{Duration, Instant};

use hashbrown::HashSet;

use crate::event::lock;
use crate::value::Value;

/// Strings longer than this are stored as-is.
pub const MAX_INTERNED_LEN: usize = 64;

/// Default time between sweeps of unreferenced entries.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

static GLOBAL: LazyLock<ValueCache> = LazyLock::new(ValueCache::new);

/// A string intern cache with lazy cleanup.
pub struct ValueCache {
    state: Mutex<CacheState>,
    interval: Duration,
}

struct CacheState {
    entries: HashSet<Arc<str>>,
    last_sweep: Instant,
}

impl ValueCache {
    /// Creates a cache using [`DEFAULT_SWEEP_INTERVAL`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_sweep_interval(DEFAULT_SWEEP_INTERVAL)
    }

    /// Creates a cache that sweeps at most once per `interval`.
    #[must_use]
    pub fn with_sweep_interval(interval: Duration) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashSet::new(),
                last_sweep: Instant::now(),
            }),
            interval,
        }
    }

    /// The process-wide cache used by property bags.
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Returns the shared copy of `text`.
    pub fn intern_str(&self, text: &str) -> Arc<str> {
        if text.len() > MAX_INTERNED_LEN {
            return Arc::from(text);
        }
        let mut state = lock(&self.state);
        self.sweep_if_due(&mut state);
        if let Some(existing) = state.entries.get(text) {
            return existing.clone();
        }
        let shared: Arc<str> = Arc::from(text);
        state.entries.insert(shared.clone());
        shared
    }

    /// Replaces short strings inside `value` with their shared copy.
    ///
    /// Other kinds are returned unchanged.
    pub fn intern(&self, value: Value) -> Value {
        match value {
            Value::String(text) if text.len() <= MAX_INTERNED_LEN => {
                let mut state = lock(&self.state);
                self.sweep_if_due(&mut state);
                if let Some(existing) = state.entries.get(&*text) {
                    Value::String(existing.clone())
                } else {
                    state.entries.insert(text.clone());
                    Value::String(text)
                }
            }
            other => other,
        }
    }

    /// Returns the number of cached strings.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.state).entries.len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry that only the cache still references.
    pub fn sweep(&self) {
        let mut state = lock(&self.state);
        Self::sweep_now(&mut state);
    }

    fn sweep_if_due(&self, state: &mut CacheState) {
        if state.last_sweep.elapsed() >= self.interval {
            Self::sweep_now(state);
        }
    }

    fn sweep_now(state: &mut CacheState) {
        let before = state.entries.len();
        state.entries.retain(|entry| Arc::strong_count(entry) > 1);
        state.last_sweep = Instant::now();
        let removed = before - state.entries.len();
        if removed > 0 {
            tracing::trace!(removed, remaining = state.entries.len(), "swept value cache");
        }
    }
}

impl Default for ValueCache {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for ValueCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ValueCache")
            .field("entries", &self.len())
            .field("interval", &self.interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_shares_allocation() {
        let cache = ValueCache::new();
        let a = cache.intern(Value::from("on"));
        let b = cache.intern(Value::from("on"));
        match (a, b) {
            (Value::String(a), Value::String(b)) => assert!(Arc::ptr_eq(&a, &b)),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn long_strings_are_not_cached() {
        let cache = ValueCache::new();
        let long = "x".repeat(MAX_INTERNED_LEN + 1);
        let _ = cache.intern_str(&long);
        assert!(cache.is_empty());
    }

    #[test]
    fn non_strings_pass_through() {
        let cache = ValueCache::new();
        assert_eq!(cache.intern(Value::Int(3)), Value::Int(3));
        assert!(cache.is_empty());
    }

    #[test]
    fn sweep_drops_unreferenced_entries() {
        let cache = ValueCache::with_sweep_interval(Duration::ZERO);
        let kept = cache.intern_str("kept");
        drop(cache.intern_str("gone"));
        assert_eq!(cache.len(), 2);

        // The next use sweeps because the interval has elapsed.
        let _again = cache.intern_str("kept");
        assert_eq!(cache.len(), 1);
        drop(kept);
    }
}
