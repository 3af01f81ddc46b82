use std::{
    borrow::Borrow,
    hash::Hash,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use regex_lite::Regex;
use rustc_hash::FxHashMap;

use crate::{compiler::Node, variable::Rewrite};

/// How many entries each engine cache may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Entries live until they are invalidated explicitly.
    #[default]
    Unbounded,
    /// At most this many entries per cache; the least recently used goes first.
    ///
    /// Finding the least recently used entry scans the cache, so eviction is
    /// linear in the capacity.
    Lru(usize),
}

#[derive(Debug)]
struct Entries<K, V> {
    map: FxHashMap<K, (V, u64)>,
    tick: u64,
}

/// A thread-safe memo table.
///
/// The lock is held only for the lookup or insertion itself; values are
/// computed outside of it, so two threads missing on the same key both compute
/// and the later insertion wins.
#[derive(Debug)]
pub struct Cache<K, V> {
    policy: CachePolicy,
    entries: Mutex<Entries<K, V>>,
}

impl<K: Eq + Hash, V: Clone> Cache<K, V> {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            entries: Mutex::new(Entries {
                map: FxHashMap::default(),
                tick: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries<K, V>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut entries = self.lock();
        entries.tick += 1;
        let tick = entries.tick;

        entries.map.get_mut(key).map(|(value, used)| {
            *used = tick;
            value.clone()
        })
    }

    /// Inserts or replaces an entry and returns how many entries were evicted.
    pub fn insert(&self, key: K, value: V) -> usize {
        let mut entries = self.lock();
        entries.tick += 1;
        let tick = entries.tick;
        let mut evicted = 0;

        if let CachePolicy::Lru(capacity) = self.policy {
            let capacity = capacity.max(1);

            while !entries.map.contains_key(&key) && entries.map.len() >= capacity {
                let oldest = entries
                    .map
                    .iter()
                    .min_by_key(|(_, (_, used))| *used)
                    .map(|(_, (_, used))| *used);

                match oldest {
                    Some(oldest) => {
                        entries.map.retain(|_, (_, used)| *used != oldest);
                        evicted += 1;
                    }
                    None => break,
                }
            }
        }

        entries.map.insert(key, (value, tick));
        evicted
    }

    pub fn remove<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lock().map.remove(key).is_some()
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lock().map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Snapshot of the engine's cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Parse attempts, successful or not.
    pub parses: u64,
    pub ast_hits: u64,
    pub ast_misses: u64,
    pub evictions: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    parses: AtomicU64,
    ast_hits: AtomicU64,
    ast_misses: AtomicU64,
    evictions: AtomicU64,
}

impl Counters {
    pub(crate) fn parse(&self) {
        self.parses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn ast_hit(&self) {
        self.ast_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn ast_miss(&self) {
        self.ast_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn evicted(&self, count: usize) {
        if count > 0 {
            self.evictions.fetch_add(count as u64, Ordering::Relaxed);
        }
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            parses: self.parses.load(Ordering::Relaxed),
            ast_hits: self.ast_hits.load(Ordering::Relaxed),
            ast_misses: self.ast_misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

/// Compiled right operands of `=~` and `!~`.
///
/// Patterns that fail to compile are kept as `None` so they are not retried
/// for every feature.
#[derive(Debug)]
pub(crate) struct RegexCache {
    entries: Cache<String, Option<Arc<Regex>>>,
    counters: Arc<Counters>,
}

impl RegexCache {
    pub(crate) fn new(policy: CachePolicy, counters: Arc<Counters>) -> Self {
        Self {
            entries: Cache::new(policy),
            counters,
        }
    }

    /// Returns the cached regex for `pattern`, compiling it with `compile` on a miss.
    pub(crate) fn get_or_compile(
        &self,
        pattern: &str,
        compile: impl FnOnce(&str) -> Option<Regex>,
    ) -> Option<Arc<Regex>> {
        if let Some(regex) = self.entries.get(pattern) {
            return regex;
        }

        let regex = compile(pattern).map(Arc::new);
        let evicted = self.entries.insert(pattern.to_string(), regex.clone());
        self.counters.evicted(evicted);
        regex
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// The memo tables of one engine, one per pipeline stage.
#[derive(Debug)]
pub(crate) struct EngineCache {
    /// raw text -> normalized text
    pub(crate) normalized: Cache<String, String>,
    /// (defines signature, text) -> substituted text
    pub(crate) defines: Cache<(String, String), String>,
    /// define key set -> match pattern
    pub(crate) patterns: Cache<String, Arc<Regex>>,
    /// text -> variable rewrite
    pub(crate) variables: Cache<String, Arc<Rewrite>>,
    /// final text -> compiled tree
    pub(crate) ast: Cache<String, Arc<Node>>,
    /// Shared with every expression built by the engine.
    pub(crate) regexes: Arc<RegexCache>,
    pub(crate) counters: Arc<Counters>,
}

impl EngineCache {
    pub(crate) fn new(policy: CachePolicy) -> Self {
        let counters = Arc::new(Counters::default());

        Self {
            normalized: Cache::new(policy),
            defines: Cache::new(policy),
            patterns: Cache::new(policy),
            variables: Cache::new(policy),
            ast: Cache::new(policy),
            regexes: Arc::new(RegexCache::new(policy, Arc::clone(&counters))),
            counters,
        }
    }
}
