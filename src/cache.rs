//! Term-level and query-level memoization.
//!
//! Both caches store the report fragment produced while computing an entry,
//! so a hit leaves the request's report exactly as a miss would.

use std::collections::VecDeque;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::config::SearchConfig;
use crate::index::FieldId;
use crate::postings::{DocIdBounds, PostingsList};
use crate::query::{ExpansionFunction, RangeComparison};
use crate::search::resolver::CaseForm;
use crate::search::{ShortResult, SortKey, SortType};

/// Identity of a resolved term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TermCacheKey {
    pub index: String,
    pub language: String,
    pub text: String,
    pub field: Option<String>,
    /// Field IDs searched; `None` searches every field.
    pub scope: Option<Vec<FieldId>>,
    pub function: ExpansionFunction,
    pub range: Option<RangeComparison>,
    pub case: CaseForm,
    pub bounds: DocIdBounds,
}

/// Unweighted postings of a term plus the report lines its resolution wrote.
#[derive(Debug, Clone)]
pub struct CachedTerm {
    pub postings: PostingsList,
    pub fragment: String,
}

/// Identity of a whole query. Pagination is not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryCacheKey {
    pub index: String,
    pub language: String,
    pub normalized_text: String,
    pub positive_feedback: Option<String>,
    pub negative_feedback: Option<String>,
    pub sort_type: SortType,
}

/// Sorted short results of a query.
#[derive(Debug, Clone)]
pub struct CachedQuery {
    pub results: Vec<ShortResult>,
    pub total_results: usize,
    pub max_sort_key: Option<SortKey>,
    pub fragment: String,
}

/// Map bounded by entry count, evicting the oldest insertion first.
#[derive(Debug)]
struct BoundedMap<K, V> {
    capacity: usize,
    entries: AHashMap<K, V>,
    order: VecDeque<K>,
}

impl<K: Clone + Eq + Hash, V: Clone> BoundedMap<K, V> {
    fn new(capacity: usize) -> Self {
        BoundedMap {
            capacity,
            entries: AHashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, key: K, value: V) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.insert(key.clone(), value).is_some() {
            return;
        }
        self.order.push_back(key);
        while self.entries.len() > self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

/// Search cache shared by concurrent requests.
#[derive(Debug)]
pub struct SearchCache {
    terms: RwLock<BoundedMap<TermCacheKey, CachedTerm>>,
    queries: RwLock<BoundedMap<QueryCacheKey, CachedQuery>>,
    term_hits: AtomicUsize,
    term_misses: AtomicUsize,
    query_hits: AtomicUsize,
    query_misses: AtomicUsize,
}

impl SearchCache {
    /// Create a cache holding at most the given numbers of entries.
    pub fn new(term_capacity: usize, query_capacity: usize) -> Self {
        SearchCache {
            terms: RwLock::new(BoundedMap::new(term_capacity)),
            queries: RwLock::new(BoundedMap::new(query_capacity)),
            term_hits: AtomicUsize::new(0),
            term_misses: AtomicUsize::new(0),
            query_hits: AtomicUsize::new(0),
            query_misses: AtomicUsize::new(0),
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(config.term_cache_capacity, config.query_cache_capacity)
    }

    pub fn get_term(&self, key: &TermCacheKey) -> Option<CachedTerm> {
        let hit = self.terms.read().get(key);
        Self::count(&hit, &self.term_hits, &self.term_misses);
        hit
    }

    pub fn put_term(&self, key: TermCacheKey, value: CachedTerm) {
        self.terms.write().insert(key, value);
    }

    pub fn get_query(&self, key: &QueryCacheKey) -> Option<CachedQuery> {
        let hit = self.queries.read().get(key);
        Self::count(&hit, &self.query_hits, &self.query_misses);
        hit
    }

    pub fn put_query(&self, key: QueryCacheKey, value: CachedQuery) {
        self.queries.write().insert(key, value);
    }

    fn count<T>(hit: &Option<T>, hits: &AtomicUsize, misses: &AtomicUsize) {
        if hit.is_some() {
            hits.fetch_add(1, Ordering::Relaxed);
        } else {
            misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Drop every entry. Statistics are kept.
    pub fn clear(&self) {
        self.terms.write().clear();
        self.queries.write().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            term_entries: self.terms.read().len(),
            query_entries: self.queries.read().len(),
            term_hits: self.term_hits.load(Ordering::Relaxed),
            term_misses: self.term_misses.load(Ordering::Relaxed),
            query_hits: self.query_hits.load(Ordering::Relaxed),
            query_misses: self.query_misses.load(Ordering::Relaxed),
        }
    }
}

/// Cache performance statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub term_entries: usize,
    pub query_entries: usize,
    pub term_hits: usize,
    pub term_misses: usize,
    pub query_hits: usize,
    pub query_misses: usize,
}

impl CacheStats {
    /// Hit ratio over both caches.
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.term_hits + self.query_hits;
        let total = hits + self.term_misses + self.query_misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}
