use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// Bounded map with first-in-first-out eviction.
///
/// Re-inserting an existing key replaces its value but keeps its original
/// position in the eviction order.
#[derive(Debug, Clone)]
pub struct FifoCache<K, V> {
    map: HashMap<K, V>,
    order: VecDeque<K>,
    cap: usize,
    evictions: u64,
}

impl<K, V> FifoCache<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(cap: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            cap: cap.max(1),
            evictions: 0,
        }
    }

    pub fn get(&self, k: &K) -> Option<&V> {
        self.map.get(k)
    }

    pub fn contains_key(&self, k: &K) -> bool {
        self.map.contains_key(k)
    }

    /// Insert a value, returning the keys evicted to stay within capacity.
    pub fn put(&mut self, k: K, v: V) -> Vec<K> {
        if !self.map.contains_key(&k) {
            self.order.push_back(k.clone());
        }
        self.map.insert(k, v);

        let mut evicted = Vec::new();
        while self.map.len() > self.cap {
            let Some(old) = self.order.pop_front() else {
                break;
            };
            self.map.remove(&old);
            self.evictions += 1;
            evicted.push(old);
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Keys in insertion order, oldest first.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.order.iter()
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }
}
