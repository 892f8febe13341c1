//! Concrete map representations

use std::collections::BTreeMap;
use std::hash::Hash;

use ahash::AHashMap;

use super::{Map, MapKind};

/// Tagged union of the map candidates
pub enum RawMap<K, V> {
    Hash(AHashMap<K, V>),
    Tree(BTreeMap<K, V>),
    Array(Vec<(K, V)>),
}

impl<K, V> RawMap<K, V> {
    /// Allocate an empty map of the given kind with a capacity hint
    pub fn new(kind: MapKind, capacity: usize) -> Self {
        match kind {
            MapKind::Hash => RawMap::Hash(AHashMap::with_capacity(capacity)),
            MapKind::Tree => RawMap::Tree(BTreeMap::new()),
            MapKind::Array => RawMap::Array(Vec::with_capacity(capacity)),
        }
    }

    pub fn kind(&self) -> MapKind {
        match self {
            RawMap::Hash(_) => MapKind::Hash,
            RawMap::Tree(_) => MapKind::Tree,
            RawMap::Array(_) => MapKind::Array,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RawMap::Hash(entries) => entries.len(),
            RawMap::Tree(entries) => entries.len(),
            RawMap::Array(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Ord, V> Map<K, V> for RawMap<K, V> {
    fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self {
            RawMap::Hash(entries) => entries.insert(key, value),
            RawMap::Tree(entries) => entries.insert(key, value),
            RawMap::Array(entries) => {
                if let Some(entry) = entries.iter_mut().find(|(k, _)| *k == key) {
                    Some(std::mem::replace(&mut entry.1, value))
                } else {
                    entries.push((key, value));
                    None
                }
            }
        }
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        match self {
            RawMap::Hash(entries) => entries.remove(key),
            RawMap::Tree(entries) => entries.remove(key),
            RawMap::Array(entries) => {
                let position = entries.iter().position(|(k, _)| k == key)?;
                Some(entries.swap_remove(position).1)
            }
        }
    }

    fn get(&self, key: &K) -> Option<&V> {
        match self {
            RawMap::Hash(entries) => entries.get(key),
            RawMap::Tree(entries) => entries.get(key),
            RawMap::Array(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
        }
    }

    fn contains_key(&self, key: &K) -> bool {
        match self {
            RawMap::Hash(entries) => entries.contains_key(key),
            RawMap::Tree(entries) => entries.contains_key(key),
            RawMap::Array(entries) => entries.iter().any(|(k, _)| k == key),
        }
    }

    fn len(&self) -> usize {
        RawMap::len(self)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_> {
        match self {
            RawMap::Hash(entries) => Box::new(entries.iter()),
            RawMap::Tree(entries) => Box::new(entries.iter()),
            RawMap::Array(entries) => Box::new(entries.iter().map(|(k, v)| (k, v))),
        }
    }
}
