use dashmap::DashMap;
use std::borrow::Borrow;
use std::hash::Hash;

/// Extension helpers for `DashMap` that avoid holding shard locks across `.await`.
///
/// `DashMap::get()` returns a guard that holds a shard lock. Awaiting while
/// it is alive can deadlock the shard, so these helpers clone and drop the
/// guard immediately.
pub trait DashMapExt<K, V> {
    /// Clone the value for `key`.
    fn get_cloned<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone;

    /// Clone every value matching `filter`.
    fn values_cloned_where<F>(&self, filter: F) -> Vec<V>
    where
        F: Fn(&K, &V) -> bool,
        V: Clone;
}

impl<K, V> DashMapExt<K, V> for DashMap<K, V>
where
    K: Eq + Hash,
{
    fn get_cloned<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.get(key).map(|r| r.value().clone())
    }

    fn values_cloned_where<F>(&self, filter: F) -> Vec<V>
    where
        F: Fn(&K, &V) -> bool,
        V: Clone,
    {
        self.iter()
            .filter(|e| filter(e.key(), e.value()))
            .map(|e| e.value().clone())
            .collect()
    }
}
