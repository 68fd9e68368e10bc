//! Reference-counted asset storage
//!
//! Provides centralized, type-homogeneous storage for decoded assets,
//! independent of how the values were produced.

use rustc_hash::FxHashMap;

use crate::handle::{AssetId, AssetRef, Handle};

/// Storage for all assets of a specific type, keyed by [`AssetId`].
///
/// The store owns each value exclusively and keeps a manual reference count
/// per ID. Counts are adjusted only through [`retain`](Self::retain) and
/// [`release`](Self::release); the store never removes a value on its own.
/// When `release` reports that the last reference is gone, the caller
/// decides when to call [`remove`](Self::remove), so eviction can be
/// batched at a convenient point such as the end of a frame.
pub struct Assets<T: Send + Sync + 'static> {
    values: FxHashMap<AssetId, T>,
    ref_counts: FxHashMap<AssetId, u32>,
}

impl<T: Send + Sync + 'static> Assets<T> {
    /// Create a new empty asset storage
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: FxHashMap::default(),
            ref_counts: FxHashMap::default(),
        }
    }

    /// Add an asset under a fresh ID and return a handle to it.
    ///
    /// The reference count starts at 1. Never fails.
    pub fn add(&mut self, value: T) -> Handle<T> {
        self.add_with_id(AssetId::new(), value)
    }

    /// Add an asset under a caller-supplied ID.
    ///
    /// Any existing entry for that ID is overwritten unconditionally and its
    /// reference count reset to 1. The caller must guarantee the ID is not
    /// in concurrent use for a different logical value.
    pub fn add_with_id(&mut self, id: AssetId, value: T) -> Handle<T> {
        self.values.insert(id, value);
        self.ref_counts.insert(id, 1);
        Handle::new(id)
    }

    /// Get an asset by handle
    #[must_use]
    pub fn get(&self, handle: &impl AssetRef<T>) -> Option<&T> {
        self.values.get(&handle.id())
    }

    /// Remove an asset unconditionally, regardless of outstanding references.
    ///
    /// Returns the removed value, or `None` if the handle is unknown. This is
    /// an explicit escape hatch, not the normal eviction path; the ref-count
    /// entry is dropped along with the value.
    pub fn remove(&mut self, handle: &impl AssetRef<T>) -> Option<T> {
        let id = handle.id();
        self.ref_counts.remove(&id);
        self.values.remove(&id)
    }

    /// Check whether an asset is present for this handle
    #[must_use]
    pub fn contains(&self, handle: &impl AssetRef<T>) -> bool {
        self.values.contains_key(&handle.id())
    }

    /// Increment the reference count for a strong handle.
    ///
    /// No-op for weak handles. If no count exists yet it is initialized to 1,
    /// even when no backing value is stored for the ID.
    pub fn retain(&mut self, handle: &impl AssetRef<T>) {
        if handle.is_weak() {
            return;
        }
        *self.ref_counts.entry(handle.id()).or_insert(0) += 1;
    }

    /// Decrement the reference count for a strong handle.
    ///
    /// Returns `true` when the last reference is gone and the caller may now
    /// remove the value; the store itself never removes anything. Weak
    /// handles are a no-op returning `false`. A missing count is treated as
    /// zero (counts never go negative), so an unbalanced release also
    /// returns `true`.
    pub fn release(&mut self, handle: &impl AssetRef<T>) -> bool {
        if handle.is_weak() {
            return false;
        }
        let id = handle.id();
        match self.ref_counts.get_mut(&id) {
            None => {
                log::warn!("release of {id} without a matching retain");
                true
            }
            Some(count) if *count <= 1 => {
                self.ref_counts.remove(&id);
                true
            }
            Some(count) => {
                *count -= 1;
                false
            }
        }
    }

    /// Snapshot of all currently stored handles.
    ///
    /// Order is store-iteration order and not stable across mutation.
    #[must_use]
    pub fn handles(&self) -> Vec<Handle<T>> {
        self.values.keys().map(|&id| Handle::new(id)).collect()
    }

    /// Iterate over all stored assets as `(handle, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> + '_ {
        self.values.iter().map(|(&id, value)| (Handle::new(id), value))
    }

    /// Remove all values and all reference counts.
    ///
    /// A global reset that ignores outstanding ref-counts, not a graceful
    /// release.
    pub fn clear(&mut self) {
        self.values.clear();
        self.ref_counts.clear();
    }

    /// Get the number of stored assets
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if storage is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<T: Send + Sync + 'static> Default for Assets<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_get() {
        let mut assets = Assets::<String>::new();
        let handle = assets.add("hello".to_string());

        assert_eq!(assets.get(&handle), Some(&"hello".to_string()));
        assert!(assets.contains(&handle));
    }

    #[test]
    fn test_add_assigns_fresh_ids() {
        let mut assets = Assets::<i32>::new();
        let a = assets.add(1);
        assert_eq!(assets.len(), 1);
        let b = assets.add(2);
        assert_eq!(assets.len(), 2);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_add_with_id_overwrites() {
        let mut assets = Assets::<i32>::new();
        let handle = assets.add(1);
        assets.retain(&handle);

        let same = assets.add_with_id(handle.id(), 2);
        assert_eq!(same, handle);
        assert_eq!(assets.get(&handle), Some(&2));
        assert_eq!(assets.len(), 1);

        // the overwrite reset the count to 1
        assert!(assets.release(&handle));
    }

    #[test]
    fn test_release_on_fresh_handle() {
        let mut assets = Assets::<i32>::new();
        let handle = assets.add(7);
        // count starts at 1, so a single release drops the last reference
        assert!(assets.release(&handle));
    }

    #[test]
    fn test_retain_release_cycle() {
        let mut assets = Assets::<&str>::new();
        let handle = assets.add("v");

        assets.retain(&handle);
        assert!(!assets.release(&handle));
        assert!(assets.release(&handle));
        assert_eq!(assets.remove(&handle), Some("v"));
        assert!(!assets.contains(&handle));
    }

    #[test]
    fn test_balanced_retains_leave_count_unchanged() {
        let mut assets = Assets::<i32>::new();
        let handle = assets.add(0);

        for _ in 0..5 {
            assets.retain(&handle);
        }
        for _ in 0..5 {
            assert!(!assets.release(&handle));
        }
        // back to the initial count of 1
        assert!(assets.release(&handle));
    }

    #[test]
    fn test_weak_handles_skip_ref_counting() {
        let mut assets = Assets::<i32>::new();
        let handle = assets.add(3);
        let weak = handle.downgrade();

        assert_eq!(assets.get(&weak), Some(&3));
        assets.retain(&weak);
        assert!(!assets.release(&weak));
        // the strong count is still the initial 1
        assert!(assets.release(&handle));
    }

    #[test]
    fn test_release_without_retain_floors_at_zero() {
        let mut assets = Assets::<i32>::new();
        let orphan = Handle::<i32>::new(AssetId::new());
        assert!(assets.release(&orphan));
        // still no count entry was created
        assert!(assets.release(&orphan));
    }

    #[test]
    fn test_retain_initializes_missing_count() {
        let mut assets = Assets::<i32>::new();
        let handle = Handle::<i32>::new(AssetId::new());
        assets.retain(&handle);
        // one release drops the freshly created count
        assert!(assets.release(&handle));
    }

    #[test]
    fn test_remove_ignores_outstanding_references() {
        let mut assets = Assets::<i32>::new();
        let handle = assets.add(9);
        assets.retain(&handle);
        assert_eq!(assets.remove(&handle), Some(9));
        assert_eq!(assets.remove(&handle), None);
    }

    #[test]
    fn test_handles_and_iter() {
        let mut assets = Assets::<i32>::new();
        let a = assets.add(1);
        let b = assets.add(2);

        let handles = assets.handles();
        assert_eq!(handles.len(), 2);
        assert!(handles.contains(&a));
        assert!(handles.contains(&b));

        let mut values: Vec<i32> = assets.iter().map(|(_, v)| *v).collect();
        values.sort_unstable();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn test_clear() {
        let mut assets = Assets::<i32>::new();
        let handle = assets.add(5);
        assets.retain(&handle);
        assets.clear();

        assert_eq!(assets.len(), 0);
        assert!(assets.is_empty());
        assert_eq!(assets.iter().count(), 0);
    }
}
