//! Asset identifiers and handles
//!
//! Provides type-safe handles for referencing assets without owning them.
//! Handles are plain identifiers; reference counting is the responsibility
//! of the store that issued them.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for generating unique asset IDs
static NEXT_ASSET_ID: AtomicU64 = AtomicU64::new(1);

/// A process-unique identifier for a logical asset.
///
/// IDs are allocated from a monotonic counter and never reused within a
/// process, so a stale handle can never alias a newer asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetId(u64);

impl AssetId {
    /// Allocate a fresh ID, distinct from all previously created IDs
    #[must_use]
    pub fn new() -> Self {
        Self(NEXT_ASSET_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for AssetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AssetId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(Self)
    }
}

/// Shared lookup capability over strong and weak handles.
///
/// Stores accept any `AssetRef` for lookups; `is_weak` lets ref-counting
/// operations no-op correctly on weak references.
pub trait AssetRef<T> {
    /// Get the ID this reference points at
    fn id(&self) -> AssetId;

    /// Whether this reference is excluded from reference counting
    fn is_weak(&self) -> bool;
}

/// A strong handle to an asset of type `T`.
///
/// Creating or copying a handle does not touch any ref-count; counts are
/// adjusted explicitly through [`Assets::retain`] and [`Assets::release`].
///
/// [`Assets::retain`]: crate::storage::Assets::retain
/// [`Assets::release`]: crate::storage::Assets::release
pub struct Handle<T> {
    id: AssetId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// Wrap an ID in a strong handle, without side effects
    #[must_use]
    pub const fn new(id: AssetId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// Get the ID of this handle
    #[must_use]
    pub const fn id(&self) -> AssetId {
        self.id
    }

    /// Create a weak handle to the same asset
    #[must_use]
    pub const fn downgrade(&self) -> WeakHandle<T> {
        WeakHandle::new(self.id)
    }
}

impl<T> AssetRef<T> for Handle<T> {
    fn id(&self) -> AssetId {
        self.id
    }

    fn is_weak(&self) -> bool {
        false
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&self.id).finish()
    }
}

/// A weak handle to an asset that does not participate in reference counting.
///
/// Useful for caches and back-references that must not keep an asset alive.
pub struct WeakHandle<T> {
    id: AssetId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> WeakHandle<T> {
    /// Wrap an ID in a weak handle, without side effects
    #[must_use]
    pub const fn new(id: AssetId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// Get the ID of this handle
    #[must_use]
    pub const fn id(&self) -> AssetId {
        self.id
    }
}

impl<T> AssetRef<T> for WeakHandle<T> {
    fn id(&self) -> AssetId {
        self.id
    }

    fn is_weak(&self) -> bool {
        true
    }
}

impl<T> Clone for WeakHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for WeakHandle<T> {}

impl<T> PartialEq for WeakHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for WeakHandle<T> {}

impl<T> Hash for WeakHandle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for WeakHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WeakHandle").field(&self.id).finish()
    }
}
