//! Memo tables behind the derived queries.
//!
//! Every table memoizes a deterministic function of the loaded permission
//! sets, so concurrent first accesses may both compute; the first insert is
//! kept and returned to both callers. Entries are never evicted: the model is
//! immutable between loads, and a load replaces the whole `ModelCaches`.

use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use string_interner::{DefaultStringInterner, DefaultSymbol};

use crate::group::PermissionGroup;
use crate::qname::QName;
use crate::types::{PermissionRefSet, PermissionReference, RequiredTarget};

/// Interned string symbol: 4 bytes, `Copy`, O(1) equality.
pub type Sym = DefaultSymbol;

/// Shared memo table with per-shard locking.
pub type MemoMap<K, V> = DashMap<K, V, ahash::RandomState>;

fn memo_map<K: Eq + Hash, V>() -> MemoMap<K, V> {
    DashMap::with_hasher(ahash::RandomState::new())
}

pub type UnconditionalKey = (PermissionReference, RequiredTarget);

/// Interned `QName`: namespace and local name are separate symbols.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct QNameKey {
    namespace: Sym,
    local_name: Sym,
}

/// Normalized cache key for required-permission lookups:
/// `(required permission, node type, aspect set, target)`.
///
/// Every name component is interned on its own, so no two distinct
/// references or aspect sets can collide through string concatenation. The
/// aspect set is sorted and deduplicated, so equal sets share one slot
/// regardless of iteration order.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct RequiredKey {
    owner: QNameKey,
    name: Sym,
    type_name: QNameKey,
    aspects: Box<[QNameKey]>,
    on: RequiredTarget,
}

/// String interner for composite keys. Lookups of already-seen strings only
/// take the read lock; `get_or_intern` under the write lock re-checks, so two
/// racing first sightings still agree on one symbol.
#[derive(Default)]
pub struct KeyInterner {
    interner: RwLock<DefaultStringInterner>,
}

impl KeyInterner {
    pub fn intern(&self, value: &str) -> Sym {
        if let Some(sym) = self.interner.read().get(value) {
            return sym;
        }
        self.interner.write().get_or_intern(value)
    }

    pub fn len(&self) -> usize {
        self.interner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn qname_key(&self, name: &QName) -> QNameKey {
        QNameKey {
            namespace: self.intern(name.namespace()),
            local_name: self.intern(name.local_name()),
        }
    }

    pub fn required_key(
        &self,
        required: &PermissionReference,
        type_name: &QName,
        aspects: &[QName],
        on: RequiredTarget,
    ) -> RequiredKey {
        let mut aspect_keys: Vec<QNameKey> =
            aspects.iter().map(|aspect| self.qname_key(aspect)).collect();
        aspect_keys.sort_unstable();
        aspect_keys.dedup();
        RequiredKey {
            owner: self.qname_key(required.owner()),
            name: self.intern(required.name()),
            type_name: self.qname_key(type_name),
            aspects: aspect_keys.into_boxed_slice(),
            on,
        }
    }
}

/// Entry counts of each memo table plus hit/miss totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub granting: usize,
    pub grantee: usize,
    pub base_groups: usize,
    pub type_permissions_exposed: usize,
    pub type_permissions_unexposed: usize,
    pub required: usize,
    pub unconditional_required: usize,
    pub interned_keys: usize,
    pub hits: u64,
    pub misses: u64,
}

pub struct ModelCaches {
    pub granting: MemoMap<PermissionReference, Arc<PermissionRefSet>>,
    pub grantee: MemoMap<PermissionReference, Arc<PermissionRefSet>>,
    pub base_groups: MemoMap<PermissionReference, Option<Arc<PermissionGroup>>>,
    pub type_permissions_exposed: MemoMap<QName, Arc<PermissionRefSet>>,
    pub type_permissions_unexposed: MemoMap<QName, Arc<PermissionRefSet>>,
    pub required: MemoMap<RequiredKey, Arc<PermissionRefSet>>,
    pub unconditional_required: MemoMap<UnconditionalKey, Arc<PermissionRefSet>>,
    pub keys: KeyInterner,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for ModelCaches {
    fn default() -> Self {
        ModelCaches {
            granting: memo_map(),
            grantee: memo_map(),
            base_groups: memo_map(),
            type_permissions_exposed: memo_map(),
            type_permissions_unexposed: memo_map(),
            required: memo_map(),
            unconditional_required: memo_map(),
            keys: KeyInterner::default(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }
}

impl ModelCaches {
    /// Look up `key`, counting the hit or miss. The shard guard is released
    /// before returning, so callers may recurse into the same table.
    pub fn lookup<K, V>(&self, table: &MemoMap<K, V>, key: &K) -> Option<V>
    where
        K: Eq + Hash,
        V: Clone,
    {
        match table.get(key).map(|entry| entry.value().clone()) {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert unless another caller got there first; returns the kept value.
    pub fn store<K, V>(&self, table: &MemoMap<K, V>, key: K, value: V) -> V
    where
        K: Eq + Hash,
        V: Clone,
    {
        table.entry(key).or_insert(value).value().clone()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            granting: self.granting.len(),
            grantee: self.grantee.len(),
            base_groups: self.base_groups.len(),
            type_permissions_exposed: self.type_permissions_exposed.len(),
            type_permissions_unexposed: self.type_permissions_unexposed.len(),
            required: self.required.len(),
            unconditional_required: self.unconditional_required.len(),
            interned_keys: self.keys.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
