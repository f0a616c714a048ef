//! HashTable: separate chaining over prime-sized bucket arrays.
//!
//! Entries live in a `SlotMap` arena together with their hash and the key
//! of the next entry in their chain; the bucket array only holds chain
//! heads. A resize therefore never touches keys or values: it recomputes
//! bucket positions from the stored hashes and rewrites the links.
//!
//! Growth is checked before every insert. The table moves to the next size
//! class when `4 * (len + 1) >= 3 * bucket_count` or when the longest chain
//! seen since the last resize has more than `collision_threshold` entries
//! ahead of its tail. All memory for the new layout is obtained before any
//! link is rewritten, so a failed resize leaves the table as it was.

use crate::alloc;
use crate::config::TableConfig;
use crate::error::{CollectionError, InsertError, Result};
use crate::identity::IdentityState;
use crate::reentrancy::DebugReentrancy;
use crate::size_class::SizeClass;
use crate::view::View;
use bytemuck::Pod;
use core::cmp::Ordering;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::ops::ControlFlow;
use slotmap::{DefaultKey, SlotMap};
use tracing::{debug, warn};

/// Caller-supplied hash function.
pub type HashFn<K> = Box<dyn Fn(&K) -> u64>;
/// Caller-supplied key equality.
pub type EqFn<K> = Box<dyn Fn(&K, &K) -> bool>;

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    hash: u64,
    next: Option<DefaultKey>,
}

// Where a key sits: bucket, predecessor in the chain, the entry itself.
type Position = (usize, Option<DefaultKey>, DefaultKey);

// New chain layout computed by a resize, not yet applied.
struct Relinked {
    heads: Vec<Option<DefaultKey>>,
    links: Vec<(DefaultKey, Option<DefaultKey>)>,
    max_collisions: usize,
}

pub struct HashTable<K, V, S = IdentityState> {
    hasher: S,
    hash_fn: Option<HashFn<K>>,
    eq_fn: Option<EqFn<K>>,
    slots: SlotMap<DefaultKey, Entry<K, V>>,
    buckets: Vec<Option<DefaultKey>>,
    size_class: Option<SizeClass>,
    max_collisions: usize,
    threshold: usize,
    reentrancy: DebugReentrancy,
}

impl<K, V> HashTable<K, V>
where
    K: Hash + Eq,
{
    /// Empty table with identity hashing; buckets are allocated on first
    /// insert.
    pub fn new() -> Self {
        Self::with_hasher(IdentityState)
    }

    pub fn with_config(config: TableConfig) -> Result<Self> {
        Self::with_config_and_hasher(config, IdentityState)
    }
}

impl<K, V> Default for HashTable<K, V>
where
    K: Hash + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> HashTable<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            hash_fn: None,
            eq_fn: None,
            slots: SlotMap::with_key(),
            buckets: Vec::new(),
            size_class: None,
            max_collisions: 0,
            threshold: TableConfig::new().effective_threshold(),
            reentrancy: DebugReentrancy::new(),
        }
    }

    /// Table using `hasher`, with buckets preallocated when
    /// `config.initial_size > 0`.
    pub fn with_config_and_hasher(config: TableConfig, hasher: S) -> Result<Self> {
        let mut table = Self::with_hasher(hasher);
        table.threshold = config.effective_threshold();
        if config.initial_size > 0 {
            let class = SizeClass::for_request(config.initial_size as u64).ok_or_else(|| {
                CollectionError::CapacityExceeded {
                    requested: config.initial_size,
                    capacity: max_buckets(),
                }
            })?;
            let relinked = table.relink(class)?;
            table.commit(class, relinked);
        }
        Ok(table)
    }

    fn make_hash(&self, key: &K) -> u64 {
        match &self.hash_fn {
            Some(f) => f(key),
            None => self.hasher.hash_one(key),
        }
    }

    fn keys_equal(&self, a: &K, b: &K) -> bool {
        match &self.eq_fn {
            Some(f) => f(a, b),
            None => a == b,
        }
    }

    // Callers check that buckets exist.
    fn bucket_index(&self, hash: u64) -> usize {
        (hash % self.buckets.len() as u64) as usize
    }

    fn locate(&self, hash: u64, key: &K) -> Option<Position> {
        if self.buckets.is_empty() {
            return None;
        }
        let b = self.bucket_index(hash);
        let mut prev = None;
        let mut cur = self.buckets[b];
        while let Some(k) = cur {
            let e = &self.slots[k];
            if self.keys_equal(&e.key, key) {
                return Some((b, prev, k));
            }
            prev = cur;
            cur = e.next;
        }
        None
    }

    fn find(&self, key: &K, op: &'static str) -> Option<DefaultKey> {
        let _g = self.reentrancy.enter(op);
        let hash = self.make_hash(key);
        self.locate(hash, key).map(|(_, _, k)| k)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of buckets, 0 before the first allocation.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn size_class(&self) -> Option<SizeClass> {
        self.size_class
    }

    /// Entries ahead of the tail in the longest chain seen since the last
    /// resize.
    pub fn max_collisions(&self) -> usize {
        self.max_collisions
    }

    pub fn collision_threshold(&self) -> usize {
        self.threshold
    }

    /// Insert `key -> value`. An equal key already present is an error and
    /// the table is left unchanged, as it is when growing fails.
    pub fn insert(&mut self, key: K, value: V) -> core::result::Result<(), InsertError> {
        let hash = {
            let _g = self.reentrancy.enter("insert");
            let hash = self.make_hash(&key);
            if self.locate(hash, &key).is_some() {
                return Err(InsertError::DuplicateKey);
            }
            hash
        };

        alloc::reserve_slot(&mut self.slots).map_err(|e| {
            warn!(entries = self.len(), "hash table entry arena growth failed: {e}");
            InsertError::OutOfMemory
        })?;
        if self.needs_resize() {
            self.resize()?;
        }

        let b = self.bucket_index(hash);
        let k = self.slots.insert(Entry {
            key,
            value,
            hash,
            next: None,
        });
        let mut ahead = 0;
        match self.buckets[b] {
            None => self.buckets[b] = Some(k),
            Some(mut cur) => loop {
                ahead += 1;
                let e = &mut self.slots[cur];
                match e.next {
                    Some(n) => cur = n,
                    None => {
                        e.next = Some(k);
                        break;
                    }
                }
            },
        }
        self.max_collisions = self.max_collisions.max(ahead);
        Ok(())
    }

    pub fn lookup(&self, key: &K) -> Option<&V> {
        let k = self.find(key, "lookup")?;
        self.slots.get(k).map(|e| &e.value)
    }

    /// The stored key equal to `key`.
    pub fn lookup_key(&self, key: &K) -> Option<&K> {
        let k = self.find(key, "lookup_key")?;
        self.slots.get(k).map(|e| &e.key)
    }

    pub fn lookup_mut(&mut self, key: &K) -> Option<&mut V> {
        let k = self.find(key, "lookup_mut")?;
        self.slots.get_mut(k).map(|e| &mut e.value)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key, "contains_key").is_some()
    }

    /// Unlink the entry equal to `key` and hand it back.
    pub fn remove(&mut self, key: &K) -> Option<(K, V)> {
        let (b, prev, k) = {
            let _g = self.reentrancy.enter("remove");
            let hash = self.make_hash(key);
            self.locate(hash, key)?
        };
        let entry = self.slots.remove(k)?;
        match prev {
            None => self.buckets[b] = entry.next,
            Some(p) => self.slots[p].next = entry.next,
        }
        Some((entry.key, entry.value))
    }

    /// Remove the entry equal to `key`. Returns whether one was found.
    pub fn delete(&mut self, key: &K) -> bool {
        self.remove(key).is_some()
    }

    /// Call `f(bucket, key, value)` for every entry, bucket by bucket and in
    /// chain order within a bucket, until `f` breaks.
    pub fn visit<F>(&self, mut f: F) -> ControlFlow<()>
    where
        F: FnMut(usize, &K, &V) -> ControlFlow<()>,
    {
        for (b, head) in self.buckets.iter().enumerate() {
            let mut cur = *head;
            while let Some(k) = cur {
                let e = &self.slots[k];
                f(b, &e.key, &e.value)?;
                cur = e.next;
            }
        }
        ControlFlow::Continue(())
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            buckets: &self.buckets,
            slots: &self.slots,
            bucket: 0,
            cur: None,
        }
    }

    /// Visit every entry in `key`'s bucket whose key is `==` to `key`,
    /// ignoring any custom equality.
    pub fn visit_key_matches<F>(&self, key: &K, mut f: F) -> ControlFlow<()>
    where
        F: FnMut(&K, &V) -> ControlFlow<()>,
    {
        if self.buckets.is_empty() {
            return ControlFlow::Continue(());
        }
        let hash = {
            let _g = self.reentrancy.enter("visit_key_matches");
            self.make_hash(key)
        };
        let mut cur = self.buckets[self.bucket_index(hash)];
        while let Some(k) = cur {
            let e = &self.slots[k];
            if e.key == *key {
                f(&e.key, &e.value)?;
            }
            cur = e.next;
        }
        ControlFlow::Continue(())
    }

    /// Every key in bucket-scan order, copied into a fresh view.
    pub fn keys(&self) -> Result<View>
    where
        K: Pod,
    {
        let mut view = View::new(core::mem::size_of::<K>(), self.len())?;
        for (key, _) in self.iter() {
            view.push(*key)?;
        }
        Ok(view)
    }

    /// Every key, sorted with `cmp`.
    pub fn keys_sorted_by<F>(&self, cmp: F) -> Result<View>
    where
        K: Pod,
        F: FnMut(&K, &K) -> Ordering,
    {
        let mut view = self.keys()?;
        view.sort_as(cmp)?;
        Ok(view)
    }

    /// Snapshot of the table's shape.
    pub fn stats(&self) -> TableStats {
        let mut chain_lengths = Vec::new();
        for head in &self.buckets {
            let mut len = 0;
            let mut cur = *head;
            while let Some(k) = cur {
                len += 1;
                cur = self.slots[k].next;
            }
            if chain_lengths.len() <= len {
                chain_lengths.resize(len + 1, 0);
            }
            chain_lengths[len] += 1;
        }
        TableStats {
            entries: self.len(),
            buckets: self.bucket_count(),
            size_class: self.size_class,
            max_collisions: self.max_collisions,
            collision_threshold: self.threshold,
            chain_lengths,
        }
    }

    /// Tear the table down, handing each entry to `f` in bucket order.
    pub fn finalize<F>(mut self, mut f: F)
    where
        F: FnMut(K, V),
    {
        let buckets = core::mem::take(&mut self.buckets);
        for head in buckets {
            let mut cur = head;
            while let Some(k) = cur {
                let Some(e) = self.slots.remove(k) else {
                    break;
                };
                cur = e.next;
                f(e.key, e.value);
            }
        }
    }

    fn needs_resize(&self) -> bool {
        match self.size_class {
            None => true,
            Some(_) => {
                4 * (self.len() + 1) >= 3 * self.buckets.len()
                    || self.max_collisions > self.threshold
            }
        }
    }

    fn resize(&mut self) -> core::result::Result<(), InsertError> {
        let next = match self.size_class {
            None => Some(SizeClass::first()),
            Some(c) => c.next(),
        };
        let Some(next) = next else {
            warn!(
                buckets = self.buckets.len(),
                entries = self.len(),
                "hash table is at its largest size class"
            );
            return Err(InsertError::OutOfMemory);
        };
        let old_buckets = self.buckets.len();
        let relinked = self.relink(next).map_err(|e| {
            warn!(
                old_buckets,
                new_buckets = next.buckets(),
                entries = self.len(),
                "hash table resize failed: {e}"
            );
            InsertError::OutOfMemory
        })?;
        self.commit(next, relinked);
        debug!(
            old_buckets,
            new_buckets = self.buckets.len(),
            entries = self.len(),
            "resized hash table"
        );
        Ok(())
    }

    // Compute the chain layout for `class` without touching the table.
    fn relink(&self, class: SizeClass) -> Result<Relinked> {
        let n = class.buckets();
        let mut heads = alloc::filled(n, None)?;
        let mut links = alloc::with_capacity(self.slots.len())?;
        let mut lengths: Vec<usize> = alloc::filled(n, 0)?;
        let mut max_collisions = 0;
        for (k, e) in self.slots.iter() {
            let b = (e.hash % n as u64) as usize;
            links.push((k, heads[b]));
            heads[b] = Some(k);
            lengths[b] += 1;
            max_collisions = max_collisions.max(lengths[b] - 1);
        }
        Ok(Relinked {
            heads,
            links,
            max_collisions,
        })
    }

    fn commit(&mut self, class: SizeClass, relinked: Relinked) {
        for (k, next) in relinked.links {
            self.slots[k].next = next;
        }
        self.buckets = relinked.heads;
        self.size_class = Some(class);
        self.max_collisions = relinked.max_collisions;
    }
}

fn max_buckets() -> usize {
    let mut class = SizeClass::first();
    while let Some(n) = class.next() {
        class = n;
    }
    class.buckets()
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for HashTable<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashTable")
            .field("len", &self.slots.len())
            .field("buckets", &self.buckets.len())
            .field("max_collisions", &self.max_collisions)
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

/// Iterator over `(key, value)` in bucket-scan order.
pub struct Iter<'a, K, V> {
    buckets: &'a [Option<DefaultKey>],
    slots: &'a SlotMap<DefaultKey, Entry<K, V>>,
    bucket: usize,
    cur: Option<DefaultKey>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.cur.is_none() {
            let head = self.buckets.get(self.bucket)?;
            self.cur = *head;
            self.bucket += 1;
        }
        let e = self.slots.get(self.cur?)?;
        self.cur = e.next;
        Some((&e.key, &e.value))
    }
}

/// Builder for tables with a custom hash function or key equality.
pub struct TableBuilder<K, S = IdentityState> {
    config: TableConfig,
    hasher: S,
    hash_fn: Option<HashFn<K>>,
    eq_fn: Option<EqFn<K>>,
}

impl<K> TableBuilder<K> {
    pub fn new() -> Self {
        Self {
            config: TableConfig::new(),
            hasher: IdentityState,
            hash_fn: None,
            eq_fn: None,
        }
    }
}

impl<K> Default for TableBuilder<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, S> TableBuilder<K, S> {
    /// Hash keys with `f` instead of the `BuildHasher`.
    pub fn hash_fn(mut self, f: impl Fn(&K) -> u64 + 'static) -> Self {
        self.hash_fn = Some(Box::new(f));
        self
    }

    /// Compare keys with `f` instead of `Eq`.
    pub fn eq_fn(mut self, f: impl Fn(&K, &K) -> bool + 'static) -> Self {
        self.eq_fn = Some(Box::new(f));
        self
    }

    pub fn hasher<S2: BuildHasher>(self, hasher: S2) -> TableBuilder<K, S2> {
        TableBuilder {
            config: self.config,
            hasher,
            hash_fn: self.hash_fn,
            eq_fn: self.eq_fn,
        }
    }

    pub fn config(mut self, config: TableConfig) -> Self {
        self.config = config;
        self
    }

    pub fn initial_size(mut self, initial_size: usize) -> Self {
        self.config = self.config.initial_size(initial_size);
        self
    }

    pub fn collision_threshold(mut self, threshold: usize) -> Self {
        self.config = self.config.collision_threshold(threshold);
        self
    }

    pub fn build<V>(self) -> Result<HashTable<K, V, S>>
    where
        K: Hash + Eq,
        S: BuildHasher,
    {
        let mut table = HashTable::with_config_and_hasher(self.config, self.hasher)?;
        table.hash_fn = self.hash_fn;
        table.eq_fn = self.eq_fn;
        Ok(table)
    }
}

/// Shape of a table at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStats {
    pub entries: usize,
    pub buckets: usize,
    pub size_class: Option<SizeClass>,
    pub max_collisions: usize,
    pub collision_threshold: usize,
    /// `chain_lengths[n]` buckets hold exactly `n` entries.
    pub chain_lengths: Vec<usize>,
}

impl fmt::Display for TableStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "entries: {}", self.entries)?;
        match self.size_class {
            Some(c) => writeln!(f, "buckets: {} (class {})", self.buckets, c.boundary())?,
            None => writeln!(f, "buckets: none")?,
        }
        writeln!(
            f,
            "max collisions: {} (threshold {})",
            self.max_collisions, self.collision_threshold
        )?;
        for (len, count) in self.chain_lengths.iter().enumerate() {
            if *count > 0 {
                writeln!(f, "  chains of {len}: {count}")?;
            }
        }
        Ok(())
    }
}
