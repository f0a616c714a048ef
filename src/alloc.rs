//! Fallible allocation helpers.
//!
//! Growth paths (buffer growth, bucket arrays, the entry arena, rehash
//! scratch space) reserve memory through these helpers so that exhaustion is reported as
//! `CollectionError::OutOfMemory` and the caller can roll back. Test builds
//! can make a chosen allocation fail with `fail_after`.

use crate::error::CollectionError;
use slotmap::{Key, SlotMap};

/// Reserve room for exactly `additional` more items in `v`.
pub(crate) fn reserve<T>(v: &mut Vec<T>, additional: usize) -> Result<(), CollectionError> {
    let requested = additional.saturating_mul(core::mem::size_of::<T>());
    fault::charge(requested)?;
    v.try_reserve_exact(additional)
        .map_err(|_| CollectionError::OutOfMemory { requested })
}

/// Allocate a vector of `n` copies of `fill`.
pub(crate) fn filled<T: Clone>(n: usize, fill: T) -> Result<Vec<T>, CollectionError> {
    let mut v = Vec::new();
    reserve(&mut v, n)?;
    v.resize(n, fill);
    Ok(v)
}

/// Allocate an empty vector able to hold `n` items without reallocating.
pub(crate) fn with_capacity<T>(n: usize) -> Result<Vec<T>, CollectionError> {
    let mut v = Vec::new();
    reserve(&mut v, n)?;
    Ok(v)
}

/// Make sure `map` can take one more entry without reallocating.
pub(crate) fn reserve_slot<K: Key, V>(map: &mut SlotMap<K, V>) -> Result<(), CollectionError> {
    // Free slots and spare capacity both show up as len < capacity.
    if map.len() < map.capacity() {
        return Ok(());
    }
    let requested = core::mem::size_of::<V>();
    fault::charge(requested)?;
    map.try_reserve(1)
        .map_err(|_| CollectionError::OutOfMemory { requested })
}

#[cfg(test)]
pub(crate) use fault::fail_after;


#[cfg(not(test))]
mod fault {
    use crate::error::CollectionError;

    #[inline(always)]
    pub(super) fn charge(_requested: usize) -> Result<(), CollectionError> {
        Ok(())
    }
}
