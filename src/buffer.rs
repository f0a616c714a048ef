//! Buffer: reference-counted storage for fixed-size items.
//!
//! A `Buffer` is a handle; every handle (and every `View` built on one)
//! holds one reference. Writing through any handle is visible through all
//! of them. `grow` only copies when the storage is shared: a uniquely
//! owned buffer grows in place, a shared one forks a private copy for the
//! growing handle and leaves the other holders on the old storage.

use crate::alloc;
use crate::error::{CollectionError, Result};
use core::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// Capacity of the first growth step, in items.
pub const MIN_ALLOCATION: usize = 8;
/// Above this many items growth switches from doubling to fixed increments.
pub const ALLOCATION_THRESHOLD: usize = 4096;

/// Capacity after one growth step from `current` items.
///
/// Starting at `MIN_ALLOCATION`, the allocation doubles while the required
/// count is below `ALLOCATION_THRESHOLD`; past it, it advances by
/// `ALLOCATION_THRESHOLD` items at a time.
pub fn next_capacity(current: usize) -> usize {
    let needed = current.saturating_add(1);
    let mut allocation = MIN_ALLOCATION;
    while needed > allocation {
        if needed < ALLOCATION_THRESHOLD {
            allocation *= 2;
        } else {
            allocation = allocation.saturating_add(ALLOCATION_THRESHOLD);
        }
    }
    allocation
}

#[derive(Debug)]
struct Storage {
    bytes: Vec<u8>,
    item_size: usize,
}

impl Storage {
    fn capacity(&self) -> usize {
        self.bytes.len() / self.item_size
    }

    fn check_index(&self, index: usize) -> Result<core::ops::Range<usize>> {
        let cap = self.capacity();
        if index >= cap {
            return Err(CollectionError::IndexOutOfRange { index, len: cap });
        }
        let start = index * self.item_size;
        Ok(start..start + self.item_size)
    }
}

fn byte_len(item_size: usize, count: usize) -> Result<usize> {
    if item_size == 0 {
        return Err(CollectionError::ZeroItemSize);
    }
    item_size
        .checked_mul(count)
        .ok_or(CollectionError::OutOfMemory {
            requested: usize::MAX,
        })
}

/// Shared handle to a contiguous item store.
///
/// Single-threaded: the reference count is not atomic and the type is
/// neither `Send` nor `Sync`.
#[derive(Debug)]
pub struct Buffer {
    inner: Rc<RefCell<Storage>>,
}

impl Buffer {
    /// New zero-filled buffer with room for `count` items of `item_size`
    /// bytes, reference count 1.
    pub fn allocate(item_size: usize, count: usize) -> Result<Self> {
        let len = byte_len(item_size, count)?;
        let bytes = alloc::filled(len, 0u8)?;
        Ok(Self::from_storage(Storage { bytes, item_size }))
    }

    /// New buffer holding a copy of `data`, which must be exactly
    /// `count` items long.
    pub fn allocate_from(data: &[u8], item_size: usize, count: usize) -> Result<Self> {
        let len = byte_len(item_size, count)?;
        if data.len() != len {
            return Err(CollectionError::ItemSizeMismatch {
                expected: len,
                found: data.len(),
            });
        }
        let mut bytes = alloc::with_capacity(len)?;
        bytes.extend_from_slice(data);
        Ok(Self::from_storage(Storage { bytes, item_size }))
    }

    fn from_storage(storage: Storage) -> Self {
        Self {
            inner: Rc::new(RefCell::new(storage)),
        }
    }

    pub fn item_size(&self) -> usize {
        self.inner.borrow().item_size
    }

    /// Capacity in items.
    pub fn capacity(&self) -> usize {
        self.inner.borrow().capacity()
    }

    /// Number of live handles (buffers and views) on this storage.
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    pub fn is_shared(&self) -> bool {
        self.ref_count() > 1
    }

    /// True if both handles refer to the same storage.
    pub fn same_storage(&self, other: &Buffer) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Take one more reference to the same storage.
    pub fn share(&self) -> Buffer {
        Buffer {
            inner: Rc::clone(&self.inner),
        }
    }

    /// Give up this reference. Returns true if it was the last one and the
    /// storage was freed.
    pub fn release(self) -> bool {
        let last = Rc::strong_count(&self.inner) == 1;
        drop(self);
        last
    }

    /// Clear every byte of the storage.
    pub fn zero(&self) {
        self.inner.borrow_mut().bytes.fill(0);
    }

    /// Clear items `[start, start + len)`.
    pub fn zero_segment(&self, start: usize, len: usize) -> Result<()> {
        let mut s = self.inner.borrow_mut();
        let cap = s.capacity();
        match start.checked_add(len) {
            Some(end) if end <= cap => {
                let item = s.item_size;
                s.bytes[start * item..end * item].fill(0);
                Ok(())
            }
            _ => Err(CollectionError::InvalidRange {
                start,
                end: start.saturating_add(len),
                len: cap,
            }),
        }
    }

    /// Borrow the bytes of item `index` (checked against capacity).
    pub fn item_at(&self, index: usize) -> Result<Ref<'_, [u8]>> {
        let range = self.inner.borrow().check_index(index)?;
        Ok(Ref::map(self.inner.borrow(), |s| &s.bytes[range]))
    }

    /// Overwrite item `index` with `data`, which must be one item long.
    pub fn write_item_at(&self, index: usize, data: &[u8]) -> Result<()> {
        let mut s = self.inner.borrow_mut();
        let range = s.check_index(index)?;
        if data.len() != s.item_size {
            return Err(CollectionError::ItemSizeMismatch {
                expected: s.item_size,
                found: data.len(),
            });
        }
        s.bytes[range].copy_from_slice(data);
        Ok(())
    }

    /// Advance capacity to the next size class (see `next_capacity`).
    ///
    /// A uniquely owned buffer is resized in place. A shared buffer is
    /// copied into new storage and this handle moves there, dropping its
    /// reference to the old storage. On failure nothing changes.
    pub fn grow(&mut self) -> Result<()> {
        let (item_size, cap, old_len) = {
            let s = self.inner.borrow();
            (s.item_size, s.capacity(), s.bytes.len())
        };
        let new_cap = next_capacity(cap);
        let new_len = byte_len(item_size, new_cap)?;

        if Rc::strong_count(&self.inner) == 1 {
            let mut s = self.inner.borrow_mut();
            if let Err(e) = alloc::reserve(&mut s.bytes, new_len - old_len) {
                warn!(item_size, capacity = cap, "buffer growth failed: {e}");
                return Err(e);
            }
            s.bytes.resize(new_len, 0);
            trace!(item_size, from = cap, to = new_cap, "buffer grown in place");
        } else {
            let mut bytes = alloc::with_capacity(new_len).inspect_err(|e| {
                warn!(item_size, capacity = cap, "shared buffer fork failed: {e}");
            })?;
            bytes.extend_from_slice(&self.inner.borrow().bytes);
            bytes.resize(new_len, 0);
            debug!(
                item_size,
                from = cap,
                to = new_cap,
                sharers = Rc::strong_count(&self.inner) - 1,
                "shared buffer forked on growth"
            );
            self.inner = Rc::new(RefCell::new(Storage { bytes, item_size }));
        }
        Ok(())
    }

    pub(crate) fn bytes(&self) -> Ref<'_, [u8]> {
        Ref::map(self.inner.borrow(), |s| s.bytes.as_slice())
    }

    pub(crate) fn bytes_mut(&self) -> RefMut<'_, [u8]> {
        RefMut::map(self.inner.borrow_mut(), |s| s.bytes.as_mut_slice())
    }
}

impl Clone for Buffer {
    fn clone(&self) -> Self {
        self.share()
    }
}
