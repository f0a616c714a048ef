//! View: a window `[start, start + len)` over a shared `Buffer`.
//!
//! ```text
//!   buffer:  0 1 2 3 4 5 6 7 8 9 a b c d e f     capacity = 16
//!           [I I I I I I I I I I I I I I I I]
//!   view:            ^               ^
//!                  start=4          end=12
//!                    |<------------->|           len = 8
//!                    |<-------------------->|    capacity = 12
//! ```
//!
//! Views that share a buffer alias each other: a write through one is
//! visible through every view covering the same item. Only `append` and
//! `insert_at` may need more room; when the buffer is full they grow it,
//! and a shared buffer is forked so that the other views keep the old
//! storage. Appending to a view that ends before its buffer's capacity
//! writes into the shared storage past its end, which other views may be
//! using.
//!
//! Item contents are raw bytes of `item_size`. Plain-old-data items can be
//! read and written as typed values (`get`, `set`, `push`); the type's size
//! must equal the item size.

use crate::alloc;
use crate::buffer::Buffer;
use crate::error::{CollectionError, Result};
use bytemuck::Pod;
use core::cell::{Ref, RefMut};
use core::cmp::Ordering;
use core::ops::{ControlFlow, Range};

#[derive(Debug)]
pub struct View {
    buffer: Buffer,
    start: usize,
    len: usize,
}

impl View {
    /// View over an existing buffer with `start = 0`. The view takes over
    /// the given handle.
    pub fn from_buffer(buffer: Buffer, len: usize) -> Result<Self> {
        let capacity = buffer.capacity();
        if len > capacity {
            return Err(CollectionError::CapacityExceeded {
                requested: len,
                capacity,
            });
        }
        Ok(Self {
            buffer,
            start: 0,
            len,
        })
    }

    /// Empty view over a fresh buffer with room for `count` items.
    pub fn new(item_size: usize, count: usize) -> Result<Self> {
        let buffer = Buffer::allocate(item_size, count)?;
        Ok(Self {
            buffer,
            start: 0,
            len: 0,
        })
    }

    /// View of length `count` over a fresh copy of `data`.
    pub fn from_data(data: &[u8], item_size: usize, count: usize) -> Result<Self> {
        let buffer = Buffer::allocate_from(data, item_size, count)?;
        Ok(Self {
            buffer,
            start: 0,
            len: count,
        })
    }

    /// View over a fresh copy of `items`, one item per element.
    pub fn from_items<T: Pod>(items: &[T]) -> Result<Self> {
        Self::from_data(
            bytemuck::cast_slice(items),
            core::mem::size_of::<T>(),
            items.len(),
        )
    }

    /// New view of items `[start, end)` of this one, sharing the buffer.
    pub fn sub_view(&self, start: usize, end: usize) -> Result<Self> {
        if start > end || end > self.len {
            return Err(CollectionError::InvalidRange {
                start,
                end,
                len: self.len,
            });
        }
        Ok(Self {
            buffer: self.buffer.share(),
            start: self.start + start,
            len: end - start,
        })
    }

    /// Another view of the same items, sharing the buffer.
    pub fn duplicate(&self) -> Self {
        Self {
            buffer: self.buffer.share(),
            start: self.start,
            len: self.len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Items available from `start` to the end of the buffer.
    pub fn capacity(&self) -> usize {
        self.buffer.capacity() - self.start
    }

    pub fn item_size(&self) -> usize {
        self.buffer.item_size()
    }

    /// Offset of the first item in the buffer.
    pub fn offset(&self) -> usize {
        self.start
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// Re-slice to `len` items within the current capacity.
    pub fn set_length(&mut self, len: usize) -> Result<()> {
        let capacity = self.capacity();
        if len > capacity {
            return Err(CollectionError::CapacityExceeded {
                requested: len,
                capacity,
            });
        }
        self.len = len;
        Ok(())
    }

    /// Shorten the view to at most `len` items.
    pub fn truncate(&mut self, len: usize) {
        self.len = self.len.min(len);
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.len {
            return Err(CollectionError::IndexOutOfRange {
                index,
                len: self.len,
            });
        }
        Ok(())
    }

    fn check_item(&self, data: &[u8]) -> Result<()> {
        let expected = self.item_size();
        if data.len() != expected {
            return Err(CollectionError::ItemSizeMismatch {
                expected,
                found: data.len(),
            });
        }
        Ok(())
    }

    fn check_type<T: Pod>(&self) -> Result<()> {
        let expected = self.item_size();
        let found = core::mem::size_of::<T>();
        if found != expected {
            return Err(CollectionError::ItemSizeMismatch { expected, found });
        }
        Ok(())
    }

    // Byte range in the buffer of view items [from, to).
    fn byte_range(&self, from: usize, to: usize) -> Range<usize> {
        let item = self.item_size();
        (self.start + from) * item..(self.start + to) * item
    }

    /// Borrow the bytes of item `index`.
    pub fn read_at(&self, index: usize) -> Result<Ref<'_, [u8]>> {
        self.check_index(index)?;
        self.buffer.item_at(self.start + index)
    }

    /// Overwrite item `index`.
    pub fn write_at(&mut self, index: usize, data: &[u8]) -> Result<()> {
        self.check_index(index)?;
        self.buffer.write_item_at(self.start + index, data)
    }

    /// Read item `index` as a `T`.
    pub fn get<T: Pod>(&self, index: usize) -> Result<T> {
        self.check_type::<T>()?;
        let bytes = self.read_at(index)?;
        Ok(bytemuck::pod_read_unaligned(&bytes))
    }

    /// Write `value` at item `index`.
    pub fn set<T: Pod>(&mut self, index: usize, value: T) -> Result<()> {
        self.check_type::<T>()?;
        self.write_at(index, bytemuck::bytes_of(&value))
    }

    /// Append `value` as a new last item.
    pub fn push<T: Pod>(&mut self, value: T) -> Result<()> {
        self.check_type::<T>()?;
        self.append(bytemuck::bytes_of(&value))
    }

    /// Copy every item out as a `T`.
    pub fn to_vec<T: Pod>(&self) -> Result<Vec<T>> {
        self.check_type::<T>()?;
        let mut out = alloc::with_capacity(self.len)?;
        let bytes = self.bytes();
        out.extend(
            bytes
                .chunks_exact(self.item_size())
                .map(bytemuck::pod_read_unaligned::<T>),
        );
        Ok(out)
    }

    /// Borrow the bytes of all items in the view.
    pub fn bytes(&self) -> Ref<'_, [u8]> {
        let range = self.byte_range(0, self.len);
        Ref::map(self.buffer.bytes(), |b| &b[range])
    }

    pub(crate) fn bytes_mut(&mut self) -> RefMut<'_, [u8]> {
        let range = self.byte_range(0, self.len);
        RefMut::map(self.buffer.bytes_mut(), |b| &mut b[range])
    }

    fn make_room(&mut self) -> Result<()> {
        if self.len >= self.capacity() {
            self.buffer.grow()?;
        }
        Ok(())
    }

    /// Append one item, growing the buffer first if the view is at capacity.
    pub fn append(&mut self, data: &[u8]) -> Result<()> {
        self.check_item(data)?;
        self.make_room()?;
        let index = self.len;
        self.len += 1;
        self.buffer.write_item_at(self.start + index, data)
    }

    /// Insert one item at `index`, shifting `[index, len)` up by one.
    /// `index == len` appends.
    pub fn insert_at(&mut self, index: usize, data: &[u8]) -> Result<()> {
        if index > self.len {
            return Err(CollectionError::IndexOutOfRange {
                index,
                len: self.len,
            });
        }
        self.check_item(data)?;
        self.make_room()?;
        if index < self.len {
            let src = self.byte_range(index, self.len);
            let dest = src.start + self.item_size();
            self.buffer.bytes_mut().copy_within(src, dest);
        }
        self.len += 1;
        self.buffer.write_item_at(self.start + index, data)
    }

    /// Remove item `index`, shifting `[index + 1, len)` down by one.
    pub fn remove_at(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        let src = self.byte_range(index + 1, self.len);
        let dest = src.start - self.item_size();
        self.buffer.bytes_mut().copy_within(src, dest);
        self.len -= 1;
        Ok(())
    }

    /// Move items `[index, index + len)` by `offset` positions. Both the
    /// source and the destination must lie within the view; the `|offset|`
    /// items overwritten at the destination are lost.
    pub fn move_items(&mut self, index: usize, len: usize, offset: isize) -> Result<()> {
        let end = index.checked_add(len);
        let dest = index.checked_add_signed(offset);
        let dest_end = dest.and_then(|d| d.checked_add(len));
        match (end, dest, dest_end) {
            (Some(end), Some(dest), Some(dest_end)) if end <= self.len && dest_end <= self.len => {
                let src = self.byte_range(index, end);
                let to = self.byte_range(dest, dest).start;
                self.buffer.bytes_mut().copy_within(src, to);
                Ok(())
            }
            _ => Err(CollectionError::InvalidRange {
                start: index,
                end: index.saturating_add(len),
                len: self.len,
            }),
        }
    }

    /// Exchange items `i` and `j`.
    pub fn swap(&mut self, i: usize, j: usize) -> Result<()> {
        self.check_index(i)?;
        self.check_index(j)?;
        if i == j {
            return Ok(());
        }
        let item = self.item_size();
        let (lo, hi) = (i.min(j), i.max(j));
        let (a, b) = (self.byte_range(lo, lo).start, self.byte_range(hi, hi).start);
        let mut bytes = self.buffer.bytes_mut();
        let (head, tail) = bytes.split_at_mut(b);
        head[a..a + item].swap_with_slice(&mut tail[..item]);
        Ok(())
    }

    /// Sort the items by comparing their raw bytes with `cmp`.
    ///
    /// The buffer is borrowed immutably while `cmp` runs.
    pub fn sort_by<F>(&mut self, mut cmp: F) -> Result<()>
    where
        F: FnMut(&[u8], &[u8]) -> Ordering,
    {
        let item = self.item_size();
        let mut order: Vec<usize> = alloc::with_capacity(self.len)?;
        order.extend(0..self.len);
        let mut sorted: Vec<u8> = alloc::with_capacity(self.len * item)?;
        {
            let bytes = self.bytes();
            let at = |i: usize| &bytes[i * item..(i + 1) * item];
            order.sort_by(|&a, &b| cmp(at(a), at(b)));
            for i in order {
                sorted.extend_from_slice(at(i));
            }
        }
        let range = self.byte_range(0, self.len);
        self.buffer.bytes_mut()[range].copy_from_slice(&sorted);
        Ok(())
    }

    /// Sort the items as values of `T`. No borrow is held while `cmp` runs.
    pub fn sort_as<T, F>(&mut self, cmp: F) -> Result<()>
    where
        T: Pod,
        F: FnMut(&T, &T) -> Ordering,
    {
        let mut items = self.to_vec::<T>()?;
        items.sort_by(cmp);
        let range = self.byte_range(0, self.len);
        self.buffer.bytes_mut()[range].copy_from_slice(bytemuck::cast_slice(&items));
        Ok(())
    }

    /// Clear every item in the view.
    pub fn zero(&mut self) {
        let range = self.byte_range(0, self.len);
        self.buffer.bytes_mut()[range].fill(0);
    }

    /// Call `f(index, bytes)` for each item in order until it breaks.
    pub fn visit<F>(&self, mut f: F) -> ControlFlow<()>
    where
        F: FnMut(usize, &[u8]) -> ControlFlow<()>,
    {
        let bytes = self.bytes();
        for (i, item) in bytes.chunks_exact(self.item_size()).enumerate() {
            f(i, item)?;
        }
        ControlFlow::Continue(())
    }

    /// Hand every item to `f`, clearing each slot afterwards so that views
    /// still sharing the buffer do not see it again, then release the view.
    /// Returns true if the buffer was freed.
    pub fn finalize<T, F>(mut self, mut f: F) -> Result<bool>
    where
        T: Pod,
        F: FnMut(T),
    {
        self.check_type::<T>()?;
        for i in 0..self.len {
            let value = self.get::<T>(i)?;
            f(value);
            self.set(i, T::zeroed())?;
        }
        Ok(self.release())
    }

    /// Drop this view's buffer reference. Returns true if it was the last.
    pub fn release(self) -> bool {
        self.buffer.release()
    }
}
