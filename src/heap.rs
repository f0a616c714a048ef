//! Binary heap stored in a `View`.
//!
//! Item `i` has children `2i + 1`, `2i + 2` and parent `(i - 1) / 2`. The
//! comparator decides rank: `cmp(a, b) == Greater` means `a` belongs closer
//! to the root than `b`. `Ord::cmp` therefore gives a max-heap and the
//! reversed comparison a min-heap.
//!
//! Items are copied out of the view before the comparator sees them, so a
//! comparator may freely read other views of the same buffer.

use crate::error::{CollectionError, Result};
use crate::view::View;
use bytemuck::Pod;
use core::cmp::Ordering;
use core::fmt;
use core::marker::PhantomData;
use core::ops::ControlFlow;

/// Which way `update_at` restores heap order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiftDirection {
    /// The item now outranks its old value.
    TowardRoot,
    /// The item now ranks below its old value.
    TowardLeaves,
}

pub struct Heap<T = usize, F = fn(&T, &T) -> Ordering> {
    view: View,
    cmp: F,
    _item: PhantomData<T>,
}

impl<T: Pod + Ord> Heap<T> {
    /// Empty heap with the largest item at the root.
    pub fn max_heap(capacity_hint: usize) -> Result<Self> {
        Self::new(capacity_hint, T::cmp)
    }

    /// Empty heap with the smallest item at the root.
    pub fn min_heap(capacity_hint: usize) -> Result<Self> {
        Self::new(capacity_hint, |a: &T, b: &T| b.cmp(a))
    }
}

impl<T, F> Heap<T, F>
where
    T: Pod,
    F: Fn(&T, &T) -> Ordering,
{
    /// Empty heap with room for `capacity_hint` items before growing.
    pub fn new(capacity_hint: usize, cmp: F) -> Result<Self> {
        let view = View::new(core::mem::size_of::<T>(), capacity_hint)?;
        Ok(Self {
            view,
            cmp,
            _item: PhantomData,
        })
    }

    /// Heapify the contents of `view` in place.
    pub fn from_view(view: View, cmp: F) -> Result<Self> {
        let found = core::mem::size_of::<T>();
        if view.item_size() != found {
            return Err(CollectionError::ItemSizeMismatch {
                expected: view.item_size(),
                found,
            });
        }
        let mut heap = Self {
            view,
            cmp,
            _item: PhantomData,
        };
        let n = heap.len();
        if n > 1 {
            for i in (0..=(n - 1) / 2).rev() {
                heap.sift_down(i);
            }
        }
        Ok(heap)
    }

    /// Heap over a copy of `items`.
    pub fn from_data(items: &[T], cmp: F) -> Result<Self> {
        Self::from_view(View::from_items(items)?, cmp)
    }

    pub fn len(&self) -> usize {
        self.view.len()
    }

    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }

    /// The underlying view, in array order.
    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn into_view(self) -> View {
        self.view
    }

    // Indices passed here are always below len.
    fn at(&self, i: usize) -> T {
        let size = core::mem::size_of::<T>();
        bytemuck::pod_read_unaligned(&self.view.bytes()[i * size..(i + 1) * size])
    }

    fn put(&mut self, i: usize, item: T) {
        let size = core::mem::size_of::<T>();
        self.view.bytes_mut()[i * size..(i + 1) * size].copy_from_slice(bytemuck::bytes_of(&item));
    }

    fn swap(&mut self, i: usize, j: usize) {
        let (a, b) = (self.at(i), self.at(j));
        self.put(i, b);
        self.put(j, a);
    }

    fn rank(&self, a: usize, b: usize) -> Ordering {
        (self.cmp)(&self.at(a), &self.at(b))
    }

    // A right child (even index) is weighed against its left sibling; the
    // higher ranked of the two is swapped with the parent when it outranks it.
    fn sift_up(&mut self, mut from: usize) {
        if from >= self.len() {
            return;
        }
        while from > 0 {
            let (parent, child) = if from % 2 == 0 {
                let child = if self.rank(from, from - 1) == Ordering::Greater {
                    from
                } else {
                    from - 1
                };
                (from / 2 - 1, child)
            } else {
                ((from - 1) / 2, from)
            };
            if self.rank(parent, child) != Ordering::Less {
                return;
            }
            self.swap(parent, child);
            from = parent;
        }
    }

    fn sift_down(&mut self, mut from: usize) {
        let n = self.len();
        if from >= n / 2 {
            return;
        }
        loop {
            let left = 2 * from + 1;
            if left >= n {
                return;
            }
            let right = left + 1;
            let child = if right < n && self.rank(left, right) == Ordering::Less {
                right
            } else {
                left
            };
            if self.rank(from, child) != Ordering::Less {
                return;
            }
            self.swap(from, child);
            from = child;
        }
    }

    /// Highest ranked item.
    pub fn peek(&self) -> Option<T> {
        if self.is_empty() {
            None
        } else {
            Some(self.at(0))
        }
    }

    pub fn insert(&mut self, item: T) -> Result<()> {
        self.view.push(item)?;
        self.sift_up(self.len() - 1);
        Ok(())
    }

    /// Remove and return the highest ranked item.
    pub fn extract(&mut self) -> Option<T> {
        let n = self.len();
        let root = self.peek()?;
        if n > 1 {
            let last = self.at(n - 1);
            self.put(0, last);
        }
        self.view.truncate(n - 1);
        self.sift_down(0);
        Some(root)
    }

    /// Same items out as `insert(item)` followed by `extract()`, with at most
    /// one sift. An item outranking the root comes straight back.
    pub fn insert_then_extract(&mut self, item: T) -> T {
        let Some(root) = self.peek() else {
            return item;
        };
        if (self.cmp)(&item, &root) == Ordering::Greater {
            return item;
        }
        self.put(0, item);
        self.sift_down(0);
        root
    }

    /// Replace the root with `item` and return the old root. On an empty
    /// heap `item` is inserted and `None` returned.
    pub fn extract_then_insert(&mut self, item: T) -> Result<Option<T>> {
        let Some(root) = self.peek() else {
            self.insert(item)?;
            return Ok(None);
        };
        self.put(0, item);
        self.sift_down(0);
        Ok(Some(root))
    }

    /// Overwrite item `index`, sifting toward the root if `item` outranks
    /// the value it replaces and toward the leaves otherwise.
    pub fn replace_at(&mut self, index: usize, item: T) -> Result<()> {
        self.check_index(index)?;
        let direction = if (self.cmp)(&self.at(index), &item) == Ordering::Less {
            SiftDirection::TowardRoot
        } else {
            SiftDirection::TowardLeaves
        };
        self.update_at(index, item, direction)
    }

    /// Overwrite item `index` and sift in the given direction.
    pub fn update_at(&mut self, index: usize, item: T, direction: SiftDirection) -> Result<()> {
        self.check_index(index)?;
        self.put(index, item);
        match direction {
            SiftDirection::TowardRoot => self.sift_up(index),
            SiftDirection::TowardLeaves => self.sift_down(index),
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.len() {
            return Err(CollectionError::IndexOutOfRange {
                index,
                len: self.len(),
            });
        }
        Ok(())
    }

    /// Call `f(index, item)` in array order until it breaks.
    pub fn visit<G>(&self, mut f: G) -> ControlFlow<()>
    where
        G: FnMut(usize, T) -> ControlFlow<()>,
    {
        for i in 0..self.len() {
            f(i, self.at(i))?;
        }
        ControlFlow::Continue(())
    }

    /// Whether every parent ranks at least as high as its children.
    pub fn check(&self) -> bool {
        self.len() < 2 || self.check_children(0)
    }

    fn check_children(&self, parent: usize) -> bool {
        let n = self.len();
        let left = 2 * parent + 1;
        if left >= n {
            return true;
        }
        if self.rank(parent, left) == Ordering::Less {
            return false;
        }
        let right = left + 1;
        if right < n
            && (self.rank(parent, right) == Ordering::Less || !self.check_children(right))
        {
            return false;
        }
        self.check_children(left)
    }

    /// Hand every item to `f` in array order and release the storage.
    /// Returns true if the buffer was freed.
    pub fn finalize<G>(self, f: G) -> Result<bool>
    where
        G: FnMut(T),
    {
        self.view.finalize(f)
    }
}

impl<T, F> fmt::Debug for Heap<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heap")
            .field("len", &self.view.len())
            .field("capacity", &self.view.capacity())
            .finish_non_exhaustive()
    }
}
