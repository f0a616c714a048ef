//! Error types shared by every collection.
//!
//! Two families are kept apart: running out of memory while growing, and
//! invalid usage (bad index, bad range, wrong item size). "Not found" is
//! never an error; lookups return `Option`/`bool`.

use thiserror::Error;

/// Failure of a buffer, view or heap operation.
///
/// An operation that returns one of these has left its receiver unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    /// A fallible allocation could not be satisfied.
    #[error("out of memory: could not allocate {requested} bytes")]
    OutOfMemory {
        /// Number of bytes requested
        requested: usize,
    },
    /// Index is beyond the current length
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange {
        /// Index that was accessed
        index: usize,
        /// Length the index was checked against
        len: usize,
    },
    /// A `[start, end)` range does not fit
    #[error("range {start}..{end} is invalid for length {len}")]
    InvalidRange {
        /// First position of the range
        start: usize,
        /// One past the last position of the range
        end: usize,
        /// Length the range was checked against
        len: usize,
    },
    /// A requested length does not fit in the available capacity
    #[error("length {requested} exceeds capacity {capacity}")]
    CapacityExceeded {
        /// Requested length
        requested: usize,
        /// Available capacity
        capacity: usize,
    },
    /// Item bytes or item type do not match the container's item size
    #[error("item size mismatch: expected {expected} bytes, found {found}")]
    ItemSizeMismatch {
        /// Item size of the container
        expected: usize,
        /// Size that was supplied
        found: usize,
    },
    /// Buffers cannot hold zero-sized items
    #[error("item size must be greater than zero")]
    ZeroItemSize,
}

/// Failure of `HashTable::insert`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertError {
    /// An equal key is already present; the table is unchanged.
    #[error("key already present")]
    DuplicateKey,
    /// The table needed to grow and could not; the table is unchanged.
    #[error("out of memory while growing the table")]
    OutOfMemory,
}

pub type Result<T, E = CollectionError> = core::result::Result<T, E>;
