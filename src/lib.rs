//! rc-collections: reference-counted growable buffers, aliasing views over
//! them, a chained hash table and a binary heap.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a small set of single-threaded containers that share storage
//!   instead of copying it, and that never leave a half-done mutation
//!   behind when memory runs out.
//! - Layers:
//!   - Buffer: fixed-item-size byte storage behind `Rc<RefCell<_>>`.
//!     Growth happens in place when the handle is the only owner and by
//!     copying into fresh storage when it is shared, so other owners keep
//!     the old contents.
//!   - View: `[start, start + len)` over a Buffer. Sub-views and
//!     duplicates share the buffer and alias each other. Typed access for
//!     plain-old-data items goes through `bytemuck`.
//!   - HashTable<K, V, S>: separate chaining over prime-sized bucket
//!     arrays, entries held in a `SlotMap` arena with their hash. Keys can
//!     be listed into a View.
//!   - Heap<T, F>: binary heap over a View with a caller comparator.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` (no atomics, no locks).
//! - Every growth path allocates fallibly; a failed operation returns an
//!   error and leaves its receiver unchanged.
//! - Table growth is checked before each insert only. Lookups and deletes
//!   never resize, and the table never shrinks.
//! - Each entry stores its hash; a resize only rewrites chain links and
//!   never calls the caller's hash or equality code.
//!
//! Reentrancy policy
//! - HashTable guards the sections that run caller hash and equality code
//!   with a debug-only reentrancy guard. Visitors passed to `visit` run
//!   without the guard and may read the table.
//! - Views hand out `Ref`/`RefMut` borrows of the shared buffer. Holding
//!   one across a mutation through an aliasing view panics in `RefCell`.
//!
//! Logging
//! - `tracing` events: `trace` for in-place buffer growth, `debug` for
//!   buffer forks and table resizes, `warn` for growth that ran out of
//!   memory. No subscriber is installed here.
//!
//! Notes and non-goals
//! - No shrink-on-delete.
//! - No concurrent access. Sharing a Buffer across threads would need
//!   atomic counts the design deliberately does not pay for.
//! - Buffer contents start zeroed rather than uninitialized.

mod alloc;
pub mod buffer;
pub mod config;
pub mod error;
pub mod hash_table;
#[cfg(test)]
mod hash_table_proptest;
pub mod heap;
#[cfg(test)]
mod heap_proptest;
pub mod identity;
mod reentrancy;
pub mod size_class;
pub mod view;

// Public surface
pub use buffer::Buffer;
pub use config::TableConfig;
pub use error::{CollectionError, InsertError};
pub use hash_table::{HashTable, TableBuilder, TableStats};
pub use heap::{Heap, SiftDirection};
pub use identity::{IdentityHasher, IdentityState};
pub use size_class::SizeClass;
pub use view::View;
