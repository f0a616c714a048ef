//! Debug-only guard against nested entry into a `HashTable`.
//!
//! The table calls caller-supplied hash and equality functions while it
//! walks a chain. If such a function reaches back into the same table the
//! guard panics in debug builds. Release builds compile it away.

use core::cell::Cell;
use core::marker::PhantomData;

/// Per-table record of the operation currently running caller code. Guard a
/// section with `let _g = self.reentrancy.enter("lookup");`.
#[derive(Debug)]
pub(crate) struct DebugReentrancy {
    #[cfg(debug_assertions)]
    active: Cell<Option<&'static str>>,
    // Tables are single-threaded; keep the tracker !Send + !Sync too.
    _nosend: PhantomData<*mut ()>,
}

impl DebugReentrancy {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            active: Cell::new(None),
            _nosend: PhantomData,
        }
    }

    /// Mark the start of `op`, a table operation that runs caller code.
    #[inline]
    pub(crate) fn enter(&self, op: &'static str) -> ReentrancyGuard<'_> {
        #[cfg(debug_assertions)]
        {
            if let Some(outer) = self.active.get() {
                panic!(
                    "HashTable::{op} called from the hash or equality function \
                     of a running HashTable::{outer} on the same table"
                );
            }
            self.active.set(Some(op));
            return ReentrancyGuard { owner: self };
        }

        #[cfg(not(debug_assertions))]
        {
            let _ = op;
            return ReentrancyGuard { _owner: PhantomData };
        }
    }
}

/// Ends the guarded section when dropped.
pub(crate) struct ReentrancyGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a DebugReentrancy,
    #[cfg(not(debug_assertions))]
    _owner: PhantomData<&'a ()>,
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            debug_assert!(self.owner.active.get().is_some());
            self.owner.active.set(None);
        }
    }
}
