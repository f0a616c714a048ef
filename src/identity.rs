//! Identity hashing, the table's default when no hash function is given.
//!
//! A key that hashes as a single integer (pointer-like handles, indices,
//! ids) hashes to that integer unchanged. Anything else that reaches the
//! hasher is folded with FNV-1a 64.

use core::hash::{BuildHasher, Hasher};

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

#[inline]
fn fnv1a_append(mut hash: u64, bytes: &[u8]) -> u64 {
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityHasher {
    state: Option<u64>,
}

impl IdentityHasher {
    #[inline]
    fn word(&mut self, w: u64) {
        self.state = Some(match self.state {
            None => w,
            Some(h) => fnv1a_append(h, &w.to_ne_bytes()),
        });
    }
}

impl Hasher for IdentityHasher {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        let h = self.state.unwrap_or(FNV_OFFSET_BASIS);
        self.state = Some(fnv1a_append(h, bytes));
    }

    #[inline]
    fn write_u8(&mut self, i: u8) {
        self.word(u64::from(i));
    }

    #[inline]
    fn write_u16(&mut self, i: u16) {
        self.word(u64::from(i));
    }

    #[inline]
    fn write_u32(&mut self, i: u32) {
        self.word(u64::from(i));
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.word(i);
    }

    #[inline]
    fn write_usize(&mut self, i: usize) {
        self.word(i as u64);
    }

    #[inline]
    fn finish(&self) -> u64 {
        self.state.unwrap_or(FNV_OFFSET_BASIS)
    }
}

/// `BuildHasher` for `IdentityHasher`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityState;

impl BuildHasher for IdentityState {
    type Hasher = IdentityHasher;

    fn build_hasher(&self) -> IdentityHasher {
        IdentityHasher::default()
    }
}
