//! Hash table size classes.
//!
//! Each class is a power-of-two boundary paired with the largest prime not
//! above it. The prime is both the bucket count and the hash modulus.

/// Smallest class is 2^MIN_POWER buckets.
pub const MIN_POWER: u32 = 3;
/// Boundary of the smallest class.
pub const MIN_SIZE: usize = 1 << MIN_POWER;

// Largest prime <= 2^k for k = 3..=32.
static GREATEST_PRIME: [u64; 30] = [
    7,          // 8
    13,         // 16
    31,         // 32
    61,         // 64
    127,        // 128
    251,        // 256
    509,        // 512
    1021,       // 1024
    2039,       // 2048
    4093,       // 4096
    8191,       // 8192
    16381,      // 16384
    32749,      // 32768
    65521,      // 65536
    131071,     // 131072
    262139,     // 262144
    524287,     // 524288
    1048573,    // 1048576
    2097143,    // 2097152
    4194301,    // 4194304
    8388593,    // 8388608
    16777213,   // 16777216
    33554393,   // 33554432
    67108859,   // 67108864
    134217689,  // 134217728
    268435399,  // 268435456
    536870909,  // 536870912
    1073741789, // 1073741824
    2147483647, // 2147483648
    4294967291, // 4294967296
];

/// One step of the table growth sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SizeClass {
    index: u8,
}

impl SizeClass {
    /// The smallest class, `(8, 7)`.
    pub const fn first() -> Self {
        SizeClass { index: 0 }
    }

    /// Smallest class whose boundary is `>= request` (requests below
    /// `MIN_SIZE` get the first class). `None` past the largest class.
    pub fn for_request(request: u64) -> Option<Self> {
        let request = request.max(MIN_SIZE as u64);
        let boundary = request.checked_next_power_of_two()?;
        let index = (boundary.trailing_zeros() - MIN_POWER) as usize;
        if index < GREATEST_PRIME.len() {
            Some(SizeClass { index: index as u8 })
        } else {
            None
        }
    }

    /// The class for double this boundary.
    pub fn next(self) -> Option<Self> {
        Self::for_request(self.boundary().checked_mul(2)?)
    }

    /// Power-of-two boundary of this class.
    pub fn boundary(self) -> u64 {
        1u64 << (MIN_POWER + self.index as u32)
    }

    /// Largest prime `<= boundary`.
    pub fn prime(self) -> u64 {
        GREATEST_PRIME[self.index as usize]
    }

    /// Bucket count for this class.
    pub fn buckets(self) -> usize {
        self.prime() as usize
    }
}
