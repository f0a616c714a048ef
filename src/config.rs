//! Construction-time configuration.

/// Collision threshold below which requests are clamped.
pub const MIN_COLLISIONS: usize = 4;

/// Sizing knobs for `HashTable`.
///
/// `initial_size == 0` defers bucket allocation to the first insert. The
/// collision threshold is clamped up to `MIN_COLLISIONS` when the table is
/// built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TableConfig {
    pub initial_size: usize,
    pub collision_threshold: usize,
}

impl TableConfig {
    pub const fn new() -> Self {
        Self {
            initial_size: 0,
            collision_threshold: MIN_COLLISIONS,
        }
    }

    pub const fn initial_size(mut self, initial_size: usize) -> Self {
        self.initial_size = initial_size;
        self
    }

    pub const fn collision_threshold(mut self, collision_threshold: usize) -> Self {
        self.collision_threshold = collision_threshold;
        self
    }

    /// Threshold actually enforced by the table.
    pub fn effective_threshold(&self) -> usize {
        self.collision_threshold.max(MIN_COLLISIONS)
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self::new()
    }
}
