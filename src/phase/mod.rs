//! Moon phase derivation.
//!
//! - [`encoder`]: pure fraction-of-month → six-slice illumination mask
//! - [`provider`]: phase table lookup, new-moon extraction and failure taxonomy
//! - [`usno`]: HTTP transport for the USNO phase table
//!
//! The six slices are read left to right as seen from the northern hemisphere,
//! so the most significant of the six bits is the leftmost slice.

pub mod encoder;
pub mod provider;
pub mod usno;

use std::fmt;

pub use encoder::encode;
pub use provider::{FetchError, PhaseEntry, PhaseProvider, PhaseReading, PhaseSource, PhaseTable};

/// Six-bit illumination mask, one bit per visible slice of the moon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BitPattern(u8);

impl BitPattern {
    pub const MASK: u8 = 0b11_1111;
    /// Every slice dark
    pub const OFF: BitPattern = BitPattern(0);
    /// Every slice lit
    pub const FULL: BitPattern = BitPattern(Self::MASK);

    /// Build a pattern, discarding anything above the sixth bit.
    pub const fn new(bits: u8) -> Self {
        BitPattern(bits & Self::MASK)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether slice `index` (0 = leftmost) is lit.
    pub fn is_lit(self, index: usize) -> bool {
        index < 6 && self.0 & (1 << (5 - index)) != 0
    }

    /// Whether the encoder can ever produce this pattern.
    ///
    /// Only the twelve contiguous light/dark splits are reachable; anything
    /// else is usable as an error sentinel.
    pub fn is_encodable(self) -> bool {
        encoder::encodable_patterns().contains(&self)
    }
}

impl fmt::Display for BitPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06b}", self.0)
    }
}
