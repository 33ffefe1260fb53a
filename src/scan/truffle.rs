//! Truffle: character classes of any shape.
//!
//! The class is split on the high bit of the byte. Each half is a 16x8 bit
//! matrix indexed by the low nibble (table row) and bits 4..7 of the byte
//! (bit within the row). A byte with the high bit set produces an index
//! with bit 7 set for the "high clear" table, which `byte_shuffle` turns into
//! zero, and vice versa after flipping bit 7 for the "high set" table.

use super::charclass::ByteSet;
use super::{ByteMatcher, PairMatcher, PairScan, SingleScan};
use crate::simd::{SimdTier, SimdVector};

/// Lane `i` of every 16-byte lane holds `1 << (i & 7)`.
const BIT_SELECT: [u8; 16] = [1, 2, 4, 8, 16, 32, 64, 128, 1, 2, 4, 8, 16, 32, 64, 128];

/// Truffle tables for one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TruffleMask {
    highclear: [u8; 16],
    highset: [u8; 16],
}

impl TruffleMask {
    /// Encode `class`. Every class is encodable.
    pub fn from_class(class: &ByteSet) -> Self {
        let mut mask = Self {
            highclear: [0; 16],
            highset: [0; 16],
        };
        for c in class.iter() {
            let row = (c & 0xF) as usize;
            if c < 0x80 {
                mask.highclear[row] |= 1 << (c >> 4);
            } else {
                mask.highset[row] |= 1 << ((c >> 4) & 7);
            }
        }
        log::trace!("Truffle tables built for class of {} bytes", class.len());
        mask
    }

    /// Use tables built elsewhere.
    pub fn from_tables(highclear: [u8; 16], highset: [u8; 16]) -> Self {
        Self { highclear, highset }
    }

    /// Table for bytes below 0x80.
    pub fn highclear(&self) -> &[u8; 16] {
        &self.highclear
    }

    /// Table for bytes from 0x80.
    pub fn highset(&self) -> &[u8; 16] {
        &self.highset
    }

    /// Membership test for one byte.
    #[inline]
    pub fn contains(&self, byte: u8) -> bool {
        let row = (byte & 0xF) as usize;
        let bit = 1u8 << ((byte >> 4) & 7);
        let table = if byte < 0x80 { &self.highclear } else { &self.highset };
        table[row] & bit != 0
    }

    /// First offset whose byte is in the class, or `haystack.len()`.
    pub fn find(&self, tier: SimdTier, haystack: &[u8]) -> usize {
        super::first(tier, self, haystack).unwrap_or(haystack.len())
    }

    /// Last offset whose byte is in the class.
    pub fn rfind(&self, tier: SimdTier, haystack: &[u8]) -> Option<usize> {
        super::last(tier, self, haystack)
    }
}

/// [`TruffleMask`] broadcast into registers.
#[derive(Debug, Clone, Copy)]
pub struct TruffleMatcher<V> {
    highclear: V,
    highset: V,
    bit_select: V,
    keep_high_and_low: V,
    high_bit: V,
    low_nibble: V,
}

impl<V: SimdVector> ByteMatcher<V> for TruffleMatcher<V> {
    #[inline(always)]
    unsafe fn hits(&self, v: V) -> V {
        unsafe {
            let shuf1 = self.highclear.byte_shuffle(v.and(self.keep_high_and_low));
            let flipped = v.xor(self.high_bit);
            let shuf2 = self.highset.byte_shuffle(flipped.and(self.keep_high_and_low));
            let column = v.shr_u16::<4>().and(self.low_nibble);
            let shuf3 = self.bit_select.byte_shuffle(column);
            shuf1.or(shuf2).and(shuf3).cmpeq(V::zeroes()).not()
        }
    }
}

impl SingleScan for TruffleMask {
    type Matcher<V: SimdVector> = TruffleMatcher<V>;

    #[inline(always)]
    unsafe fn matcher<V: SimdVector>(&self) -> TruffleMatcher<V> {
        unsafe {
            TruffleMatcher {
                highclear: V::broadcast_table(&self.highclear),
                highset: V::broadcast_table(&self.highset),
                bit_select: V::broadcast_table(&BIT_SELECT),
                keep_high_and_low: V::splat(0x8F),
                high_bit: V::splat(0x80),
                low_nibble: V::splat(0x0F),
            }
        }
    }
}

/// Two Truffle classes for adjacent bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoubleTruffleMask {
    first: TruffleMask,
    second: TruffleMask,
}

impl DoubleTruffleMask {
    /// Pair of already built tables.
    pub fn new(first: TruffleMask, second: TruffleMask) -> Self {
        Self { first, second }
    }

    /// Every pair `(a, b)` with `a` in `first` and `b` in `second`.
    pub fn from_classes(first: &ByteSet, second: &ByteSet) -> Self {
        Self::new(TruffleMask::from_class(first), TruffleMask::from_class(second))
    }

    /// Whether the pair `(a, b)` matches.
    #[inline]
    pub fn contains_pair(&self, a: u8, b: u8) -> bool {
        self.first.contains(a) && self.second.contains(b)
    }

    /// Offset of the first byte of the first matching pair, or
    /// `haystack.len()`.
    pub fn find(&self, tier: SimdTier, haystack: &[u8]) -> usize {
        super::first_pair(tier, self, haystack).unwrap_or(haystack.len())
    }

    /// Offset of the first byte of the last matching pair.
    pub fn rfind(&self, tier: SimdTier, haystack: &[u8]) -> Option<usize> {
        super::last_pair(tier, self, haystack)
    }
}

/// [`DoubleTruffleMask`] broadcast into registers.
#[derive(Debug, Clone, Copy)]
pub struct DoubleTruffleMatcher<V> {
    first: TruffleMatcher<V>,
    second: TruffleMatcher<V>,
}

impl<V: SimdVector> PairMatcher<V> for DoubleTruffleMatcher<V> {
    #[inline(always)]
    unsafe fn first(&self, v: V) -> V {
        unsafe { self.first.hits(v) }
    }

    #[inline(always)]
    unsafe fn second(&self, v: V) -> V {
        unsafe { self.second.hits(v) }
    }

    #[inline(always)]
    unsafe fn combine(&self, first: V, second: V) -> V {
        unsafe { first.and(second) }
    }
}

impl PairScan for DoubleTruffleMask {
    type Matcher<V: SimdVector> = DoubleTruffleMatcher<V>;

    #[inline(always)]
    unsafe fn matcher<V: SimdVector>(&self) -> DoubleTruffleMatcher<V> {
        unsafe {
            DoubleTruffleMatcher {
                first: self.first.matcher::<V>(),
                second: self.second.matcher::<V>(),
            }
        }
    }
}
