//! Verm16: membership in up to 16 explicit bytes.
//!
//! Every candidate gets a private bucket in a pair of nibble tables (as in
//! Shufti), candidates 0..8 in the first pair and 8..16 in the second, so
//! the lookup is exact for any 16 bytes.

use super::charclass::ByteSet;
use super::{ByteMatcher, SingleScan};
use crate::error::{Result, ScanError};
use crate::simd::{SimdTier, SimdVector};

/// Largest number of candidate bytes.
pub const VERM16_CANDIDATES: usize = 16;

/// Candidate tables for up to 16 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verm16 {
    lo: [[u8; 16]; 2],
    hi: [[u8; 16]; 2],
    len: usize,
}

impl Verm16 {
    /// Build from `bytes`; with `nocase` both cases of each letter count as
    /// candidates. Duplicates are ignored.
    pub fn new(bytes: &[u8], nocase: bool) -> Result<Self> {
        let set = ByteSet::from_bytes(bytes);
        Self::from_class(&if nocase { set.case_folded() } else { set })
    }

    /// Build from a set of at most 16 bytes.
    pub fn from_class(class: &ByteSet) -> Result<Self> {
        if class.len() > VERM16_CANDIDATES {
            return Err(ScanError::class_too_complex(class.len(), VERM16_CANDIDATES));
        }
        let mut v = Self {
            lo: [[0; 16]; 2],
            hi: [[0; 16]; 2],
            len: class.len(),
        };
        for (i, c) in class.iter().enumerate() {
            let (table, bit) = (i / 8, i % 8);
            v.lo[table][(c & 0xF) as usize] |= 1 << bit;
            v.hi[table][(c >> 4) as usize] |= 1 << bit;
        }
        log::trace!("verm16 built with {} candidates", v.len);
        Ok(v)
    }

    /// Number of distinct candidates.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when there are no candidates.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Membership test for one byte.
    #[inline]
    pub fn contains(&self, byte: u8) -> bool {
        let (l, h) = ((byte & 0xF) as usize, (byte >> 4) as usize);
        (self.lo[0][l] & self.hi[0][h]) | (self.lo[1][l] & self.hi[1][h]) != 0
    }

    /// First offset holding a candidate, or `haystack.len()`.
    pub fn find(&self, tier: SimdTier, haystack: &[u8]) -> usize {
        super::first(tier, self, haystack).unwrap_or(haystack.len())
    }

    /// Last offset holding a candidate.
    pub fn rfind(&self, tier: SimdTier, haystack: &[u8]) -> Option<usize> {
        super::last(tier, self, haystack)
    }

    /// First offset not holding a candidate, or `haystack.len()`.
    pub fn find_not(&self, tier: SimdTier, haystack: &[u8]) -> usize {
        super::first_not(tier, self, haystack).unwrap_or(haystack.len())
    }

    /// Last offset not holding a candidate.
    pub fn rfind_not(&self, tier: SimdTier, haystack: &[u8]) -> Option<usize> {
        super::last_not(tier, self, haystack)
    }
}

/// [`Verm16`] broadcast into registers.
#[derive(Debug, Clone, Copy)]
pub struct Verm16Matcher<V> {
    lo_a: V,
    hi_a: V,
    lo_b: V,
    hi_b: V,
    low_nibble: V,
}

impl<V: SimdVector> ByteMatcher<V> for Verm16Matcher<V> {
    #[inline(always)]
    unsafe fn hits(&self, v: V) -> V {
        unsafe {
            let l = v.and(self.low_nibble);
            let h = v.shr_u16::<4>().and(self.low_nibble);
            let a = self.lo_a.byte_shuffle(l).and(self.hi_a.byte_shuffle(h));
            let b = self.lo_b.byte_shuffle(l).and(self.hi_b.byte_shuffle(h));
            a.or(b).cmpeq(V::zeroes()).not()
        }
    }
}

impl SingleScan for Verm16 {
    type Matcher<V: SimdVector> = Verm16Matcher<V>;

    #[inline(always)]
    unsafe fn matcher<V: SimdVector>(&self) -> Verm16Matcher<V> {
        unsafe {
            Verm16Matcher {
                lo_a: V::broadcast_table(&self.lo[0]),
                hi_a: V::broadcast_table(&self.hi[0]),
                lo_b: V::broadcast_table(&self.lo[1]),
                hi_b: V::broadcast_table(&self.hi[1]),
                low_nibble: V::splat(0x0F),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIER: SimdTier = SimdTier::Portable16;

    #[test]
    fn test_exact_for_sixteen_bytes() {
        let bytes: Vec<u8> = (0..16u8).map(|i| (i << 4) | (15 - i)).collect();
        let v = Verm16::new(&bytes, false).unwrap();
        assert_eq!(v.len(), 16);
        for b in 0..=255u8 {
            assert_eq!(v.contains(b), bytes.contains(&b), "byte {:#04x}", b);
        }
    }

    #[test]
    fn test_too_many_candidates() {
        let bytes: Vec<u8> = (0..17u8).collect();
        assert!(matches!(
            Verm16::new(&bytes, false),
            Err(ScanError::ClassTooComplex { required: 17, available: 16 })
        ));
        // nocase doubles the letters
        let letters = b"abcdefghi";
        assert!(Verm16::new(letters, false).is_ok());
        assert!(Verm16::new(letters, true).is_err());
    }

    #[test]
    fn test_scans() {
        let v = Verm16::new(b"aB", true).unwrap();
        assert_eq!(v.len(), 4);
        let hay = vec![b'b'; 130];
        assert_eq!(v.find(TIER, &hay), 0);
        let none = b"cccccccccccccccccccccccccccccccccccccccccc";
        assert_eq!(v.find(TIER, none), none.len());
        assert_eq!(v.rfind(TIER, none), None);
        assert_eq!(v.find_not(TIER, b"aAbBaBx"), 6);
        assert_eq!(v.rfind_not(TIER, b"xaAbB"), Some(0));
        assert_eq!(v.rfind_not(TIER, b"aAbB"), None);
    }

    #[test]
    fn test_empty_never_matches() {
        let v = Verm16::new(&[], false).unwrap();
        assert!(v.is_empty());
        assert_eq!(v.find(TIER, b"anything"), 8);
    }
}
