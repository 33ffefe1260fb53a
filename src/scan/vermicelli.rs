//! Vermicelli: literal byte and byte-pair scans.
//!
//! Case-insensitive descriptors compare `byte & 0xDF` against the upper-case
//! target, so one compare covers both cases. Folding is only applied to
//! ASCII letters; any other byte is compared exactly.

use super::{first, first_not, first_pair, last, last_not, last_pair, MaskedEq, MaskedEqPair};
use super::{PairScan, SingleScan};
use crate::simd::{SimdTier, SimdVector};

/// AND mask that clears the ASCII case bit.
pub const CASE_CLEAR: u8 = 0xDF;

/// Target and compare mask for one byte.
#[inline]
pub(crate) fn fold(byte: u8, nocase: bool) -> (u8, u8) {
    if nocase && byte.is_ascii_alphabetic() {
        (byte & CASE_CLEAR, CASE_CLEAR)
    } else {
        (byte, 0xFF)
    }
}

/// Single-byte literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vermicelli {
    target: u8,
    mask: u8,
}

impl Vermicelli {
    /// Match `byte`, in either case when `nocase` is set.
    pub fn new(byte: u8, nocase: bool) -> Self {
        let (target, mask) = fold(byte, nocase);
        Self { target, mask }
    }

    /// Whether `byte` matches.
    #[inline]
    pub fn matches(&self, byte: u8) -> bool {
        byte & self.mask == self.target
    }

    /// First matching offset, or `haystack.len()`.
    pub fn find(&self, tier: SimdTier, haystack: &[u8]) -> usize {
        first(tier, self, haystack).unwrap_or(haystack.len())
    }

    /// Last matching offset.
    pub fn rfind(&self, tier: SimdTier, haystack: &[u8]) -> Option<usize> {
        last(tier, self, haystack)
    }

    /// First non-matching offset, or `haystack.len()`.
    pub fn find_not(&self, tier: SimdTier, haystack: &[u8]) -> usize {
        first_not(tier, self, haystack).unwrap_or(haystack.len())
    }

    /// Last non-matching offset.
    pub fn rfind_not(&self, tier: SimdTier, haystack: &[u8]) -> Option<usize> {
        last_not(tier, self, haystack)
    }
}

impl SingleScan for Vermicelli {
    type Matcher<V: SimdVector> = MaskedEq<V>;

    #[inline(always)]
    unsafe fn matcher<V: SimdVector>(&self) -> MaskedEq<V> {
        unsafe { MaskedEq::new(self.target, self.mask) }
    }
}

/// Ordered byte pair under per-byte AND masks.
///
/// A pair `(a, b)` matches when `a & m1 == c1` and `b & m2 == c2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskedDoubleVermicelli {
    c1: u8,
    m1: u8,
    c2: u8,
    m2: u8,
}

impl MaskedDoubleVermicelli {
    /// Pair with explicit compare values and masks. The compare values are
    /// reduced by their masks.
    pub fn new(c1: u8, m1: u8, c2: u8, m2: u8) -> Self {
        Self {
            c1: c1 & m1,
            m1,
            c2: c2 & m2,
            m2,
        }
    }

    /// Whether the first byte of a pair matches.
    #[inline]
    pub fn matches_first(&self, byte: u8) -> bool {
        byte & self.m1 == self.c1
    }

    /// Whether the second byte of a pair matches.
    #[inline]
    pub fn matches_second(&self, byte: u8) -> bool {
        byte & self.m2 == self.c2
    }

    /// Offset of the first byte of the first matching pair.
    ///
    /// Without a full pair, a matching first byte in the last position is
    /// reported as a partial match at `haystack.len() - 1`. Returns
    /// `haystack.len()` otherwise.
    pub fn find(&self, tier: SimdTier, haystack: &[u8]) -> usize {
        if let Some(i) = first_pair(tier, self, haystack) {
            return i;
        }
        match haystack.last() {
            Some(&b) if self.matches_first(b) => haystack.len() - 1,
            _ => haystack.len(),
        }
    }

    /// Offset of the second byte of the last matching pair.
    pub fn rfind(&self, tier: SimdTier, haystack: &[u8]) -> Option<usize> {
        last_pair(tier, self, haystack).map(|q| q + 1)
    }
}

impl PairScan for MaskedDoubleVermicelli {
    type Matcher<V: SimdVector> = MaskedEqPair<V>;

    #[inline(always)]
    unsafe fn matcher<V: SimdVector>(&self) -> MaskedEqPair<V> {
        unsafe { MaskedEqPair::new(self.c1, self.m1, self.c2, self.m2) }
    }
}

/// Ordered byte pair, optionally case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoubleVermicelli(MaskedDoubleVermicelli);

impl DoubleVermicelli {
    /// Match `c1` immediately followed by `c2`.
    pub fn new(c1: u8, c2: u8, nocase: bool) -> Self {
        let (c1, m1) = fold(c1, nocase);
        let (c2, m2) = fold(c2, nocase);
        Self(MaskedDoubleVermicelli::new(c1, m1, c2, m2))
    }

    /// Offset of `c1` in the first matching pair, with the partial match
    /// rule of [`MaskedDoubleVermicelli::find`].
    pub fn find(&self, tier: SimdTier, haystack: &[u8]) -> usize {
        self.0.find(tier, haystack)
    }

    /// Offset of `c2` in the last matching pair.
    pub fn rfind(&self, tier: SimdTier, haystack: &[u8]) -> Option<usize> {
        self.0.rfind(tier, haystack)
    }
}

impl PairScan for DoubleVermicelli {
    type Matcher<V: SimdVector> = MaskedEqPair<V>;

    #[inline(always)]
    unsafe fn matcher<V: SimdVector>(&self) -> MaskedEqPair<V> {
        unsafe { self.0.matcher::<V>() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIER: SimdTier = SimdTier::Portable16;

    #[test]
    fn test_fold_only_letters() {
        assert_eq!(fold(b'a', true), (b'A', CASE_CLEAR));
        assert_eq!(fold(b'Z', true), (b'Z', CASE_CLEAR));
        assert_eq!(fold(b'[', true), (b'[', 0xFF));
        assert_eq!(fold(b'{', true), (b'{', 0xFF));
        assert_eq!(fold(b'a', false), (b'a', 0xFF));

        let v = Vermicelli::new(b'@', true);
        assert!(!v.matches(b'`'));
        assert!(v.matches(b'@'));
    }

    #[test]
    fn test_single_scans() {
        let hay = b"xxxxAxxxxxxxxxxxxxxxxxaxxxx";
        let v = Vermicelli::new(b'a', true);
        assert_eq!(v.find(TIER, hay), 4);
        assert_eq!(v.rfind(TIER, hay), Some(22));
        let exact = Vermicelli::new(b'a', false);
        assert_eq!(exact.find(TIER, hay), 22);
        assert_eq!(exact.find(TIER, b"bbb"), 3);
        assert_eq!(exact.rfind(TIER, b"bbb"), None);
        assert_eq!(exact.find(TIER, b""), 0);
    }

    #[test]
    fn test_negated_scans() {
        let x = Vermicelli::new(b'x', true);
        assert_eq!(x.find_not(TIER, b"xXxXq"), 4);
        assert_eq!(x.rfind_not(TIER, b"qxXxX"), Some(0));
        assert_eq!(x.find_not(TIER, b"xxxx"), 4);
        assert_eq!(x.rfind_not(TIER, b"XXXX"), None);
    }

    #[test]
    fn test_double_partial_match_at_end() {
        let d = DoubleVermicelli::new(b'a', b'b', false);
        assert_eq!(d.find(TIER, b"xxab"), 2);
        assert_eq!(d.find(TIER, b"xxxa"), 3);
        assert_eq!(d.find(TIER, b"xxxx"), 4);
        assert_eq!(d.find(TIER, b"a"), 0);
        assert_eq!(d.find(TIER, b""), 0);
    }

    #[test]
    fn test_double_reverse_returns_second_byte() {
        let hay = b"bbbbbbbbbbbbbbbbbbabbbbbbbbbbbbbbbbbbbbbbbbbbbbbbabbbbbbbbbbbbbbbbbbbbb";
        assert_eq!(DoubleVermicelli::new(b'a', b'b', false).rfind(TIER, hay), Some(50));
        assert_eq!(DoubleVermicelli::new(b'B', b'A', true).rfind(TIER, hay), Some(49));
        assert_eq!(DoubleVermicelli::new(b'a', b'a', false).rfind(TIER, hay), None);
        // no partial rule in reverse
        assert_eq!(DoubleVermicelli::new(b'x', b'a', false).rfind(TIER, b"abbb"), None);
    }

    #[test]
    fn test_masked_pair() {
        // second byte any of 0x30..=0x3F
        let m = MaskedDoubleVermicelli::new(b'#', 0xFF, 0x30, 0xF0);
        assert_eq!(m.find(TIER, b"##a#7#"), 3);
        assert_eq!(m.find(TIER, b"##a#x#"), 5);
        assert_eq!(m.find(TIER, b"##a#x."), 6);
        assert_eq!(m.rfind(TIER, b"#1..#9.."), Some(5));
    }
}
