//! Shufti: character classes as nibble-bucket lookup tables.
//!
//! A byte `c` belongs to the class when `lo[c & 0xF] & hi[c >> 4] != 0`.
//! Each of the 8 bits of a table entry is a bucket; a bucket describes a
//! product `H x L` of a set of high nibbles and a set of low nibbles, so a
//! class is encodable when it splits into at most 8 such products.
//!
//! Both tables are applied with one `byte_shuffle` each, which classifies
//! a full register in four instructions.

use super::charclass::ByteSet;
use super::{ByteMatcher, PairMatcher, PairScan, SingleScan};
use crate::error::{Result, ScanError};
use crate::simd::{SimdTier, SimdVector};

/// Buckets available in one table byte.
pub const SHUFTI_BUCKETS: usize = 8;

/// A nibble product: bit `h` of `.0` and bit `l` of `.1` select the bytes
/// `(h << 4) | l`.
type NibbleProduct = (u16, u16);

/// Split `class` into nibble products, grouping whichever nibble side gives
/// fewer products.
fn nibble_products(class: &ByteSet) -> Vec<NibbleProduct> {
    let mut lo_sets = [0u16; 16];
    for b in class.iter() {
        lo_sets[(b >> 4) as usize] |= 1 << (b & 0xF);
    }
    let mut hi_sets = [0u16; 16];
    for b in class.iter() {
        hi_sets[(b & 0xF) as usize] |= 1 << (b >> 4);
    }

    // high nibbles sharing a lo set form one product
    let mut by_hi: Vec<NibbleProduct> = Vec::new();
    for (h, &lo) in lo_sets.iter().enumerate().filter(|(_, &lo)| lo != 0) {
        match by_hi.iter_mut().find(|p| p.1 == lo) {
            Some(p) => p.0 |= 1 << h,
            None => by_hi.push((1 << h, lo)),
        }
    }

    let mut by_lo: Vec<NibbleProduct> = Vec::new();
    for (l, &hi) in hi_sets.iter().enumerate().filter(|(_, &hi)| hi != 0) {
        match by_lo.iter_mut().find(|p| p.0 == hi) {
            Some(p) => p.1 |= 1 << l,
            None => by_lo.push((hi, 1 << l)),
        }
    }

    if by_lo.len() < by_hi.len() {
        by_lo
    } else {
        by_hi
    }
}

/// Set `bit` in `lo`/`hi` for every nibble of `product`.
fn assign_bucket(lo: &mut [u8; 16], hi: &mut [u8; 16], product: NibbleProduct, bit: usize) {
    for n in 0..16 {
        if product.0 & (1 << n) != 0 {
            hi[n] |= 1 << bit;
        }
        if product.1 & (1 << n) != 0 {
            lo[n] |= 1 << bit;
        }
    }
}

#[inline(always)]
unsafe fn classify<V: SimdVector>(lo: V, hi: V, low_nibble: V, v: V) -> V {
    unsafe {
        let l = lo.byte_shuffle(v.and(low_nibble));
        let h = hi.byte_shuffle(v.shr_u16::<4>().and(low_nibble));
        l.and(h)
    }
}

/// Single-class Shufti tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShuftiMask {
    lo: [u8; 16],
    hi: [u8; 16],
}

impl ShuftiMask {
    /// Encode `class`, failing with [`ScanError::ClassTooComplex`] when it
    /// needs more than 8 buckets.
    pub fn from_class(class: &ByteSet) -> Result<Self> {
        let products = nibble_products(class);
        if products.len() > SHUFTI_BUCKETS {
            return Err(ScanError::class_too_complex(products.len(), SHUFTI_BUCKETS));
        }
        let mut mask = Self {
            lo: [0; 16],
            hi: [0; 16],
        };
        for (bit, &product) in products.iter().enumerate() {
            assign_bucket(&mut mask.lo, &mut mask.hi, product, bit);
        }
        log::debug!("Shufti class of {} bytes uses {} buckets", class.len(), products.len());
        Ok(mask)
    }

    /// Use tables built elsewhere.
    pub fn from_tables(lo: [u8; 16], hi: [u8; 16]) -> Self {
        Self { lo, hi }
    }

    /// Low-nibble table.
    pub fn lo(&self) -> &[u8; 16] {
        &self.lo
    }

    /// High-nibble table.
    pub fn hi(&self) -> &[u8; 16] {
        &self.hi
    }

    /// Membership test for one byte.
    #[inline]
    pub fn contains(&self, byte: u8) -> bool {
        self.lo[(byte & 0xF) as usize] & self.hi[(byte >> 4) as usize] != 0
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

/// [`ShuftiMask`] broadcast into registers.
#[derive(Debug, Clone, Copy)]
pub struct ShuftiMatcher<V> {
    lo: V,
    hi: V,
    low_nibble: V,
}

impl<V: SimdVector> ByteMatcher<V> for ShuftiMatcher<V> {
    #[inline(always)]
    unsafe fn hits(&self, v: V) -> V {
        unsafe {
            classify(self.lo, self.hi, self.low_nibble, v)
                .cmpeq(V::zeroes())
                .not()
        }
    }
}

impl SingleScan for ShuftiMask {
    type Matcher<V: SimdVector> = ShuftiMatcher<V>;

    #[inline(always)]
    unsafe fn matcher<V: SimdVector>(&self) -> ShuftiMatcher<V> {
        unsafe {
            ShuftiMatcher {
                lo: V::broadcast_table(&self.lo),
                hi: V::broadcast_table(&self.hi),
                low_nibble: V::splat(0x0F),
            }
        }
    }
}

/// Two-byte Shufti tables: a pair `(a, b)` matches when the buckets of `a`
/// under the first tables share a bit with the buckets of `b` under the
/// second tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoubleShuftiMask {
    lo1: [u8; 16],
    hi1: [u8; 16],
    lo2: [u8; 16],
    hi2: [u8; 16],
}

impl DoubleShuftiMask {
    /// Every pair `(a, b)` with `a` in `first` and `b` in `second`.
    pub fn from_classes(first: &ByteSet, second: &ByteSet) -> Result<Self> {
        Self::from_groups(&[(*first, *second)])
    }

    /// Exactly the listed byte pairs.
    ///
    /// Pairs are grouped into class products `A x B` (by shared second-byte
    /// set or by shared first-byte set, whichever packs tighter); each
    /// product costs one bucket per combination of nibble products of `A`
    /// and `B`.
    pub fn from_pairs(pairs: &[(u8, u8)]) -> Result<Self> {
        let mut seconds = vec![ByteSet::new(); 256];
        let mut firsts = vec![ByteSet::new(); 256];
        for &(a, b) in pairs {
            seconds[a as usize].insert(b);
            firsts[b as usize].insert(a);
        }

        let group = |sets: &[ByteSet], flip: bool| -> Vec<(ByteSet, ByteSet)> {
            let mut groups: Vec<(ByteSet, ByteSet)> = Vec::new();
            for (key, set) in sets.iter().enumerate().filter(|(_, s)| !s.is_empty()) {
                match groups.iter_mut().find(|g| g.1 == *set) {
                    Some(g) => g.0.insert(key as u8),
                    None => groups.push((ByteSet::from_bytes(&[key as u8]), *set)),
                }
            }
            if flip {
                groups.into_iter().map(|(k, s)| (s, k)).collect()
            } else {
                groups
            }
        };

        let by_first = group(&seconds, false);
        let by_second = group(&firsts, true);
        let cost = |groups: &[(ByteSet, ByteSet)]| -> usize {
            groups
                .iter()
                .map(|(a, b)| nibble_products(a).len() * nibble_products(b).len())
                .sum()
        };
        if cost(&by_second) < cost(&by_first) {
            Self::from_groups(&by_second)
        } else {
            Self::from_groups(&by_first)
        }
    }

    fn from_groups(groups: &[(ByteSet, ByteSet)]) -> Result<Self> {
        let mut mask = Self {
            lo1: [0; 16],
            hi1: [0; 16],
            lo2: [0; 16],
            hi2: [0; 16],
        };
        let mut bit = 0;
        let mut required = 0;
        for (first, second) in groups {
            let p1 = nibble_products(first);
            let p2 = nibble_products(second);
            required += p1.len() * p2.len();
            if required > SHUFTI_BUCKETS {
                continue;
            }
            for &a in &p1 {
                for &b in &p2 {
                    assign_bucket(&mut mask.lo1, &mut mask.hi1, a, bit);
                    assign_bucket(&mut mask.lo2, &mut mask.hi2, b, bit);
                    bit += 1;
                }
            }
        }
        if required > SHUFTI_BUCKETS {
            return Err(ScanError::class_too_complex(required, SHUFTI_BUCKETS));
        }
        log::debug!("Double shufti uses {} buckets for {} class products", bit, groups.len());
        Ok(mask)
    }

    /// Whether the pair `(a, b)` matches.
    #[inline]
    pub fn contains_pair(&self, a: u8, b: u8) -> bool {
        let first = self.lo1[(a & 0xF) as usize] & self.hi1[(a >> 4) as usize];
        let second = self.lo2[(b & 0xF) as usize] & self.hi2[(b >> 4) as usize];
        first & second != 0
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

/// [`DoubleShuftiMask`] broadcast into registers.
#[derive(Debug, Clone, Copy)]
pub struct DoubleShuftiMatcher<V> {
    first: ShuftiMatcher<V>,
    second: ShuftiMatcher<V>,
}

impl<V: SimdVector> PairMatcher<V> for DoubleShuftiMatcher<V> {
    #[inline(always)]
    unsafe fn first(&self, v: V) -> V {
        let m = &self.first;
        unsafe { classify(m.lo, m.hi, m.low_nibble, v) }
    }

    #[inline(always)]
    unsafe fn second(&self, v: V) -> V {
        let m = &self.second;
        unsafe { classify(m.lo, m.hi, m.low_nibble, v) }
    }
}

impl PairScan for DoubleShuftiMask {
    type Matcher<V: SimdVector> = DoubleShuftiMatcher<V>;

    #[inline(always)]
    unsafe fn matcher<V: SimdVector>(&self) -> DoubleShuftiMatcher<V> {
        unsafe {
            DoubleShuftiMatcher {
                first: ShuftiMask::from_tables(self.lo1, self.hi1).matcher::<V>(),
                second: ShuftiMask::from_tables(self.lo2, self.hi2).matcher::<V>(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIER: SimdTier = SimdTier::Portable16;

    fn assert_exact(class: &ByteSet) {
        let mask = ShuftiMask::from_class(class).unwrap();
        for b in 0..=255u8 {
            assert_eq!(mask.contains(b), class.contains(b), "byte {:#04x}", b);
        }
    }

    #[test]
    fn test_tables_are_exact() {
        assert_exact(&ByteSet::new());
        assert_exact(&ByteSet::full());
        assert_exact(&ByteSet::from_bytes(b"\t\n\r "));
        assert_exact(&ByteSet::from_range(b'a'..=b'z'));
        assert_exact(&ByteSet::from_range(b'0'..=b'9').union(&ByteSet::from_range(b'A'..=b'F')));
        assert_exact(&ByteSet::from_range(0x80..=0xFF));
    }

    #[test]
    fn test_bucket_counts() {
        assert!(nibble_products(&ByteSet::new()).is_empty());
        assert_eq!(nibble_products(&ByteSet::full()).len(), 1);
        // one hi nibble, many lo nibbles
        assert_eq!(nibble_products(&ByteSet::from_range(0x40..=0x4F)).len(), 1);
        // one lo nibble, many hi nibbles
        let column: ByteSet = (0..16u8).map(|h| (h << 4) | 3).collect();
        assert_eq!(nibble_products(&column).len(), 1);
    }

    #[test]
    fn test_too_complex() {
        let diagonal: ByteSet = (0..16u8).map(|i| (i << 4) | i).collect();
        match ShuftiMask::from_class(&diagonal) {
            Err(ScanError::ClassTooComplex { required, available }) => {
                assert_eq!(required, 16);
                assert_eq!(available, 8);
            }
            other => panic!("expected ClassTooComplex, got {:?}", other),
        }
        let eight: ByteSet = (0..8u8).map(|i| (i << 4) | i).collect();
        assert_exact(&eight);
    }

    #[test]
    fn test_find_and_rfind() {
        let mask = ShuftiMask::from_class(&ByteSet::from_bytes(b"aA")).unwrap();
        let hay = b"bbbbbbbbbbbbbbbbbAbbbbbbbbbbbbbbbbbbbbabbbbbb";
        assert_eq!(mask.find(TIER, hay), 17);
        assert_eq!(mask.rfind(TIER, hay), Some(38));
        assert_eq!(mask.find(TIER, b"bbbb"), 4);
        assert_eq!(mask.rfind(TIER, b""), None);
    }

    #[test]
    fn test_double_from_pairs_is_exact() {
        let pairs = [(b'a', b'b'), (b'a', b'c'), (b'x', b'b'), (b'x', b'c'), (0x90, 0x05)];
        let mask = DoubleShuftiMask::from_pairs(&pairs).unwrap();
        for a in 0..=255u8 {
            for b in 0..=255u8 {
                assert_eq!(mask.contains_pair(a, b), pairs.contains(&(a, b)), "{:#x} {:#x}", a, b);
            }
        }
    }

    #[test]
    fn test_double_find() {
        let mask = DoubleShuftiMask::from_pairs(&[(b'a', b'b')]).unwrap();
        let hay = b"bbbbbbbbbbbbbbbbbabbbbbbbbbbbbbbbbbbbbbbbbbbbbbbabbbbbbbbbbbb";
        for i in 0..16 {
            assert_eq!(i + mask.find(TIER, &hay[i..]), 17);
        }
        assert_eq!(mask.rfind(TIER, hay), Some(48));
        // "ba" is not "ab"
        assert_eq!(mask.find(TIER, b"bbba"), 4);
    }

    #[test]
    fn test_double_too_many_pairs() {
        let pairs: Vec<(u8, u8)> = (0..9u8).map(|i| ((i << 4) | i, (i << 4) | (15 - i))).collect();
        assert!(matches!(
            DoubleShuftiMask::from_pairs(&pairs),
            Err(ScanError::ClassTooComplex { .. })
        ));
    }
}
