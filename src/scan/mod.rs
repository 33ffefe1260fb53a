//! # Scan Engine
//!
//! Generic forward and reverse block loops shared by every byte predicate.
//! A descriptor (Vermicelli target, Shufti or Truffle tables, verm16
//! candidates) only says how one register is classified; the loops here
//! handle the unaligned head, the aligned body, the overlapping tail and
//! the one-byte carry between blocks for pair predicates.
//!
//! Forward single-byte loop over a buffer of `n >= WIDTH` bytes:
//!
//! ```text
//! |--head (unaligned)--|--aligned--|--aligned--|...|--tail (last WIDTH bytes)--|
//! ```
//!
//! The tail load overlaps bytes already classified. Those bytes produced no
//! match, so the first hit of the tail is always a new position. Buffers
//! shorter than one register are classified with a single zero-filled load
//! whose lanes past the end are masked off.

use crate::simd::{
    dispatch, first_non_zero_match, first_set_lane, first_zero_match_inverted,
    last_non_zero_match, last_set_lane, last_zero_match_inverted, lane_range, lanes_below,
    Kernel, SimdTier, SimdVector,
};

pub mod charclass;
pub mod shufti;
pub mod truffle;
pub mod verm16;
pub mod vermicelli;

pub use charclass::{ByteSet, ClassPairScanner, ClassScanner, ClassStrategy};
pub use shufti::{DoubleShuftiMask, ShuftiMask};
pub use truffle::{DoubleTruffleMask, TruffleMask};
pub use verm16::Verm16;
pub use vermicelli::{DoubleVermicelli, MaskedDoubleVermicelli, Vermicelli};

/// Classifies every byte of a register.
pub trait ByteMatcher<V: SimdVector>: Copy {
    /// 0xFF in lanes whose byte satisfies the predicate, 0x00 elsewhere.
    unsafe fn hits(&self, v: V) -> V;
}

/// Classifies adjacent byte pairs.
///
/// `first` and `second` may return any per-lane value; a pair `(i, i + 1)`
/// matches when [`combine`](Self::combine) of `first` at lane `i` and
/// `second` at lane `i + 1` is non-zero.
pub trait PairMatcher<V: SimdVector>: Copy {
    /// Per-lane state for the first byte of a pair.
    unsafe fn first(&self, v: V) -> V;
    /// Per-lane state for the second byte of a pair.
    unsafe fn second(&self, v: V) -> V;

    /// 0xFF where the aligned `first` and `second` states form a match.
    #[inline(always)]
    unsafe fn combine(&self, first: V, second: V) -> V {
        unsafe { first.and(second).cmpeq(V::zeroes()).not() }
    }
}

/// A single-byte predicate that can be prepared for any backend.
pub trait SingleScan {
    /// Prepared registers for backend `V`.
    type Matcher<V: SimdVector>: ByteMatcher<V>;

    /// Broadcast the descriptor into registers of backend `V`.
    unsafe fn matcher<V: SimdVector>(&self) -> Self::Matcher<V>;
}

/// A byte-pair predicate that can be prepared for any backend.
pub trait PairScan {
    /// Prepared registers for backend `V`.
    type Matcher<V: SimdVector>: PairMatcher<V>;

    /// Broadcast the descriptor into registers of backend `V`.
    unsafe fn matcher<V: SimdVector>(&self) -> Self::Matcher<V>;
}

// ============================================================================
// Single-byte loops
// ============================================================================

#[inline(always)]
unsafe fn hit_mask<V: SimdVector, const NEGATE: bool>(hits: V) -> u64 {
    let mask = unsafe { hits.compare_mask() };
    if NEGATE {
        !mask & lanes_below::<V>(V::WIDTH)
    } else {
        mask
    }
}

#[inline(always)]
unsafe fn first_hit<V: SimdVector, const NEGATE: bool>(hits: V) -> Option<usize> {
    if NEGATE {
        unsafe { first_zero_match_inverted(hits) }
    } else {
        unsafe { first_non_zero_match(hits) }
    }
}

#[inline(always)]
unsafe fn last_hit<V: SimdVector, const NEGATE: bool>(hits: V) -> Option<usize> {
    if NEGATE {
        unsafe { last_zero_match_inverted(hits) }
    } else {
        unsafe { last_non_zero_match(hits) }
    }
}

/// Offset of the first byte of `haystack` that matches (or, with `NEGATE`,
/// does not match).
#[inline(always)]
pub(crate) unsafe fn find_first<V, M, const NEGATE: bool>(m: &M, haystack: &[u8]) -> Option<usize>
where
    V: SimdVector,
    M: ByteMatcher<V>,
{
    let n = haystack.len();
    if n == 0 {
        return None;
    }
    unsafe {
        if n < V::WIDTH {
            let v = V::load_partial(haystack);
            let mask = hit_mask::<V, NEGATE>(m.hits(v)) & lanes_below::<V>(n);
            return first_set_lane::<V>(mask);
        }

        let ptr = haystack.as_ptr();
        let mut d = 0;
        let misalign = ptr as usize % V::WIDTH;
        if misalign != 0 {
            let v = V::load_unaligned(ptr);
            if let Some(i) = first_hit::<V, NEGATE>(m.hits(v)) {
                return Some(i);
            }
            d = V::WIDTH - misalign;
        }

        while d + V::WIDTH <= n {
            let v = V::load_aligned(ptr.add(d));
            if let Some(i) = first_hit::<V, NEGATE>(m.hits(v)) {
                return Some(d + i);
            }
            d += V::WIDTH;
        }

        if d < n {
            let t = n - V::WIDTH;
            let v = V::load_unaligned(ptr.add(t));
            if let Some(i) = first_hit::<V, NEGATE>(m.hits(v)) {
                return Some(t + i);
            }
        }
    }
    None
}

/// Offset of the last byte of `haystack` that matches (or, with `NEGATE`,
/// does not match).
#[inline(always)]
pub(crate) unsafe fn find_last<V, M, const NEGATE: bool>(m: &M, haystack: &[u8]) -> Option<usize>
where
    V: SimdVector,
    M: ByteMatcher<V>,
{
    let n = haystack.len();
    if n == 0 {
        return None;
    }
    unsafe {
        if n < V::WIDTH {
            let v = V::load_partial(haystack);
            let mask = hit_mask::<V, NEGATE>(m.hits(v)) & lanes_below::<V>(n);
            return last_set_lane::<V>(mask);
        }

        let ptr = haystack.as_ptr();
        let mut d = n;
        let misalign = (ptr as usize + n) % V::WIDTH;
        if misalign != 0 {
            let t = n - V::WIDTH;
            let v = V::load_unaligned(ptr.add(t));
            if let Some(i) = last_hit::<V, NEGATE>(m.hits(v)) {
                return Some(t + i);
            }
            d = n - misalign;
        }

        while d >= V::WIDTH {
            d -= V::WIDTH;
            let v = V::load_aligned(ptr.add(d));
            if let Some(i) = last_hit::<V, NEGATE>(m.hits(v)) {
                return Some(d + i);
            }
        }

        if d > 0 {
            let v = V::load_unaligned(ptr);
            if let Some(i) = last_hit::<V, NEGATE>(m.hits(v)) {
                return Some(i);
            }
        }
    }
    None
}

// ============================================================================
// Pair loops
// ============================================================================

/// Offset of the first byte of the first matching pair.
///
/// Each aligned block borrows the previous block's `first` state for its
/// lane 0, so pairs straddling a block boundary are found without reloading.
#[inline(always)]
pub(crate) unsafe fn find_first_pair<V, M>(m: &M, haystack: &[u8]) -> Option<usize>
where
    V: SimdVector,
    M: PairMatcher<V>,
{
    let n = haystack.len();
    if n < 2 {
        return None;
    }
    unsafe {
        if n <= V::WIDTH {
            let v = V::load_partial(haystack);
            let hits = m.combine(m.first(v).shift_bytes_left::<1>(), m.second(v));
            let mask = hits.compare_mask() & lane_range::<V>(1, n);
            return first_set_lane::<V>(mask).map(|j| j - 1);
        }

        let ptr = haystack.as_ptr();
        let mut d = 0;
        let mut prev = V::zeroes();
        let misalign = ptr as usize % V::WIDTH;
        if misalign != 0 {
            let v = V::load_unaligned(ptr);
            let c1 = m.first(v);
            let hits = m.combine(c1.shift_bytes_left::<1>(), m.second(v));
            if let Some(j) = first_non_zero_match(hits) {
                return Some(j - 1);
            }
            d = V::WIDTH - misalign;
            // Lane WIDTH - 1 of `prev` must describe byte d - 1.
            prev = c1.shift_bytes_left_var(V::WIDTH - d);
        }

        while d + V::WIDTH <= n {
            let v = V::load_aligned(ptr.add(d));
            let c1 = m.first(v);
            let hits = m.combine(c1.align_concat(prev, V::WIDTH - 1), m.second(v));
            if let Some(j) = first_non_zero_match(hits) {
                return Some(d + j - 1);
            }
            prev = c1;
            d += V::WIDTH;
        }

        if d < n {
            let t = n - V::WIDTH;
            let v = V::load_unaligned(ptr.add(t));
            let hits = m.combine(m.first(v).shift_bytes_left::<1>(), m.second(v));
            if let Some(j) = first_non_zero_match(hits) {
                return Some(t + j - 1);
            }
        }
    }
    None
}

/// Offset of the first byte of the last matching pair.
///
/// Mirror of [`find_first_pair`]: each aligned block borrows the following
/// block's `second` state for its last lane.
#[inline(always)]
pub(crate) unsafe fn find_last_pair<V, M>(m: &M, haystack: &[u8]) -> Option<usize>
where
    V: SimdVector,
    M: PairMatcher<V>,
{
    let n = haystack.len();
    if n < 2 {
        return None;
    }
    unsafe {
        if n <= V::WIDTH {
            let v = V::load_partial(haystack);
            let hits = m.combine(m.first(v), m.second(v).shift_bytes_right::<1>());
            let mask = hits.compare_mask() & lanes_below::<V>(n - 1);
            return last_set_lane::<V>(mask);
        }

        let ptr = haystack.as_ptr();
        let mut d = n;
        let mut next = V::zeroes();
        let misalign = (ptr as usize + n) % V::WIDTH;
        if misalign != 0 {
            let t = n - V::WIDTH;
            let v = V::load_unaligned(ptr.add(t));
            let c2 = m.second(v);
            let hits = m.combine(m.first(v), c2.shift_bytes_right::<1>());
            if let Some(q) = last_non_zero_match(hits) {
                return Some(t + q);
            }
            d = n - misalign;
            // Lane 0 of `next` must describe byte d.
            next = c2.shift_bytes_right_var(d - t);
        }

        while d >= V::WIDTH {
            d -= V::WIDTH;
            let v = V::load_aligned(ptr.add(d));
            let c2 = m.second(v);
            let hits = m.combine(m.first(v), next.align_concat(c2, 1));
            if let Some(q) = last_non_zero_match(hits) {
                return Some(d + q);
            }
            next = c2;
        }

        if d > 0 {
            let v = V::load_unaligned(ptr);
            let hits = m.combine(m.first(v), m.second(v).shift_bytes_right::<1>());
            if let Some(q) = last_non_zero_match(hits) {
                return Some(q);
            }
        }
    }
    None
}

// ============================================================================
// Kernels
// ============================================================================

/// Forward single-byte scan bound to a descriptor and a haystack.
pub(crate) struct FindFirst<'a, D: ?Sized, const NEGATE: bool> {
    desc: &'a D,
    haystack: &'a [u8],
}

impl<'a, D: SingleScan + ?Sized, const NEGATE: bool> Kernel for FindFirst<'a, D, NEGATE> {
    type Output = Option<usize>;

    #[inline(always)]
    unsafe fn run<V: SimdVector>(self) -> Option<usize> {
        unsafe {
            let m = self.desc.matcher::<V>();
            find_first::<V, _, NEGATE>(&m, self.haystack)
        }
    }
}

/// Reverse single-byte scan bound to a descriptor and a haystack.
pub(crate) struct FindLast<'a, D: ?Sized, const NEGATE: bool> {
    desc: &'a D,
    haystack: &'a [u8],
}

impl<'a, D: SingleScan + ?Sized, const NEGATE: bool> Kernel for FindLast<'a, D, NEGATE> {
    type Output = Option<usize>;

    #[inline(always)]
    unsafe fn run<V: SimdVector>(self) -> Option<usize> {
        unsafe {
            let m = self.desc.matcher::<V>();
            find_last::<V, _, NEGATE>(&m, self.haystack)
        }
    }
}

/// Forward pair scan bound to a descriptor and a haystack.
pub(crate) struct FindFirstPair<'a, D: ?Sized> {
    desc: &'a D,
    haystack: &'a [u8],
}

impl<'a, D: PairScan + ?Sized> Kernel for FindFirstPair<'a, D> {
    type Output = Option<usize>;

    #[inline(always)]
    unsafe fn run<V: SimdVector>(self) -> Option<usize> {
        unsafe {
            let m = self.desc.matcher::<V>();
            find_first_pair::<V, _>(&m, self.haystack)
        }
    }
}

/// Reverse pair scan bound to a descriptor and a haystack.
pub(crate) struct FindLastPair<'a, D: ?Sized> {
    desc: &'a D,
    haystack: &'a [u8],
}

impl<'a, D: PairScan + ?Sized> Kernel for FindLastPair<'a, D> {
    type Output = Option<usize>;

    #[inline(always)]
    unsafe fn run<V: SimdVector>(self) -> Option<usize> {
        unsafe {
            let m = self.desc.matcher::<V>();
            find_last_pair::<V, _>(&m, self.haystack)
        }
    }
}

/// First offset in `haystack` whose byte satisfies `desc`.
pub fn first<D: SingleScan + ?Sized>(tier: SimdTier, desc: &D, haystack: &[u8]) -> Option<usize> {
    dispatch(tier, FindFirst::<D, false> { desc, haystack })
}

/// Last offset in `haystack` whose byte satisfies `desc`.
pub fn last<D: SingleScan + ?Sized>(tier: SimdTier, desc: &D, haystack: &[u8]) -> Option<usize> {
    dispatch(tier, FindLast::<D, false> { desc, haystack })
}

/// First offset in `haystack` whose byte does not satisfy `desc`.
pub fn first_not<D: SingleScan + ?Sized>(
    tier: SimdTier,
    desc: &D,
    haystack: &[u8],
) -> Option<usize> {
    dispatch(tier, FindFirst::<D, true> { desc, haystack })
}

/// Last offset in `haystack` whose byte does not satisfy `desc`.
pub fn last_not<D: SingleScan + ?Sized>(
    tier: SimdTier,
    desc: &D,
    haystack: &[u8],
) -> Option<usize> {
    dispatch(tier, FindLast::<D, true> { desc, haystack })
}

/// Offset of the first byte of the first pair in `haystack` matching `desc`.
pub fn first_pair<D: PairScan + ?Sized>(
    tier: SimdTier,
    desc: &D,
    haystack: &[u8],
) -> Option<usize> {
    dispatch(tier, FindFirstPair { desc, haystack })
}

/// Offset of the first byte of the last pair in `haystack` matching `desc`.
pub fn last_pair<D: PairScan + ?Sized>(tier: SimdTier, desc: &D, haystack: &[u8]) -> Option<usize> {
    dispatch(tier, FindLastPair { desc, haystack })
}

/// Matcher built from a plain closure over a register. Test helper for
/// exercising the loops without a descriptor.
#[cfg(test)]
#[derive(Clone, Copy)]
pub(crate) struct FnMatcher<V, F> {
    f: F,
    _vector: std::marker::PhantomData<V>,
}

#[cfg(test)]
impl<V: SimdVector, F: Fn(V) -> V + Copy> ByteMatcher<V> for FnMatcher<V, F> {
    unsafe fn hits(&self, v: V) -> V {
        (self.f)(v)
    }
}

/// Matches lanes where `byte & mask == target`. Prepared form of
/// [`Vermicelli`] and the Noodle key bytes.
#[derive(Clone, Copy, Debug)]
pub struct MaskedEq<V> {
    target: V,
    mask: V,
}

impl<V: SimdVector> MaskedEq<V> {
    /// Splat `target` and `mask` into registers of `V`.
    ///
    /// # Safety
    ///
    /// The CPU must support the instruction set of `V`.
    #[inline(always)]
    pub unsafe fn new(target: u8, mask: u8) -> Self {
        unsafe {
            Self {
                target: V::splat(target),
                mask: V::splat(mask),
            }
        }
    }
}

impl<V: SimdVector> ByteMatcher<V> for MaskedEq<V> {
    #[inline(always)]
    unsafe fn hits(&self, v: V) -> V {
        unsafe { v.and(self.mask).cmpeq(self.target) }
    }
}

/// Two [`MaskedEq`] predicates forming a pair. Prepared form of
/// [`DoubleVermicelli`] and [`MaskedDoubleVermicelli`].
#[derive(Clone, Copy, Debug)]
pub struct MaskedEqPair<V> {
    first: MaskedEq<V>,
    second: MaskedEq<V>,
}

impl<V: SimdVector> MaskedEqPair<V> {
    /// Predicates `byte & m1 == c1` for the first byte and `byte & m2 == c2`
    /// for the second.
    ///
    /// # Safety
    ///
    /// The CPU must support the instruction set of `V`.
    #[inline(always)]
    pub unsafe fn new(c1: u8, m1: u8, c2: u8, m2: u8) -> Self {
        unsafe {
            Self {
                first: MaskedEq::new(c1, m1),
                second: MaskedEq::new(c2, m2),
            }
        }
    }
}

impl<V: SimdVector> PairMatcher<V> for MaskedEqPair<V> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simd::Portable;

    type P16 = Portable<16>;

    /// Buffer placed at a chosen offset from a 64-byte boundary.
    fn placed(data: &[u8], align: usize) -> (Vec<u8>, usize) {
        let mut storage = vec![0u8; data.len() + 128];
        let base = storage.as_ptr() as usize;
        let start = (64 - base % 64) % 64 + align;
        storage[start..start + data.len()].copy_from_slice(data);
        (storage, start)
    }

    fn eq_matcher<V: SimdVector>(byte: u8) -> MaskedEq<V> {
        unsafe { MaskedEq::new(byte, 0xFF) }
    }

    #[test]
    fn test_find_first_every_position_and_alignment() {
        for len in [0usize, 1, 15, 16, 17, 31, 33, 64, 100] {
            for align in 0..16 {
                for pos in 0..len {
                    let mut data = vec![b'.'; len];
                    data[pos] = b'x';
                    let (storage, start) = placed(&data, align);
                    let hay = &storage[start..start + len];
                    let m = eq_matcher::<P16>(b'x');
                    unsafe {
                        assert_eq!(find_first::<P16, _, false>(&m, hay), Some(pos));
                        assert_eq!(find_last::<P16, _, false>(&m, hay), Some(pos));
                    }
                }
                let data = vec![b'.'; len];
                let (storage, start) = placed(&data, align);
                let hay = &storage[start..start + len];
                let m = eq_matcher::<P16>(b'x');
                unsafe {
                    assert_eq!(find_first::<P16, _, false>(&m, hay), None);
                    assert_eq!(find_last::<P16, _, false>(&m, hay), None);
                }
            }
        }
    }

    #[test]
    fn test_negated_scans() {
        let mut data = vec![b'a'; 70];
        data[5] = b'b';
        data[60] = b'c';
        let m = eq_matcher::<P16>(b'a');
        unsafe {
            assert_eq!(find_first::<P16, _, true>(&m, &data), Some(5));
            assert_eq!(find_last::<P16, _, true>(&m, &data), Some(60));
            assert_eq!(find_first::<P16, _, true>(&m, &data[..5]), None);
            assert_eq!(find_last::<P16, _, true>(&m, &data[61..]), None);
        }
    }

    #[test]
    fn test_pair_across_block_boundaries() {
        for len in [2usize, 3, 16, 17, 40, 97] {
            for align in 0..16 {
                for pos in 0..len - 1 {
                    let mut data = vec![b'.'; len];
                    data[pos] = b'a';
                    data[pos + 1] = b'b';
                    let (storage, start) = placed(&data, align);
                    let hay = &storage[start..start + len];
                    let m = unsafe { MaskedEqPair::<P16>::new(b'a', 0xFF, b'b', 0xFF) };
                    unsafe {
                        let ctx = format!("len {} align {}", len, align);
                        assert_eq!(find_first_pair(&m, hay), Some(pos), "{}", ctx);
                        assert_eq!(find_last_pair(&m, hay), Some(pos), "{}", ctx);
                    }
                }
            }
        }
    }

    #[test]
    fn test_pair_requires_adjacency() {
        let data = b"a.b.ab.a";
        let m = unsafe { MaskedEqPair::<P16>::new(b'b', 0xFF, b'a', 0xFF) };
        unsafe {
            assert_eq!(find_first_pair(&m, data), None);
            assert_eq!(find_last_pair(&m, data), None);
            assert_eq!(find_first_pair(&m, &data[..1]), None);
        }
    }

    #[test]
    fn test_closure_matcher() {
        let m = FnMatcher::<P16, _> {
            f: |v: P16| unsafe { v.cmpgt(P16::splat(b'm')) },
            _vector: std::marker::PhantomData,
        };
        unsafe {
            assert_eq!(find_first::<P16, _, false>(&m, b"abcdefghijklmnopq"), Some(13));
            assert_eq!(find_last::<P16, _, false>(&m, b"zabc"), Some(0));
        }
    }
}
