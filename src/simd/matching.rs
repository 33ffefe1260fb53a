//! Match-position extraction.
//!
//! Turns a boolean-per-byte register (every lane 0x00 or 0xFF) or a comparison
//! mask into lane offsets. This is the only place that knows about
//! [`SimdVector::MASK_WIDTH`]: callers add the returned lane to the offset of
//! the block they loaded.

use super::SimdVector;

/// Mask bits covering lanes `0..lanes`.
#[inline(always)]
pub fn lanes_below<V: SimdVector>(lanes: usize) -> u64 {
    let bits = lanes as u32 * V::MASK_WIDTH;
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Mask bits covering lanes `lo..hi`.
#[inline(always)]
pub fn lane_range<V: SimdVector>(lo: usize, hi: usize) -> u64 {
    if lo >= hi {
        return 0;
    }
    lanes_below::<V>(hi) & !lanes_below::<V>(lo)
}

/// Lowest lane with a bit set in `mask`.
#[inline(always)]
pub fn first_set_lane<V: SimdVector>(mask: u64) -> Option<usize> {
    let mask = V::iteration_mask(mask);
    if mask == 0 {
        None
    } else {
        Some((mask.trailing_zeros() / V::MASK_WIDTH) as usize)
    }
}

/// Highest lane with a bit set in `mask`.
#[inline(always)]
pub fn last_set_lane<V: SimdVector>(mask: u64) -> Option<usize> {
    let mask = V::iteration_mask(mask);
    if mask == 0 {
        None
    } else {
        Some(((63 - mask.leading_zeros()) / V::MASK_WIDTH) as usize)
    }
}

/// First lane of `v` that is non-zero.
#[inline(always)]
pub unsafe fn first_non_zero_match<V: SimdVector>(v: V) -> Option<usize> {
    first_set_lane::<V>(unsafe { v.compare_mask() })
}

/// Last lane of `v` that is non-zero.
#[inline(always)]
pub unsafe fn last_non_zero_match<V: SimdVector>(v: V) -> Option<usize> {
    last_set_lane::<V>(unsafe { v.compare_mask() })
}

/// First lane of `v` that is zero.
#[inline(always)]
pub unsafe fn first_zero_match_inverted<V: SimdVector>(v: V) -> Option<usize> {
    let mask = !unsafe { v.compare_mask() } & lanes_below::<V>(V::WIDTH);
    first_set_lane::<V>(mask)
}

/// Last lane of `v` that is zero.
#[inline(always)]
pub unsafe fn last_zero_match_inverted<V: SimdVector>(v: V) -> Option<usize> {
    let mask = !unsafe { v.compare_mask() } & lanes_below::<V>(V::WIDTH);
    last_set_lane::<V>(mask)
}

/// Iterator over the set lanes of a comparison mask, lowest first.
#[derive(Debug, Clone, Copy)]
pub struct SetLanes<V: SimdVector> {
    mask: u64,
    _vector: std::marker::PhantomData<V>,
}

impl<V: SimdVector> SetLanes<V> {
    /// Iterate the lanes of `mask`, which may carry `MASK_WIDTH` bits per lane.
    #[inline(always)]
    pub fn new(mask: u64) -> Self {
        Self {
            mask: V::iteration_mask(mask),
            _vector: std::marker::PhantomData,
        }
    }
}

impl<V: SimdVector> Iterator for SetLanes<V> {
    type Item = usize;

    #[inline(always)]
    fn next(&mut self) -> Option<usize> {
        if self.mask == 0 {
            return None;
        }
        let bit = self.mask.trailing_zeros();
        self.mask &= self.mask - 1;
        Some((bit / V::MASK_WIDTH) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simd::Portable;

    type P16 = Portable<16>;
    type P64 = Portable<64>;

    fn flags<const N: usize>(set: &[usize]) -> Portable<N> {
        let mut bytes = [0u8; N];
        for &i in set {
            bytes[i] = 0xFF;
        }
        Portable::from_array(bytes)
    }

    #[test]
    fn test_first_and_last_non_zero() {
        unsafe {
            let v = flags::<16>(&[3, 9]);
            assert_eq!(first_non_zero_match(v), Some(3));
            assert_eq!(last_non_zero_match(v), Some(9));
            assert_eq!(first_non_zero_match(P16::zeroes()), None);
            assert_eq!(last_non_zero_match(P16::zeroes()), None);
        }
    }

    #[test]
    fn test_inverted_matches() {
        unsafe {
            let mut all = [0xFFu8; 16];
            all[4] = 0;
            all[11] = 0;
            let v = P16::from_array(all);
            assert_eq!(first_zero_match_inverted(v), Some(4));
            assert_eq!(last_zero_match_inverted(v), Some(11));
            assert_eq!(first_zero_match_inverted(P16::ones()), None);
        }
    }

    #[test]
    fn test_full_width_lanes() {
        unsafe {
            let v = flags::<64>(&[0, 63]);
            assert_eq!(first_non_zero_match(v), Some(0));
            assert_eq!(last_non_zero_match(v), Some(63));
            assert_eq!(first_zero_match_inverted(P64::ones()), None);
        }
        assert_eq!(lanes_below::<P64>(64), u64::MAX);
        assert_eq!(lanes_below::<P16>(3), 0b111);
        assert_eq!(lane_range::<P16>(2, 5), 0b11100);
        assert_eq!(lane_range::<P16>(5, 5), 0);
    }

    #[test]
    fn test_set_lanes_iterates_in_order() {
        let lanes: Vec<usize> = SetLanes::<P16>::new(0b1000_0000_0010_0101).collect();
        assert_eq!(lanes, vec![0, 2, 5, 15]);
    }
}
