//! AArch64 NEON backend (16 bytes).
//!
//! NEON has no byte movemask. `compare_mask` narrows each 16-bit pair with a
//! shift-right-by-4, leaving a 4-bit group per lane, so the mask width is 4
//! and [`SimdVector::iteration_mask`] keeps one bit of each group.

use super::SimdVector;
use std::arch::aarch64::*;

/// 128-bit register backed by NEON instructions.
#[derive(Clone, Copy, Debug)]
#[repr(transparent)]
pub struct NeonVector(uint8x16_t);

impl SimdVector for NeonVector {
    const WIDTH: usize = 16;
    const MASK_WIDTH: u32 = 4;
    const NAME: &'static str = "neon";

    #[inline(always)]
    unsafe fn splat(byte: u8) -> Self {
        Self(unsafe { vdupq_n_u8(byte) })
    }

    #[inline(always)]
    unsafe fn splat_u64(value: u64) -> Self {
        Self(unsafe { vreinterpretq_u8_u64(vdupq_n_u64(value)) })
    }

    #[inline(always)]
    unsafe fn zeroes() -> Self {
        Self(unsafe { vdupq_n_u8(0) })
    }

    #[inline(always)]
    unsafe fn load_aligned(data: *const u8) -> Self {
        debug_assert_eq!(data as usize % 16, 0, "aligned load from unaligned address");
        Self(unsafe { vld1q_u8(data) })
    }

    #[inline(always)]
    unsafe fn load_unaligned(data: *const u8) -> Self {
        Self(unsafe { vld1q_u8(data) })
    }

    #[inline(always)]
    unsafe fn store_unaligned(self, out: *mut u8) {
        unsafe { vst1q_u8(out, self.0) }
    }

    #[inline(always)]
    unsafe fn broadcast_table(table: &[u8; 16]) -> Self {
        Self(unsafe { vld1q_u8(table.as_ptr()) })
    }

    #[inline(always)]
    unsafe fn and(self, other: Self) -> Self {
        Self(unsafe { vandq_u8(self.0, other.0) })
    }

    #[inline(always)]
    unsafe fn or(self, other: Self) -> Self {
        Self(unsafe { vorrq_u8(self.0, other.0) })
    }

    #[inline(always)]
    unsafe fn xor(self, other: Self) -> Self {
        Self(unsafe { veorq_u8(self.0, other.0) })
    }

    #[inline(always)]
    unsafe fn and_not(self, other: Self) -> Self {
        Self(unsafe { vbicq_u8(self.0, other.0) })
    }

    #[inline(always)]
    unsafe fn not(self) -> Self {
        Self(unsafe { vmvnq_u8(self.0) })
    }

    #[inline(always)]
    unsafe fn cmpeq(self, other: Self) -> Self {
        Self(unsafe { vceqq_u8(self.0, other.0) })
    }

    #[inline(always)]
    unsafe fn cmpgt(self, other: Self) -> Self {
        Self(unsafe { vcgtq_u8(self.0, other.0) })
    }

    #[inline(always)]
    unsafe fn shr_u16<const N: i32>(self) -> Self {
        Self(unsafe { vreinterpretq_u8_u16(vshrq_n_u16::<N>(vreinterpretq_u16_u8(self.0))) })
    }

    #[inline(always)]
    unsafe fn shl_u16<const N: i32>(self) -> Self {
        Self(unsafe { vreinterpretq_u8_u16(vshlq_n_u16::<N>(vreinterpretq_u16_u8(self.0))) })
    }

    #[inline(always)]
    unsafe fn shr_u16_var(self, count: u32) -> Self {
        let count = count.min(16) as i16;
        Self(unsafe {
            vreinterpretq_u8_u16(vshlq_u16(vreinterpretq_u16_u8(self.0), vdupq_n_s16(-count)))
        })
    }

    #[inline(always)]
    unsafe fn shl_u16_var(self, count: u32) -> Self {
        let count = count.min(16) as i16;
        Self(unsafe {
            vreinterpretq_u8_u16(vshlq_u16(vreinterpretq_u16_u8(self.0), vdupq_n_s16(count)))
        })
    }

    #[inline(always)]
    unsafe fn byte_shuffle(self, indices: Self) -> Self {
        // TBL already yields zero for any index >= 16.
        Self(unsafe { vqtbl1q_u8(self.0, indices.0) })
    }

    #[inline(always)]
    unsafe fn compare_mask(self) -> u64 {
        unsafe {
            let narrowed = vshrn_n_u16::<4>(vreinterpretq_u16_u8(self.0));
            vget_lane_u64::<0>(vreinterpret_u64_u8(narrowed))
        }
    }

    #[inline(always)]
    fn iteration_mask(mask: u64) -> u64 {
        mask & 0x1111_1111_1111_1111
    }

    #[inline(always)]
    unsafe fn align_concat(self, low: Self, offset: usize) -> Self {
        debug_assert!(offset <= 16);
        macro_rules! ext {
            ($($n:literal),*) => {
                match offset {
                    0 => low,
                    $( $n => Self(unsafe { vextq_u8::<$n>(low.0, self.0) }), )*
                    _ => self,
                }
            };
        }
        ext!(1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simd::{first_non_zero_match, last_non_zero_match, to_bytes, Portable};

    #[test]
    fn test_mask_width_four_extraction() {
        let mut bytes = [0u8; 16];
        bytes[2] = 0xFF;
        bytes[13] = 0xFF;
        unsafe {
            let v = NeonVector::load_unaligned(bytes.as_ptr());
            assert_eq!(v.compare_mask(), (0xF << 8) | (0xF << 52));
            assert_eq!(first_non_zero_match(v), Some(2));
            assert_eq!(last_non_zero_match(v), Some(13));
        }
    }

    #[test]
    fn test_matches_portable() {
        let mut a_bytes = [0u8; 16];
        let mut b_bytes = [0u8; 16];
        for i in 0..16 {
            a_bytes[i] = (i as u8).wrapping_mul(37).wrapping_add(3);
            b_bytes[i] = (i as u8).wrapping_mul(91).wrapping_add(200);
        }
        unsafe {
            let a = NeonVector::load_unaligned(a_bytes.as_ptr());
            let b = NeonVector::load_unaligned(b_bytes.as_ptr());
            let pa = Portable::<16>::from_array(a_bytes);
            let pb = Portable::<16>::from_array(b_bytes);
            assert_eq!(to_bytes(a.byte_shuffle(b)), to_bytes(pa.byte_shuffle(pb)));
            assert_eq!(to_bytes(a.cmpgt(b)), to_bytes(pa.cmpgt(pb)));
            assert_eq!(to_bytes(a.shr_u16::<4>()), to_bytes(pa.shr_u16::<4>()));
            assert_eq!(to_bytes(a.shr_u16_var(5)), to_bytes(pa.shr_u16_var(5)));
            for offset in 0..=16 {
                assert_eq!(
                    to_bytes(a.align_concat(b, offset)),
                    to_bytes(pa.align_concat(pb, offset))
                );
            }
        }
    }
}
