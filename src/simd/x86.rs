//! x86_64 backends: SSSE3 (16 bytes), AVX2 (32 bytes) and AVX-512BW (64 bytes).
//!
//! `pshufb` only zeroes a lane when the index has its high bit set; indices
//! 16..=127 wrap to their low nibble. `byte_shuffle` masks those lanes out so
//! the result matches the portable definition.

use super::SimdVector;
use std::arch::x86_64::*;

/// Expand a runtime offset into a match over constant offsets.
macro_rules! const_offset {
    ($offset:expr, $fallback:expr, |$k:ident| $body:expr, [$($n:literal),* $(,)?]) => {
        match $offset {
            $( $n => {
                const $k: i32 = $n;
                $body
            } )*
            _ => $fallback,
        }
    };
}

// ============================================================================
// SSSE3
// ============================================================================

/// 128-bit register backed by SSE2/SSSE3 instructions.
#[derive(Clone, Copy, Debug)]
#[repr(transparent)]
pub struct Ssse3Vector(__m128i);

impl SimdVector for Ssse3Vector {
    const WIDTH: usize = 16;
    const MASK_WIDTH: u32 = 1;
    const NAME: &'static str = "ssse3";

    #[inline(always)]
    unsafe fn splat(byte: u8) -> Self {
        Self(unsafe { _mm_set1_epi8(byte as i8) })
    }

    #[inline(always)]
    unsafe fn splat_u64(value: u64) -> Self {
        Self(unsafe { _mm_set1_epi64x(value as i64) })
    }

    #[inline(always)]
    unsafe fn zeroes() -> Self {
        Self(unsafe { _mm_setzero_si128() })
    }

    #[inline(always)]
    unsafe fn load_aligned(data: *const u8) -> Self {
        debug_assert_eq!(data as usize % 16, 0, "aligned load from unaligned address");
        Self(unsafe { _mm_load_si128(data as *const __m128i) })
    }

    #[inline(always)]
    unsafe fn load_unaligned(data: *const u8) -> Self {
        Self(unsafe { _mm_loadu_si128(data as *const __m128i) })
    }

    #[inline(always)]
    unsafe fn store_unaligned(self, out: *mut u8) {
        unsafe { _mm_storeu_si128(out as *mut __m128i, self.0) }
    }

    #[inline(always)]
    unsafe fn broadcast_table(table: &[u8; 16]) -> Self {
        Self(unsafe { _mm_loadu_si128(table.as_ptr() as *const __m128i) })
    }

    #[inline(always)]
    unsafe fn and(self, other: Self) -> Self {
        Self(unsafe { _mm_and_si128(self.0, other.0) })
    }

    #[inline(always)]
    unsafe fn or(self, other: Self) -> Self {
        Self(unsafe { _mm_or_si128(self.0, other.0) })
    }

    #[inline(always)]
    unsafe fn xor(self, other: Self) -> Self {
        Self(unsafe { _mm_xor_si128(self.0, other.0) })
    }

    #[inline(always)]
    unsafe fn and_not(self, other: Self) -> Self {
        Self(unsafe { _mm_andnot_si128(other.0, self.0) })
    }

    #[inline(always)]
    unsafe fn cmpeq(self, other: Self) -> Self {
        Self(unsafe { _mm_cmpeq_epi8(self.0, other.0) })
    }

    #[inline(always)]
    unsafe fn cmpgt(self, other: Self) -> Self {
        unsafe {
            let ge = _mm_cmpeq_epi8(_mm_max_epu8(self.0, other.0), self.0);
            let eq = _mm_cmpeq_epi8(self.0, other.0);
            Self(_mm_andnot_si128(eq, ge))
        }
    }

    #[inline(always)]
    unsafe fn shr_u16<const N: i32>(self) -> Self {
        Self(unsafe { _mm_srli_epi16::<N>(self.0) })
    }

    #[inline(always)]
    unsafe fn shl_u16<const N: i32>(self) -> Self {
        Self(unsafe { _mm_slli_epi16::<N>(self.0) })
    }

    #[inline(always)]
    unsafe fn shr_u16_var(self, count: u32) -> Self {
        Self(unsafe { _mm_srl_epi16(self.0, _mm_cvtsi32_si128(count as i32)) })
    }

    #[inline(always)]
    unsafe fn shl_u16_var(self, count: u32) -> Self {
        Self(unsafe { _mm_sll_epi16(self.0, _mm_cvtsi32_si128(count as i32)) })
    }

    #[inline(always)]
    unsafe fn shift_bytes_left<const N: i32>(self) -> Self {
        Self(unsafe { _mm_bslli_si128::<N>(self.0) })
    }

    #[inline(always)]
    unsafe fn shift_bytes_right<const N: i32>(self) -> Self {
        Self(unsafe { _mm_bsrli_si128::<N>(self.0) })
    }

    #[inline(always)]
    unsafe fn byte_shuffle(self, indices: Self) -> Self {
        unsafe {
            let high = _mm_and_si128(indices.0, _mm_set1_epi8(0xF0u8 as i8));
            let in_range = _mm_cmpeq_epi8(high, _mm_setzero_si128());
            Self(_mm_and_si128(_mm_shuffle_epi8(self.0, indices.0), in_range))
        }
    }

    #[inline(always)]
    unsafe fn compare_mask(self) -> u64 {
        unsafe { _mm_movemask_epi8(self.0) as u32 as u64 }
    }

    #[inline(always)]
    unsafe fn align_concat(self, low: Self, offset: usize) -> Self {
        debug_assert!(offset <= 16);
        match offset {
            0 => low,
            16 => self,
            _ => const_offset!(
                offset,
                unsafe { super::spill_align_concat(self, low, offset) },
                |K| Self(unsafe { _mm_alignr_epi8::<K>(self.0, low.0) }),
                [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15]
            ),
        }
    }
}

// ============================================================================
// AVX2
// ============================================================================

/// 256-bit register backed by AVX2 instructions.
#[derive(Clone, Copy, Debug)]
#[repr(transparent)]
pub struct Avx2Vector(__m256i);

impl SimdVector for Avx2Vector {
    const WIDTH: usize = 32;
    const MASK_WIDTH: u32 = 1;
    const NAME: &'static str = "avx2";

    #[inline(always)]
    unsafe fn splat(byte: u8) -> Self {
        Self(unsafe { _mm256_set1_epi8(byte as i8) })
    }

    #[inline(always)]
    unsafe fn splat_u64(value: u64) -> Self {
        Self(unsafe { _mm256_set1_epi64x(value as i64) })
    }

    #[inline(always)]
    unsafe fn zeroes() -> Self {
        Self(unsafe { _mm256_setzero_si256() })
    }

    #[inline(always)]
    unsafe fn load_aligned(data: *const u8) -> Self {
        debug_assert_eq!(data as usize % 32, 0, "aligned load from unaligned address");
        Self(unsafe { _mm256_load_si256(data as *const __m256i) })
    }

    #[inline(always)]
    unsafe fn load_unaligned(data: *const u8) -> Self {
        Self(unsafe { _mm256_loadu_si256(data as *const __m256i) })
    }

    #[inline(always)]
    unsafe fn store_unaligned(self, out: *mut u8) {
        unsafe { _mm256_storeu_si256(out as *mut __m256i, self.0) }
    }

    #[inline(always)]
    unsafe fn broadcast_table(table: &[u8; 16]) -> Self {
        Self(unsafe {
            _mm256_broadcastsi128_si256(_mm_loadu_si128(table.as_ptr() as *const __m128i))
        })
    }

    #[inline(always)]
    unsafe fn and(self, other: Self) -> Self {
        Self(unsafe { _mm256_and_si256(self.0, other.0) })
    }

    #[inline(always)]
    unsafe fn or(self, other: Self) -> Self {
        Self(unsafe { _mm256_or_si256(self.0, other.0) })
    }

    #[inline(always)]
    unsafe fn xor(self, other: Self) -> Self {
        Self(unsafe { _mm256_xor_si256(self.0, other.0) })
    }

    #[inline(always)]
    unsafe fn and_not(self, other: Self) -> Self {
        Self(unsafe { _mm256_andnot_si256(other.0, self.0) })
    }

    #[inline(always)]
    unsafe fn cmpeq(self, other: Self) -> Self {
        Self(unsafe { _mm256_cmpeq_epi8(self.0, other.0) })
    }

    #[inline(always)]
    unsafe fn cmpgt(self, other: Self) -> Self {
        unsafe {
            let ge = _mm256_cmpeq_epi8(_mm256_max_epu8(self.0, other.0), self.0);
            let eq = _mm256_cmpeq_epi8(self.0, other.0);
            Self(_mm256_andnot_si256(eq, ge))
        }
    }

    #[inline(always)]
    unsafe fn shr_u16<const N: i32>(self) -> Self {
        Self(unsafe { _mm256_srli_epi16::<N>(self.0) })
    }

    #[inline(always)]
    unsafe fn shl_u16<const N: i32>(self) -> Self {
        Self(unsafe { _mm256_slli_epi16::<N>(self.0) })
    }

    #[inline(always)]
    unsafe fn shr_u16_var(self, count: u32) -> Self {
        Self(unsafe { _mm256_srl_epi16(self.0, _mm_cvtsi32_si128(count as i32)) })
    }

    #[inline(always)]
    unsafe fn shl_u16_var(self, count: u32) -> Self {
        Self(unsafe { _mm256_sll_epi16(self.0, _mm_cvtsi32_si128(count as i32)) })
    }

    #[inline(always)]
    unsafe fn byte_shuffle(self, indices: Self) -> Self {
        unsafe {
            let high = _mm256_and_si256(indices.0, _mm256_set1_epi8(0xF0u8 as i8));
            let in_range = _mm256_cmpeq_epi8(high, _mm256_setzero_si256());
            Self(_mm256_and_si256(_mm256_shuffle_epi8(self.0, indices.0), in_range))
        }
    }

    #[inline(always)]
    unsafe fn compare_mask(self) -> u64 {
        unsafe { _mm256_movemask_epi8(self.0) as u32 as u64 }
    }

    #[inline(always)]
    unsafe fn align_concat(self, low: Self, offset: usize) -> Self {
        debug_assert!(offset <= 32);
        // Middle 32 bytes of low ++ self: [low.hi128, self.lo128].
        let mid = unsafe { _mm256_permute2x128_si256::<0x21>(low.0, self.0) };
        match offset {
            0 => low,
            16 => Self(mid),
            32 => self,
            1..=15 => const_offset!(
                offset,
                unsafe { super::spill_align_concat(self, low, offset) },
                |K| Self(unsafe { _mm256_alignr_epi8::<K>(mid, low.0) }),
                [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15]
            ),
            _ => const_offset!(
                offset - 16,
                unsafe { super::spill_align_concat(self, low, offset) },
                |K| Self(unsafe { _mm256_alignr_epi8::<K>(self.0, mid) }),
                [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15]
            ),
        }
    }
}

// ============================================================================
// AVX-512BW
// ============================================================================

/// 512-bit register backed by AVX-512F/BW instructions.
#[cfg(feature = "avx512")]
#[derive(Clone, Copy, Debug)]
#[repr(transparent)]
pub struct Avx512Vector(__m512i);

#[cfg(feature = "avx512")]
impl SimdVector for Avx512Vector {
    const WIDTH: usize = 64;
    const MASK_WIDTH: u32 = 1;
    const NAME: &'static str = "avx512";

    #[inline(always)]
    unsafe fn splat(byte: u8) -> Self {
        Self(unsafe { _mm512_set1_epi8(byte as i8) })
    }

    #[inline(always)]
    unsafe fn splat_u64(value: u64) -> Self {
        Self(unsafe { _mm512_set1_epi64(value as i64) })
    }

    #[inline(always)]
    unsafe fn zeroes() -> Self {
        Self(unsafe { _mm512_setzero_si512() })
    }

    #[inline(always)]
    unsafe fn load_aligned(data: *const u8) -> Self {
        debug_assert_eq!(data as usize % 64, 0, "aligned load from unaligned address");
        Self(unsafe { _mm512_load_si512(data as *const __m512i) })
    }

    #[inline(always)]
    unsafe fn load_unaligned(data: *const u8) -> Self {
        Self(unsafe { _mm512_loadu_si512(data as *const __m512i) })
    }

    #[inline(always)]
    unsafe fn store_unaligned(self, out: *mut u8) {
        unsafe { _mm512_storeu_si512(out as *mut __m512i, self.0) }
    }

    #[inline(always)]
    unsafe fn broadcast_table(table: &[u8; 16]) -> Self {
        Self(unsafe { _mm512_broadcast_i32x4(_mm_loadu_si128(table.as_ptr() as *const __m128i)) })
    }

    #[inline(always)]
    unsafe fn and(self, other: Self) -> Self {
        Self(unsafe { _mm512_and_si512(self.0, other.0) })
    }

    #[inline(always)]
    unsafe fn or(self, other: Self) -> Self {
        Self(unsafe { _mm512_or_si512(self.0, other.0) })
    }

    #[inline(always)]
    unsafe fn xor(self, other: Self) -> Self {
        Self(unsafe { _mm512_xor_si512(self.0, other.0) })
    }

    #[inline(always)]
    unsafe fn and_not(self, other: Self) -> Self {
        Self(unsafe { _mm512_andnot_si512(other.0, self.0) })
    }

    #[inline(always)]
    unsafe fn cmpeq(self, other: Self) -> Self {
        Self(unsafe { _mm512_movm_epi8(_mm512_cmpeq_epi8_mask(self.0, other.0)) })
    }

    #[inline(always)]
    unsafe fn cmpgt(self, other: Self) -> Self {
        Self(unsafe { _mm512_movm_epi8(_mm512_cmpgt_epu8_mask(self.0, other.0)) })
    }

    #[inline(always)]
    unsafe fn shr_u16<const N: i32>(self) -> Self {
        unsafe { self.shr_u16_var(N as u32) }
    }

    #[inline(always)]
    unsafe fn shl_u16<const N: i32>(self) -> Self {
        unsafe { self.shl_u16_var(N as u32) }
    }

    #[inline(always)]
    unsafe fn shr_u16_var(self, count: u32) -> Self {
        Self(unsafe { _mm512_srl_epi16(self.0, _mm_cvtsi32_si128(count as i32)) })
    }

    #[inline(always)]
    unsafe fn shl_u16_var(self, count: u32) -> Self {
        Self(unsafe { _mm512_sll_epi16(self.0, _mm_cvtsi32_si128(count as i32)) })
    }

    #[inline(always)]
    unsafe fn byte_shuffle(self, indices: Self) -> Self {
        unsafe {
            let in_range = _mm512_cmplt_epu8_mask(indices.0, _mm512_set1_epi8(16));
            Self(_mm512_maskz_shuffle_epi8(in_range, self.0, indices.0))
        }
    }

    #[inline(always)]
    unsafe fn compare_mask(self) -> u64 {
        unsafe { _mm512_movepi8_mask(self.0) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simd::{to_bytes, Portable};

    fn sample(seed: u8) -> [u8; 64] {
        let mut out = [0u8; 64];
        for (i, b) in out.iter_mut().enumerate() {
            *b = (i as u8).wrapping_mul(37).wrapping_add(seed);
        }
        out
    }

    /// Runs a set of operations on a hardware backend and on the portable
    /// backend of the same width, comparing every result byte.
    unsafe fn check_against_portable<V: SimdVector, const N: usize>() {
        let a_bytes = sample(3);
        let b_bytes = sample(200);
        unsafe {
            let a = V::load_unaligned(a_bytes.as_ptr());
            let b = V::load_unaligned(b_bytes.as_ptr());
            let pa = Portable::<N>::load_unaligned(a_bytes.as_ptr());
            let pb = Portable::<N>::load_unaligned(b_bytes.as_ptr());

            assert_eq!(to_bytes(a.cmpgt(b)), to_bytes(pa.cmpgt(pb)));
            assert_eq!(to_bytes(a.and_not(b)), to_bytes(pa.and_not(pb)));
            assert_eq!(to_bytes(a.shr_u16::<4>()), to_bytes(pa.shr_u16::<4>()));
            assert_eq!(to_bytes(a.shl_u16_var(3)), to_bytes(pa.shl_u16_var(3)));
            assert_eq!(to_bytes(a.byte_shuffle(b)), to_bytes(pa.byte_shuffle(pb)));
            assert_eq!(to_bytes(a.shift_bytes_left::<1>()), to_bytes(pa.shift_bytes_left::<1>()));
            assert_eq!(to_bytes(a.shift_bytes_right::<1>()), to_bytes(pa.shift_bytes_right::<1>()));
            assert_eq!(a.cmpeq(b).compare_mask(), pa.cmpeq(pb).compare_mask());
            for offset in 0..=N {
                assert_eq!(
                    to_bytes(a.align_concat(b, offset)),
                    to_bytes(pa.align_concat(pb, offset)),
                    "align_concat offset {}",
                    offset
                );
            }
        }
    }

    #[test]
    fn test_ssse3_matches_portable() {
        if is_x86_feature_detected!("ssse3") {
            unsafe { check_against_portable::<Ssse3Vector, 16>() };
        }
    }

    #[test]
    fn test_avx2_matches_portable() {
        if is_x86_feature_detected!("avx2") {
            unsafe { check_against_portable::<Avx2Vector, 32>() };
        }
    }

    #[cfg(feature = "avx512")]
    #[test]
    fn test_avx512_matches_portable() {
        if is_x86_feature_detected!("avx512bw") {
            unsafe { check_against_portable::<Avx512Vector, 64>() };
        }
    }
}
