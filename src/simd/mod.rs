//! # Vector Abstraction
//!
//! A fixed-width SIMD register interface shared by every scan kernel. The
//! algorithms in [`crate::scan`] and [`crate::noodle`] are written once against
//! [`SimdVector`] and monomorphized per backend:
//!
//! | backend | width | mask width | selected by |
//! |---|---|---|---|
//! | [`Portable<16>`], [`Portable<32>`], [`Portable<64>`] | 16/32/64 | 1 | always available |
//! | `Ssse3Vector` | 16 | 1 | x86_64 with SSSE3 |
//! | `Avx2Vector` | 32 | 1 | x86_64 with AVX2 |
//! | `Avx512Vector` | 64 | 1 | x86_64 with AVX-512BW, `avx512` feature |
//! | `NeonVector` | 16 | 4 | aarch64 |
//!
//! Every backend must produce the same logical result for the same inputs.
//! The one operation where native instructions disagree, [`SimdVector::byte_shuffle`],
//! has its overflow behavior pinned down here and fixed up inside each backend.

use std::fmt;

pub mod dispatch;
pub mod matching;
pub mod portable;
pub mod tier;

#[cfg(target_arch = "x86_64")]
pub mod x86;

#[cfg(target_arch = "aarch64")]
pub mod neon;

pub use dispatch::{dispatch, Kernel};
pub use matching::{
    first_non_zero_match, first_set_lane, first_zero_match_inverted, last_non_zero_match,
    last_set_lane, last_zero_match_inverted, lane_range, lanes_below, SetLanes,
};
pub use portable::Portable;
pub use tier::SimdTier;

/// Largest register width of any backend, in bytes.
pub const MAX_VECTOR_WIDTH: usize = 64;

/// A SIMD register of `WIDTH` bytes.
///
/// Byte lanes are numbered from 0 at the lowest address. "Left" byte shifts
/// move lanes toward higher indices (the x86 `pslldq` direction).
///
/// # Safety
///
/// All methods are unsafe since they are implemented with vendor intrinsics.
/// Callers must ensure that the instruction set of the implementing backend is
/// enabled in the calling context and supported by the running CPU. Backends
/// mark their methods `#[inline(always)]` rather than `#[target_feature]` so
/// they inline into the feature-enabled trampolines of [`dispatch`].
pub trait SimdVector: Copy + fmt::Debug {
    /// Register width in bytes.
    const WIDTH: usize;
    /// Bits per lane produced by [`compare_mask`](Self::compare_mask).
    const MASK_WIDTH: u32;
    /// Short backend name for logs and benchmark labels.
    const NAME: &'static str;

    /// Every byte lane set to `byte`.
    unsafe fn splat(byte: u8) -> Self;

    /// Every 64-bit lane set to `value` (little-endian byte order).
    unsafe fn splat_u64(value: u64) -> Self;

    /// All lanes zero.
    unsafe fn zeroes() -> Self;

    /// All lanes 0xFF.
    #[inline(always)]
    unsafe fn ones() -> Self {
        unsafe { Self::splat(0xFF) }
    }

    /// Load `WIDTH` bytes from an address aligned to `WIDTH`.
    ///
    /// # Safety
    ///
    /// `data` must be valid for `WIDTH` reads and aligned to `WIDTH`.
    unsafe fn load_aligned(data: *const u8) -> Self;

    /// Load `WIDTH` bytes from any address.
    ///
    /// # Safety
    ///
    /// `data` must be valid for `WIDTH` reads.
    unsafe fn load_unaligned(data: *const u8) -> Self;

    /// Load up to `WIDTH` bytes, zero filling the remaining lanes.
    #[inline(always)]
    unsafe fn load_partial(bytes: &[u8]) -> Self {
        debug_assert!(bytes.len() <= Self::WIDTH);
        let mut tmp = [0u8; MAX_VECTOR_WIDTH];
        let len = bytes.len().min(Self::WIDTH);
        tmp[..len].copy_from_slice(&bytes[..len]);
        unsafe { Self::load_unaligned(tmp.as_ptr()) }
    }

    /// Store `WIDTH` bytes to any address.
    ///
    /// # Safety
    ///
    /// `out` must be valid for `WIDTH` writes.
    unsafe fn store_unaligned(self, out: *mut u8);

    /// A 16-byte lookup table repeated into every 128-bit lane.
    unsafe fn broadcast_table(table: &[u8; 16]) -> Self;

    /// Bitwise AND.
    unsafe fn and(self, other: Self) -> Self;
    /// Bitwise OR.
    unsafe fn or(self, other: Self) -> Self;
    /// Bitwise XOR.
    unsafe fn xor(self, other: Self) -> Self;
    /// `self & !other`.
    unsafe fn and_not(self, other: Self) -> Self;

    /// Bitwise NOT.
    #[inline(always)]
    unsafe fn not(self) -> Self {
        unsafe { self.xor(Self::ones()) }
    }

    /// 0xFF in lanes where the bytes are equal.
    unsafe fn cmpeq(self, other: Self) -> Self;

    /// 0xFF in lanes where `self` is greater, comparing unsigned bytes.
    unsafe fn cmpgt(self, other: Self) -> Self;

    /// 0xFF in lanes where `self` is smaller, comparing unsigned bytes.
    #[inline(always)]
    unsafe fn cmplt(self, other: Self) -> Self {
        unsafe { other.cmpgt(self) }
    }

    /// Logical right shift of each 16-bit lane by an immediate.
    unsafe fn shr_u16<const N: i32>(self) -> Self;
    /// Left shift of each 16-bit lane by an immediate.
    unsafe fn shl_u16<const N: i32>(self) -> Self;
    /// Logical right shift of each 16-bit lane by a runtime count.
    unsafe fn shr_u16_var(self, count: u32) -> Self;
    /// Left shift of each 16-bit lane by a runtime count.
    unsafe fn shl_u16_var(self, count: u32) -> Self;

    /// Move every byte `N` lanes up, filling the low lanes with zero.
    #[inline(always)]
    unsafe fn shift_bytes_left<const N: i32>(self) -> Self {
        unsafe { self.shift_bytes_left_var(N as usize) }
    }

    /// Move every byte `N` lanes down, filling the high lanes with zero.
    #[inline(always)]
    unsafe fn shift_bytes_right<const N: i32>(self) -> Self {
        unsafe { self.shift_bytes_right_var(N as usize) }
    }

    /// Runtime variant of [`shift_bytes_left`](Self::shift_bytes_left).
    #[inline(always)]
    unsafe fn shift_bytes_left_var(self, count: usize) -> Self {
        if count >= Self::WIDTH {
            return unsafe { Self::zeroes() };
        }
        unsafe { self.align_concat(Self::zeroes(), Self::WIDTH - count) }
    }

    /// Runtime variant of [`shift_bytes_right`](Self::shift_bytes_right).
    #[inline(always)]
    unsafe fn shift_bytes_right_var(self, count: usize) -> Self {
        if count >= Self::WIDTH {
            return unsafe { Self::zeroes() };
        }
        unsafe { Self::zeroes().align_concat(self, count) }
    }

    /// Table lookup within each 16-byte lane: lane `i` of the result is
    /// `self[16 * (i / 16) + indices[i]]`, or zero when `indices[i] >= 16`
    /// (which includes every index with the high bit set).
    unsafe fn byte_shuffle(self, indices: Self) -> Self;

    /// Reduce a 0x00/0xFF register to `MASK_WIDTH` bits per lane.
    unsafe fn compare_mask(self) -> u64;

    /// [`compare_mask`](Self::compare_mask) of an equality compare.
    #[inline(always)]
    unsafe fn eq_mask(self, other: Self) -> u64 {
        unsafe { self.cmpeq(other).compare_mask() }
    }

    /// Normalize a comparison mask to exactly one set bit per matching lane.
    #[inline(always)]
    fn iteration_mask(mask: u64) -> u64 {
        mask
    }

    /// The `WIDTH` bytes starting at `offset` of the concatenation
    /// `low ++ self` (`low` occupies the lower addresses).
    ///
    /// `offset == 0` yields `low`, `offset == WIDTH` yields `self`.
    #[inline(always)]
    unsafe fn align_concat(self, low: Self, offset: usize) -> Self {
        unsafe { spill_align_concat(self, low, offset) }
    }
}

/// [`SimdVector::align_concat`] through a stack buffer; any backend can use it.
#[inline(always)]
pub(crate) unsafe fn spill_align_concat<V: SimdVector>(high: V, low: V, offset: usize) -> V {
    debug_assert!(offset <= V::WIDTH);
    let mut buf = [0u8; 2 * MAX_VECTOR_WIDTH];
    let offset = offset.min(V::WIDTH);
    unsafe {
        low.store_unaligned(buf.as_mut_ptr());
        high.store_unaligned(buf.as_mut_ptr().add(V::WIDTH));
        V::load_unaligned(buf.as_ptr().add(offset))
    }
}

/// Copy a register into a byte vector. Test and debugging helper.
///
/// # Safety
///
/// Same contract as every [`SimdVector`] method: the backend's instruction
/// set must be usable in the calling context.
pub unsafe fn to_bytes<V: SimdVector>(v: V) -> Vec<u8> {
    let mut buf = [0u8; MAX_VECTOR_WIDTH];
    unsafe { v.store_unaligned(buf.as_mut_ptr()) };
    buf[..V::WIDTH].to_vec()
}
