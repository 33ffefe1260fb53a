//! Portable backend: a plain byte array treated as a register.
//!
//! `Portable<N>` is generic over the register width and defines the reference
//! semantics every hardware backend is tested against.

use super::SimdVector;
use std::fmt;

/// A register of `N` bytes (`N` is 16, 32 or 64) computed with scalar code.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C, align(16))]
pub struct Portable<const N: usize>([u8; N]);

impl<const N: usize> Portable<N> {
    const VALID_WIDTH: () =
        assert!(N == 16 || N == 32 || N == 64, "register width must be 16, 32 or 64");

    /// Wrap a byte array.
    #[inline(always)]
    pub fn from_array(bytes: [u8; N]) -> Self {
        let () = Self::VALID_WIDTH;
        Self(bytes)
    }

    /// The register contents.
    #[inline(always)]
    pub fn to_array(self) -> [u8; N] {
        self.0
    }

    #[inline(always)]
    fn map(self, f: impl Fn(u8) -> u8) -> Self {
        let mut out = self.0;
        for b in out.iter_mut() {
            *b = f(*b);
        }
        Self(out)
    }

    #[inline(always)]
    fn zip(self, other: Self, f: impl Fn(u8, u8) -> u8) -> Self {
        let mut out = self.0;
        for (b, &o) in out.iter_mut().zip(other.0.iter()) {
            *b = f(*b, o);
        }
        Self(out)
    }

    #[inline(always)]
    fn map_u16(self, f: impl Fn(u16) -> u16) -> Self {
        let mut out = self.0;
        for pair in out.chunks_exact_mut(2) {
            let v = f(u16::from_le_bytes([pair[0], pair[1]]));
            pair.copy_from_slice(&v.to_le_bytes());
        }
        Self(out)
    }
}

impl<const N: usize> fmt::Debug for Portable<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Portable<{}>({:02x?})", N, &self.0[..])
    }
}

impl<const N: usize> SimdVector for Portable<N> {
    const WIDTH: usize = N;
    const MASK_WIDTH: u32 = 1;
    const NAME: &'static str = match N {
        16 => "portable16",
        32 => "portable32",
        _ => "portable64",
    };

    #[inline(always)]
    unsafe fn splat(byte: u8) -> Self {
        Self::from_array([byte; N])
    }

    #[inline(always)]
    unsafe fn splat_u64(value: u64) -> Self {
        let mut out = [0u8; N];
        for chunk in out.chunks_exact_mut(8) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        Self::from_array(out)
    }

    #[inline(always)]
    unsafe fn zeroes() -> Self {
        Self::from_array([0u8; N])
    }

    #[inline(always)]
    unsafe fn load_aligned(data: *const u8) -> Self {
        debug_assert_eq!(data as usize % N, 0, "aligned load from unaligned address");
        unsafe { Self::load_unaligned(data) }
    }

    #[inline(always)]
    unsafe fn load_unaligned(data: *const u8) -> Self {
        let mut out = [0u8; N];
        unsafe { std::ptr::copy_nonoverlapping(data, out.as_mut_ptr(), N) };
        Self::from_array(out)
    }

    #[inline(always)]
    unsafe fn store_unaligned(self, out: *mut u8) {
        unsafe { std::ptr::copy_nonoverlapping(self.0.as_ptr(), out, N) };
    }

    #[inline(always)]
    unsafe fn broadcast_table(table: &[u8; 16]) -> Self {
        let mut out = [0u8; N];
        for chunk in out.chunks_exact_mut(16) {
            chunk.copy_from_slice(table);
        }
        Self::from_array(out)
    }

    #[inline(always)]
    unsafe fn and(self, other: Self) -> Self {
        self.zip(other, |a, b| a & b)
    }

    #[inline(always)]
    unsafe fn or(self, other: Self) -> Self {
        self.zip(other, |a, b| a | b)
    }

    #[inline(always)]
    unsafe fn xor(self, other: Self) -> Self {
        self.zip(other, |a, b| a ^ b)
    }

    #[inline(always)]
    unsafe fn and_not(self, other: Self) -> Self {
        self.zip(other, |a, b| a & !b)
    }

    #[inline(always)]
    unsafe fn not(self) -> Self {
        self.map(|a| !a)
    }

    #[inline(always)]
    unsafe fn cmpeq(self, other: Self) -> Self {
        self.zip(other, |a, b| if a == b { 0xFF } else { 0 })
    }

    #[inline(always)]
    unsafe fn cmpgt(self, other: Self) -> Self {
        self.zip(other, |a, b| if a > b { 0xFF } else { 0 })
    }

    #[inline(always)]
    unsafe fn shr_u16<const S: i32>(self) -> Self {
        unsafe { self.shr_u16_var(S as u32) }
    }

    #[inline(always)]
    unsafe fn shl_u16<const S: i32>(self) -> Self {
        unsafe { self.shl_u16_var(S as u32) }
    }

    #[inline(always)]
    unsafe fn shr_u16_var(self, count: u32) -> Self {
        self.map_u16(|v| v.checked_shr(count).unwrap_or(0))
    }

    #[inline(always)]
    unsafe fn shl_u16_var(self, count: u32) -> Self {
        self.map_u16(|v| v.checked_shl(count).unwrap_or(0))
    }

    #[inline(always)]
    unsafe fn shift_bytes_left_var(self, count: usize) -> Self {
        let mut out = [0u8; N];
        if count < N {
            out[count..].copy_from_slice(&self.0[..N - count]);
        }
        Self(out)
    }

    #[inline(always)]
    unsafe fn shift_bytes_right_var(self, count: usize) -> Self {
        let mut out = [0u8; N];
        if count < N {
            out[..N - count].copy_from_slice(&self.0[count..]);
        }
        Self(out)
    }

    #[inline(always)]
    unsafe fn byte_shuffle(self, indices: Self) -> Self {
        let mut out = [0u8; N];
        for (i, (o, &idx)) in out.iter_mut().zip(indices.0.iter()).enumerate() {
            if idx < 16 {
                *o = self.0[(i & !15) + idx as usize];
            }
        }
        Self(out)
    }

    #[inline(always)]
    unsafe fn compare_mask(self) -> u64 {
        self.0
            .iter()
            .enumerate()
            .fold(0u64, |mask, (i, &b)| mask | (((b >> 7) as u64) << i))
    }

    #[inline(always)]
    unsafe fn align_concat(self, low: Self, offset: usize) -> Self {
        debug_assert!(offset <= N);
        let mut out = [0u8; N];
        for (i, o) in out.iter_mut().enumerate() {
            let j = offset + i;
            *o = if j < N { low.0[j] } else { self.0[j - N] };
        }
        Self(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq<const N: usize>() -> Portable<N> {
        let mut bytes = [0u8; N];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = i as u8;
        }
        Portable::from_array(bytes)
    }

    #[test]
    fn test_compare_mask_one_bit_per_lane() {
        unsafe {
            let v = seq::<32>();
            let m = v.cmpeq(Portable::splat(5)).compare_mask();
            assert_eq!(m, 1 << 5);
            let all = v.cmpeq(v).compare_mask();
            assert_eq!(all, u32::MAX as u64);
            let wide = seq::<64>();
            assert_eq!(wide.cmpeq(wide).compare_mask(), u64::MAX);
        }
    }

    #[test]
    fn test_byte_shuffle_clears_on_overflow() {
        unsafe {
            let table = seq::<16>().or(Portable::splat(0x40));
            let mut idx = [0u8; 16];
            idx[0] = 3;
            idx[1] = 15;
            idx[2] = 16;
            idx[3] = 0x80;
            idx[4] = 0x83;
            idx[5] = 0xFF;
            let out = table.byte_shuffle(Portable::from_array(idx)).to_array();
            assert_eq!(out[0], 0x43);
            assert_eq!(out[1], 0x4F);
            assert_eq!(&out[2..6], &[0, 0, 0, 0]);
        }
    }

    #[test]
    fn test_byte_shuffle_is_per_lane() {
        unsafe {
            let table = seq::<32>();
            let out = table.byte_shuffle(Portable::splat(1)).to_array();
            assert_eq!(out[0], 1);
            assert_eq!(out[16], 17);
        }
    }

    #[test]
    fn test_align_concat_and_shifts() {
        unsafe {
            let low = seq::<16>();
            let high = low.or(Portable::splat(0x80));
            assert_eq!(high.align_concat(low, 0), low);
            assert_eq!(high.align_concat(low, 16), high);
            let mid = high.align_concat(low, 15).to_array();
            assert_eq!(mid[0], 15);
            assert_eq!(mid[1], 0x80);

            let left = low.shift_bytes_left::<1>().to_array();
            assert_eq!(left[0], 0);
            assert_eq!(left[1], 0);
            assert_eq!(left[15], 14);

            let right = low.shift_bytes_right::<2>().to_array();
            assert_eq!(right[0], 2);
            assert_eq!(right[13], 15);
            assert_eq!(right[14], 0);
        }
    }

    #[test]
    fn test_u16_shifts_and_unsigned_compare() {
        unsafe {
            let v = Portable::<16>::splat(0xF3);
            let hi_nibbles = v.shr_u16::<4>().and(Portable::splat(0x0F)).to_array();
            assert!(hi_nibbles.iter().all(|&b| b == 0x0F));
            let gt = Portable::<16>::splat(0x90).cmpgt(Portable::splat(0x10)).compare_mask();
            assert_eq!(gt, 0xFFFF);
            let lt = Portable::<16>::splat(0x90).cmplt(Portable::splat(0x10)).compare_mask();
            assert_eq!(lt, 0);
        }
    }

    #[test]
    fn test_splat_u64_little_endian() {
        unsafe {
            let v = Portable::<16>::splat_u64(0x0807_0605_0403_0201).to_array();
            assert_eq!(&v[..8], &[1, 2, 3, 4, 5, 6, 7, 8]);
            assert_eq!(&v[8..], &[1, 2, 3, 4, 5, 6, 7, 8]);
        }
    }
}
