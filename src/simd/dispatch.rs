//! Runtime dispatch of generic kernels to a backend.
//!
//! Kernels are written once as `run::<V>()`. Each hardware tier gets a
//! trampoline compiled with its `#[target_feature]` set, so the
//! `#[inline(always)]` backend methods inline into code that may use the
//! vendor instructions.

use super::{Portable, SimdTier, SimdVector};

/// A scan generic over the vector backend.
pub trait Kernel {
    /// Result of the scan.
    type Output;

    /// Run the scan on backend `V`.
    ///
    /// # Safety
    ///
    /// The instruction set behind `V` must be enabled in the calling context.
    unsafe fn run<V: SimdVector>(self) -> Self::Output;
}

/// Run `kernel` on `tier`, or on the portable backend of the same width when
/// the tier is unavailable.
#[inline]
pub fn dispatch<K: Kernel>(tier: SimdTier, kernel: K) -> K::Output {
    if !tier.is_available() {
        return run_portable(tier.width(), kernel);
    }

    match tier {
        #[cfg(all(target_arch = "x86_64", feature = "avx512"))]
        // SAFETY: availability checked above.
        SimdTier::Avx512 => unsafe { run_avx512(kernel) },
        #[cfg(target_arch = "x86_64")]
        // SAFETY: availability checked above.
        SimdTier::Avx2 => unsafe { run_avx2(kernel) },
        #[cfg(target_arch = "x86_64")]
        // SAFETY: availability checked above.
        SimdTier::Ssse3 => unsafe { run_ssse3(kernel) },
        #[cfg(target_arch = "aarch64")]
        // SAFETY: availability checked above.
        SimdTier::Neon => unsafe { run_neon(kernel) },
        _ => run_portable(tier.width(), kernel),
    }
}

fn run_portable<K: Kernel>(width: usize, kernel: K) -> K::Output {
    // SAFETY: the portable backend uses no vendor instructions.
    unsafe {
        match width {
            64 => kernel.run::<Portable<64>>(),
            32 => kernel.run::<Portable<32>>(),
            _ => kernel.run::<Portable<16>>(),
        }
    }
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "ssse3")]
unsafe fn run_ssse3<K: Kernel>(kernel: K) -> K::Output {
    unsafe { kernel.run::<super::x86::Ssse3Vector>() }
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn run_avx2<K: Kernel>(kernel: K) -> K::Output {
    unsafe { kernel.run::<super::x86::Avx2Vector>() }
}

#[cfg(all(target_arch = "x86_64", feature = "avx512"))]
#[target_feature(enable = "avx512f,avx512bw")]
unsafe fn run_avx512<K: Kernel>(kernel: K) -> K::Output {
    unsafe { kernel.run::<super::x86::Avx512Vector>() }
}

#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "neon")]
unsafe fn run_neon<K: Kernel>(kernel: K) -> K::Output {
    unsafe { kernel.run::<super::neon::NeonVector>() }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Width;

    impl Kernel for Width {
        type Output = (usize, &'static str);

        unsafe fn run<V: SimdVector>(self) -> Self::Output {
            (V::WIDTH, V::NAME)
        }
    }

    #[test]
    fn test_dispatch_reaches_every_available_tier() {
        for tier in SimdTier::available() {
            let (width, name) = dispatch(tier, Width);
            assert_eq!(width, tier.width());
            assert_eq!(name, tier.name());
        }
    }

    #[test]
    fn test_unavailable_tier_falls_back_to_portable() {
        for tier in SimdTier::ALL.into_iter().filter(|t| !t.is_available()) {
            let (width, name) = dispatch(tier, Width);
            assert_eq!(width, tier.width());
            assert!(name.starts_with("portable"));
        }
    }
}
