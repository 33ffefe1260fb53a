//! Backend selection.

use crate::config::ScanConfig;
use crate::error::{Result, ScanError};
use crate::system::cpu_features::{has_cpu_feature, CpuFeature};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A vector backend a scan can run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimdTier {
    /// AVX-512BW, 64-byte registers (requires the `avx512` feature)
    Avx512,
    /// AVX2, 32-byte registers
    Avx2,
    /// SSSE3, 16-byte registers
    Ssse3,
    /// AArch64 NEON, 16-byte registers
    Neon,
    /// Scalar emulation of a 16-byte register
    Portable16,
    /// Scalar emulation of a 32-byte register
    Portable32,
    /// Scalar emulation of a 64-byte register
    Portable64,
}

impl SimdTier {
    /// Every tier, widest hardware backends first.
    pub const ALL: [SimdTier; 7] = [
        SimdTier::Avx512,
        SimdTier::Avx2,
        SimdTier::Ssse3,
        SimdTier::Neon,
        SimdTier::Portable16,
        SimdTier::Portable32,
        SimdTier::Portable64,
    ];

    /// Register width in bytes.
    pub fn width(self) -> usize {
        match self {
            SimdTier::Avx512 | SimdTier::Portable64 => 64,
            SimdTier::Avx2 | SimdTier::Portable32 => 32,
            SimdTier::Ssse3 | SimdTier::Neon | SimdTier::Portable16 => 16,
        }
    }

    /// Short lowercase name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            SimdTier::Avx512 => "avx512",
            SimdTier::Avx2 => "avx2",
            SimdTier::Ssse3 => "ssse3",
            SimdTier::Neon => "neon",
            SimdTier::Portable16 => "portable16",
            SimdTier::Portable32 => "portable32",
            SimdTier::Portable64 => "portable64",
        }
    }

    /// True for the scalar backends.
    pub fn is_portable(self) -> bool {
        matches!(
            self,
            SimdTier::Portable16 | SimdTier::Portable32 | SimdTier::Portable64
        )
    }

    /// Portable tier of the given width (16, 32 or 64).
    pub fn portable(width: usize) -> Option<SimdTier> {
        match width {
            16 => Some(SimdTier::Portable16),
            32 => Some(SimdTier::Portable32),
            64 => Some(SimdTier::Portable64),
            _ => None,
        }
    }

    /// Whether this build and the running CPU support the tier.
    pub fn is_available(self) -> bool {
        match self {
            SimdTier::Avx512 => {
                cfg!(all(target_arch = "x86_64", feature = "avx512"))
                    && has_cpu_feature(CpuFeature::AVX512F)
                    && has_cpu_feature(CpuFeature::AVX512BW)
            }
            SimdTier::Avx2 => cfg!(target_arch = "x86_64") && has_cpu_feature(CpuFeature::AVX2),
            SimdTier::Ssse3 => cfg!(target_arch = "x86_64") && has_cpu_feature(CpuFeature::SSSE3),
            SimdTier::Neon => cfg!(target_arch = "aarch64") && has_cpu_feature(CpuFeature::NEON),
            SimdTier::Portable16 | SimdTier::Portable32 | SimdTier::Portable64 => true,
        }
    }

    /// Every tier usable here. Always contains the three portable tiers.
    pub fn available() -> Vec<SimdTier> {
        Self::ALL.into_iter().filter(|t| t.is_available()).collect()
    }

    /// Widest available hardware tier not wider than `max_width`, or the
    /// 16-byte portable tier.
    pub fn best_available(max_width: usize) -> SimdTier {
        Self::ALL
            .into_iter()
            .find(|t| !t.is_portable() && t.width() <= max_width && t.is_available())
            .unwrap_or(SimdTier::Portable16)
    }

    /// Choose the tier a [`ScanConfig`] asks for.
    ///
    /// A forced tier that is unavailable is an error under `strict_tier` and
    /// falls back to automatic selection otherwise.
    pub fn select(config: &ScanConfig) -> Result<SimdTier> {
        if let Some(forced) = config.forced_tier {
            if forced.is_available() {
                log::debug!("Using forced scan tier {}", forced);
                return Ok(forced);
            }
            if config.strict_tier {
                return Err(ScanError::not_supported(format!(
                    "scan tier {} on this CPU",
                    forced
                )));
            }
            log::warn!("Scan tier {} is not available, selecting automatically", forced);
        }

        let tier = if config.enable_simd {
            Self::best_available(config.max_vector_width)
        } else {
            Self::portable(config.portable_width).ok_or_else(|| {
                ScanError::configuration(format!(
                    "portable width must be 16, 32 or 64, got {}",
                    config.portable_width
                ))
            })?
        };
        log::debug!("Selected scan tier {} ({} bytes)", tier, tier.width());
        Ok(tier)
    }
}

impl fmt::Display for SimdTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SimdTier {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.name() == lower)
            .ok_or_else(|| ScanError::configuration(format!("unknown scan tier '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_portable_tiers_always_available() {
        let tiers = SimdTier::available();
        assert!(tiers.contains(&SimdTier::Portable16));
        assert!(tiers.contains(&SimdTier::Portable32));
        assert!(tiers.contains(&SimdTier::Portable64));
    }

    #[test]
    fn test_best_available_respects_width() {
        assert!(SimdTier::best_available(16).width() <= 16);
        assert!(SimdTier::best_available(32).width() <= 32);
        assert!(!SimdTier::best_available(64).is_portable() || SimdTier::available().len() == 3);
    }

    #[test]
    fn test_parse_and_display() {
        for tier in SimdTier::ALL {
            assert_eq!(tier.name().parse::<SimdTier>().unwrap(), tier);
            assert_eq!(tier.to_string(), tier.name());
        }
        assert_eq!("AVX2".parse::<SimdTier>().unwrap(), SimdTier::Avx2);
        assert!("sse9".parse::<SimdTier>().is_err());
    }

    #[test]
    fn test_select_portable_when_simd_disabled() {
        let config = ScanConfig {
            enable_simd: false,
            portable_width: 32,
            ..ScanConfig::default()
        };
        assert_eq!(SimdTier::select(&config).unwrap(), SimdTier::Portable32);
    }

    #[test]
    fn test_select_forced_tier() {
        let config = ScanConfig {
            forced_tier: Some(SimdTier::Portable64),
            ..ScanConfig::default()
        };
        assert_eq!(SimdTier::select(&config).unwrap(), SimdTier::Portable64);
    }

    #[test]
    fn test_select_strict_unavailable_tier() {
        let missing = SimdTier::ALL.into_iter().find(|t| !t.is_available());
        if let Some(tier) = missing {
            let strict = ScanConfig {
                forced_tier: Some(tier),
                strict_tier: true,
                ..ScanConfig::default()
            };
            assert!(matches!(
                SimdTier::select(&strict),
                Err(ScanError::NotSupported { .. })
            ));

            let lenient = ScanConfig {
                strict_tier: false,
                ..strict
            };
            assert!(SimdTier::select(&lenient).unwrap().is_available());
        }
    }
}
