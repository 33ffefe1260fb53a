//! Scan backend configuration.

use super::{parse_env_bool, parse_env_var, Config, ValidationError};
use crate::error::{Result, ScanError};
use crate::scan::charclass::ClassStrategy;
use crate::simd::SimdTier;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Controls which vector backend the scanner uses and how character classes
/// are encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Use hardware backends. When false the portable backend is used.
    pub enable_simd: bool,
    /// Widest register (16, 32 or 64 bytes) automatic selection may pick
    pub max_vector_width: usize,
    /// Register width of the portable backend when SIMD is disabled
    pub portable_width: usize,
    /// Tier to use instead of automatic selection
    pub forced_tier: Option<SimdTier>,
    /// Fail instead of falling back when `forced_tier` is unavailable
    pub strict_tier: bool,
    /// Character-class encoding
    pub class_strategy: ClassStrategy,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            enable_simd: true,
            max_vector_width: 64,
            portable_width: 16,
            forced_tier: None,
            strict_tier: false,
            class_strategy: ClassStrategy::Auto,
        }
    }
}

fn is_register_width(width: usize) -> bool {
    matches!(width, 16 | 32 | 64)
}

impl ScanConfig {
    /// Tier this configuration selects on the running machine.
    pub fn tier(&self) -> Result<SimdTier> {
        SimdTier::select(self)
    }
}

impl Config for ScanConfig {
    fn validate(&self) -> Result<()> {
        if !is_register_width(self.max_vector_width) {
            let err = ValidationError::new(
                "max_vector_width",
                &self.max_vector_width.to_string(),
                "not a register width",
            )
            .with_suggestion("16, 32, 64");
            return Err(err.into());
        }
        if !is_register_width(self.portable_width) {
            let err = ValidationError::new(
                "portable_width",
                &self.portable_width.to_string(),
                "not a register width",
            )
            .with_suggestion("16, 32, 64");
            return Err(err.into());
        }
        if self.strict_tier && self.forced_tier.is_none() {
            let err = ValidationError::new("strict_tier", "true", "requires forced_tier to be set");
            return Err(err.into());
        }
        Ok(())
    }

    fn from_env_with_prefix(prefix: &str) -> Result<Self> {
        let mut config = Self::default();
        config.enable_simd = parse_env_bool(&format!("{}SCAN_SIMD", prefix), config.enable_simd);
        config.max_vector_width =
            parse_env_var(&format!("{}SCAN_MAX_WIDTH", prefix), config.max_vector_width);
        config.portable_width =
            parse_env_var(&format!("{}SCAN_PORTABLE_WIDTH", prefix), config.portable_width);
        if let Ok(tier) = std::env::var(format!("{}SCAN_TIER", prefix)) {
            config.forced_tier = Some(tier.parse()?);
        }
        config.strict_tier =
            parse_env_bool(&format!("{}SCAN_STRICT_TIER", prefix), config.strict_tier);
        if let Ok(strategy) = std::env::var(format!("{}SCAN_CLASS_STRATEGY", prefix)) {
            config.class_strategy = strategy.parse()?;
        }
        config.validate()?;
        Ok(config)
    }

    fn performance_preset() -> Self {
        Self::default()
    }

    fn memory_preset() -> Self {
        Self {
            enable_simd: false,
            portable_width: 16,
            class_strategy: ClassStrategy::Shufti,
            ..Self::default()
        }
    }

    fn realtime_preset() -> Self {
        // 32-byte registers avoid AVX-512 frequency transitions.
        Self {
            max_vector_width: 32,
            ..Self::default()
        }
    }

    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)
            .map_err(|e| {
                ScanError::configuration(format!("Failed to serialize scan config: {}", e))
            })?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| {
                ScanError::configuration(format!("Failed to parse scan config file: {}", e))
            })?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ScanConfig::default();
        assert!(config.validate().is_ok());
        assert!(ScanConfig::performance_preset().validate().is_ok());
        assert!(ScanConfig::memory_preset().validate().is_ok());
        assert!(ScanConfig::realtime_preset().validate().is_ok());
        assert_eq!(ScanConfig::balanced_preset(), config);
    }

    #[test]
    fn test_rejects_bad_widths() {
        let config = ScanConfig {
            max_vector_width: 48,
            ..ScanConfig::default()
        };
        match config.validate() {
            Err(ScanError::InvalidField(e)) => {
                assert_eq!(e.field, "max_vector_width");
                assert_eq!(e.value, "48");
                assert_eq!(e.suggestion.as_deref(), Some("16, 32, 64"));
            }
            other => panic!("unexpected result {:?}", other),
        }

        let config = ScanConfig {
            portable_width: 8,
            ..ScanConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ScanError::InvalidField(ref e)) if e.field == "portable_width"
        ));
    }

    #[test]
    fn test_strict_requires_forced_tier() {
        let config = ScanConfig {
            strict_tier: true,
            ..ScanConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ScanError::InvalidField(ref e)) if e.field == "strict_tier"
        ));
    }

    #[test]
    fn test_memory_preset_selects_portable() {
        let tier = ScanConfig::memory_preset().tier().unwrap();
        assert_eq!(tier, SimdTier::Portable16);
    }

    #[test]
    fn test_realtime_preset_caps_width() {
        assert!(ScanConfig::realtime_preset().tier().unwrap().width() <= 32);
    }

    #[test]
    fn test_from_env_with_prefix() {
        std::env::set_var("LSTEST_ENV_SCAN_TIER", "portable32");
        std::env::set_var("LSTEST_ENV_SCAN_CLASS_STRATEGY", "truffle");
        std::env::set_var("LSTEST_ENV_SCAN_MAX_WIDTH", "32");

        let config = ScanConfig::from_env_with_prefix("LSTEST_ENV_").unwrap();
        assert_eq!(config.forced_tier, Some(SimdTier::Portable32));
        assert_eq!(config.class_strategy, ClassStrategy::Truffle);
        assert_eq!(config.max_vector_width, 32);

        std::env::set_var("LSTEST_ENV_SCAN_TIER", "mmx");
        assert!(ScanConfig::from_env_with_prefix("LSTEST_ENV_").is_err());

        std::env::remove_var("LSTEST_ENV_SCAN_TIER");
        std::env::remove_var("LSTEST_ENV_SCAN_CLASS_STRATEGY");
        std::env::remove_var("LSTEST_ENV_SCAN_MAX_WIDTH");
    }
}
