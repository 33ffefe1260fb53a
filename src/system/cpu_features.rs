//! # CPU Feature Detection
//!
//! Runtime detection of the instruction sets the scan backends need, cached
//! once per process.

use std::collections::HashMap;
use std::sync::OnceLock;

/// CPU feature flags relevant to the vector backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum CpuFeature {
    /// x86 SSE2 (baseline on x86_64)
    SSE2,
    /// x86 SSSE3 (`pshufb`)
    SSSE3,
    /// x86 AVX2
    AVX2,
    /// x86 AVX-512 foundation
    AVX512F,
    /// x86 AVX-512 byte/word
    AVX512BW,
    /// ARM Advanced SIMD
    NEON,
}

/// Detected CPU features with identification strings
#[derive(Debug, Clone)]
pub struct CpuFeatureSet {
    /// Available CPU features
    pub features: HashMap<CpuFeature, bool>,
    /// CPU vendor (GenuineIntel, AuthenticAMD, ARM, ...)
    pub vendor: String,
    /// CPU model name
    pub model: String,
}

impl CpuFeatureSet {
    /// Check if a specific feature is available
    pub fn has_feature(&self, feature: CpuFeature) -> bool {
        self.features.get(&feature).copied().unwrap_or(false)
    }

    /// Widest register, in bytes, a hardware backend can use on this CPU.
    ///
    /// The 64-byte backend also requires the `avx512` cargo feature.
    pub fn widest_vector(&self) -> usize {
        if cfg!(feature = "avx512")
            && self.has_feature(CpuFeature::AVX512F)
            && self.has_feature(CpuFeature::AVX512BW)
        {
            64
        } else if self.has_feature(CpuFeature::AVX2) {
            32
        } else if self.has_feature(CpuFeature::SSSE3) || self.has_feature(CpuFeature::NEON) {
            16
        } else {
            0
        }
    }
}

/// Runtime CPU feature detection interface
#[derive(Debug, Default)]
pub struct RuntimeCpuFeatures;

impl RuntimeCpuFeatures {
    /// Create a new runtime feature detector
    pub fn new() -> Self {
        Self
    }

    /// Detect all available CPU features
    pub fn detect_features(&self) -> CpuFeatureSet {
        let mut features = HashMap::new();

        #[cfg(target_arch = "x86_64")]
        {
            self.detect_x86_features(&mut features);
        }

        #[cfg(target_arch = "aarch64")]
        {
            self.detect_arm_features(&mut features);
        }

        let (vendor, model) = self.get_cpu_info();
        let set = CpuFeatureSet {
            features,
            vendor,
            model,
        };
        log::debug!(
            "Detected CPU {} {} (widest vector {} bytes)",
            set.vendor,
            set.model,
            set.widest_vector()
        );
        set
    }

    /// Feature flags come from the std detection macros, which also check
    /// that the OS saves the wide register state.
    #[cfg(target_arch = "x86_64")]
    fn detect_x86_features(&self, features: &mut HashMap<CpuFeature, bool>) {
        features.insert(CpuFeature::SSE2, is_x86_feature_detected!("sse2"));
        features.insert(CpuFeature::SSSE3, is_x86_feature_detected!("ssse3"));
        features.insert(CpuFeature::AVX2, is_x86_feature_detected!("avx2"));
        features.insert(CpuFeature::AVX512F, is_x86_feature_detected!("avx512f"));
        features.insert(CpuFeature::AVX512BW, is_x86_feature_detected!("avx512bw"));
    }

    #[cfg(target_arch = "aarch64")]
    fn detect_arm_features(&self, features: &mut HashMap<CpuFeature, bool>) {
        features.insert(CpuFeature::NEON, std::arch::is_aarch64_feature_detected!("neon"));
    }

    /// Get CPU vendor and model information
    fn get_cpu_info(&self) -> (String, String) {
        #[cfg(target_arch = "x86_64")]
        {
            let cpuid = raw_cpuid::CpuId::new();
            let vendor = cpuid
                .get_vendor_info()
                .map(|v| v.as_str().to_string())
                .unwrap_or_else(|| "Unknown".to_string());
            let model = cpuid
                .get_processor_brand_string()
                .map(|b| b.as_str().trim().to_string())
                .unwrap_or_else(|| "Unknown".to_string());
            (vendor, model)
        }

        #[cfg(target_arch = "aarch64")]
        {
            let mut vendor = "ARM".to_string();
            let mut model = "Unknown".to_string();
            if let Ok(cpuinfo) = std::fs::read_to_string("/proc/cpuinfo") {
                for line in cpuinfo.lines() {
                    if line.starts_with("CPU implementer") && line.contains("0x51") {
                        vendor = "Qualcomm".to_string();
                    } else if line.starts_with("model name") {
                        if let Some(name) = line.split(':').nth(1) {
                            model = name.trim().to_string();
                        }
                    }
                }
            }
            (vendor, model)
        }

        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
        {
            ("Unknown".to_string(), "Unknown".to_string())
        }
    }
}

static CPU_FEATURES: OnceLock<CpuFeatureSet> = OnceLock::new();

/// Get the global CPU feature set (detected once on first call)
pub fn get_cpu_features() -> &'static CpuFeatureSet {
    CPU_FEATURES.get_or_init(|| RuntimeCpuFeatures::new().detect_features())
}

/// Check if a specific CPU feature is available
pub fn has_cpu_feature(feature: CpuFeature) -> bool {
    get_cpu_features().has_feature(feature)
}
