//! # System Integration
//!
//! Runtime CPU feature detection used to pick a scanning backend.

pub mod cpu_features;

pub use cpu_features::{
    get_cpu_features, has_cpu_feature, CpuFeature, CpuFeatureSet, RuntimeCpuFeatures,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_structure() {
        let features = get_cpu_features();
        assert!([0, 16, 32, 64].contains(&features.widest_vector()));
        assert_eq!(has_cpu_feature(CpuFeature::SSE2), features.has_feature(CpuFeature::SSE2));
    }
}
