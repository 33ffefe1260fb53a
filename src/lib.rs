//! # Lanescan: SIMD Byte-Stream Scanning Kernels
//!
//! This crate provides the low-level scanning layer of a literal and
//! character-class matcher: given a byte buffer and a small predicate, find
//! the first or last position where it holds, or report every occurrence of
//! a short literal through a callback.
//!
//! ## Key Features
//!
//! - **Vector abstraction**: one register interface over 16, 32 and 64 byte
//!   widths with SSSE3, AVX2, AVX-512BW, NEON and portable backends
//! - **Vermicelli**: single bytes and byte pairs, caseless, masked and negated
//! - **Shufti / Truffle**: character classes through nibble lookup tables
//! - **Verm16**: exact membership in up to 16 bytes
//! - **Noodle**: every occurrence of a 1 to 8 byte literal, block or streaming
//! - **Runtime dispatch**: kernels are written once and run on the widest
//!   tier the CPU supports
//!
//! ## Quick Start
//!
//! ```rust
//! use lanescan::{ByteScanner, ByteSet, MatchFlow, NoodleTable};
//!
//! let scanner = ByteScanner::new();
//!
//! // Single bytes and pairs
//! assert_eq!(scanner.find_byte(b"key=value", b'=', false), Some(3));
//! assert_eq!(scanner.find_pair(b"a\r\nb", b'\r', b'\n', false), Some(1));
//!
//! // Character classes
//! let digits = scanner.compile_class(&ByteSet::from_range(b'0'..=b'9')).unwrap();
//! assert_eq!(scanner.find_class(b"abc123", &digits), Some(3));
//!
//! // Literal occurrences, reported by end offset
//! let table = NoodleTable::new(b"ab", true, 1).unwrap();
//! let mut ends = Vec::new();
//! scanner
//!     .scan_literal(b"ab AB aB", &table, 0, |end, _id| {
//!         ends.push(end);
//!         MatchFlow::Continue
//!     })
//!     .unwrap();
//! assert_eq!(ends, vec![1, 4, 7]);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod config;
pub mod error;
pub mod noodle;
pub mod scan;
pub mod scanner;
pub mod simd;
pub mod system;

// Re-export core types
pub use config::{Config, ScanConfig};
pub use error::{Result, ScanError};
pub use noodle::{MatchFlow, NoodleTable, ScanStatus};
pub use scan::{
    ByteSet, ClassPairScanner, ClassScanner, ClassStrategy, DoubleShuftiMask, DoubleTruffleMask,
    DoubleVermicelli, MaskedDoubleVermicelli, ShuftiMask, TruffleMask, Verm16, Vermicelli,
};
pub use scanner::{get_global_scanner, ByteScanner};
pub use simd::{SimdTier, SimdVector};
pub use system::{get_cpu_features, CpuFeature, CpuFeatureSet};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Check if a hardware SIMD backend is available on this CPU
pub fn has_simd_support() -> bool {
    !SimdTier::best_available(simd::MAX_VECTOR_WIDTH).is_portable()
}

/// Initialize the library: detects CPU features and logs the selected tier
pub fn init() {
    let features = get_cpu_features();
    log::debug!(
        "Initializing lanescan v{} ({} vendor, widest vector {} bytes, tier {})",
        VERSION,
        features.vendor,
        features.widest_vector(),
        get_global_scanner().tier()
    );
}
