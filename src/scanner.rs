//! High-level byte scanning facade
//!
//! [`ByteScanner`] binds a [`SimdTier`] and a [`ClassStrategy`] once and
//! exposes every kernel with `Option` results. The descriptor types in
//! [`crate::scan`] and [`crate::noodle`] remain available for callers that
//! want to build tables once and keep the kernel-level conventions (forward
//! scans returning the haystack length on a miss, the partial pair rule).
//!
//! ## Example
//!
//! ```rust
//! use lanescan::ByteScanner;
//!
//! let scanner = ByteScanner::new();
//! assert_eq!(scanner.find_byte(b"hello world", b'o', false), Some(4));
//! assert_eq!(scanner.rfind_byte(b"hello world", b'O', true), Some(7));
//! assert_eq!(scanner.find_pair(b"hello world", b'l', b'd', false), Some(9));
//! ```

use std::ops::Range;

use crate::config::{Config, ScanConfig};
use crate::error::{check_range, Result, ScanError};
use crate::noodle::{MatchFlow, NoodleTable, ScanStatus};
use crate::scan::verm16::VERM16_CANDIDATES;
use crate::scan::{
    self, ByteSet, ClassPairScanner, ClassScanner, ClassStrategy, DoubleVermicelli, Verm16,
    Vermicelli,
};
use crate::simd::{SimdTier, MAX_VECTOR_WIDTH};

/// Byte scanning with a fixed backend tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteScanner {
    /// Backend used by every scan
    tier: SimdTier,
    /// Encoding for character classes
    class_strategy: ClassStrategy,
}

impl ByteScanner {
    /// Creates a scanner on the widest tier this CPU supports
    pub fn new() -> Self {
        let tier = SimdTier::best_available(MAX_VECTOR_WIDTH);
        log::debug!("ByteScanner using {} tier", tier);
        Self::with_tier(tier)
    }

    /// Creates a scanner on an explicit tier
    ///
    /// An unavailable tier still works: scans fall back to the portable
    /// backend of the same width.
    pub fn with_tier(tier: SimdTier) -> Self {
        Self {
            tier,
            class_strategy: ClassStrategy::Auto,
        }
    }

    /// Creates a scanner from a validated configuration
    pub fn from_config(config: &ScanConfig) -> Result<Self> {
        config.validate()?;
        let tier = config.tier()?;
        log::debug!(
            "ByteScanner configured with {} tier, {} class strategy",
            tier,
            config.class_strategy
        );
        Ok(Self {
            tier,
            class_strategy: config.class_strategy,
        })
    }

    /// Returns the selected tier
    pub fn tier(&self) -> SimdTier {
        self.tier
    }

    /// Returns the character class strategy
    pub fn class_strategy(&self) -> ClassStrategy {
        self.class_strategy
    }

    /// Replaces the character class strategy
    pub fn with_class_strategy(mut self, strategy: ClassStrategy) -> Self {
        self.class_strategy = strategy;
        self
    }

    // ------------------------------------------------------------------
    // Single bytes
    // ------------------------------------------------------------------

    /// First occurrence of `byte`
    pub fn find_byte(&self, haystack: &[u8], byte: u8, nocase: bool) -> Option<usize> {
        scan::first(self.tier, &Vermicelli::new(byte, nocase), haystack)
    }

    /// First occurrence of `byte` inside `range`, as an offset into `haystack`
    pub fn find_byte_in(
        &self,
        haystack: &[u8],
        range: Range<usize>,
        byte: u8,
        nocase: bool,
    ) -> Result<Option<usize>> {
        check_range(range.start, range.end, haystack.len())?;
        let found = self.find_byte(&haystack[range.clone()], byte, nocase);
        Ok(found.map(|i| range.start + i))
    }

    /// Last occurrence of `byte`
    pub fn rfind_byte(&self, haystack: &[u8], byte: u8, nocase: bool) -> Option<usize> {
        Vermicelli::new(byte, nocase).rfind(self.tier, haystack)
    }

    /// First byte that is not `byte`
    pub fn find_not_byte(&self, haystack: &[u8], byte: u8, nocase: bool) -> Option<usize> {
        scan::first_not(self.tier, &Vermicelli::new(byte, nocase), haystack)
    }

    /// Last byte that is not `byte`
    pub fn rfind_not_byte(&self, haystack: &[u8], byte: u8, nocase: bool) -> Option<usize> {
        Vermicelli::new(byte, nocase).rfind_not(self.tier, haystack)
    }

    // ------------------------------------------------------------------
    // Byte pairs
    // ------------------------------------------------------------------

    /// Offset of `first` in the first occurrence of `first` followed by `second`
    pub fn find_pair(&self, haystack: &[u8], first: u8, second: u8, nocase: bool) -> Option<usize> {
        scan::first_pair(self.tier, &DoubleVermicelli::new(first, second, nocase), haystack)
    }

    /// Offset of `first` in the last occurrence of `first` followed by `second`
    pub fn rfind_pair(
        &self,
        haystack: &[u8],
        first: u8,
        second: u8,
        nocase: bool,
    ) -> Option<usize> {
        scan::last_pair(self.tier, &DoubleVermicelli::new(first, second, nocase), haystack)
    }

    // ------------------------------------------------------------------
    // Byte sets and classes
    // ------------------------------------------------------------------

    /// First byte that is any of `bytes`
    ///
    /// Up to 16 distinct bytes use the exact candidate kernel; larger sets are
    /// compiled as a character class.
    pub fn find_any(&self, haystack: &[u8], bytes: &[u8]) -> Result<Option<usize>> {
        let set = ByteSet::from_bytes(bytes);
        if set.len() <= VERM16_CANDIDATES {
            return Ok(scan::first(self.tier, &Verm16::from_class(&set)?, haystack));
        }
        Ok(self.find_class(haystack, &self.compile_class(&set)?))
    }

    /// Last byte that is any of `bytes`
    pub fn rfind_any(&self, haystack: &[u8], bytes: &[u8]) -> Result<Option<usize>> {
        let set = ByteSet::from_bytes(bytes);
        if set.len() <= VERM16_CANDIDATES {
            return Ok(Verm16::from_class(&set)?.rfind(self.tier, haystack));
        }
        Ok(self.rfind_class(haystack, &self.compile_class(&set)?))
    }

    /// Encodes `class` with the configured strategy
    pub fn compile_class(&self, class: &ByteSet) -> Result<ClassScanner> {
        ClassScanner::new(class, self.class_strategy)
    }

    /// Encodes a pair of adjacent classes with the configured strategy
    pub fn compile_class_pair(
        &self,
        first: &ByteSet,
        second: &ByteSet,
    ) -> Result<ClassPairScanner> {
        ClassPairScanner::new(first, second, self.class_strategy)
    }

    /// First byte in the class
    pub fn find_class(&self, haystack: &[u8], class: &ClassScanner) -> Option<usize> {
        Some(class.find(self.tier, haystack)).filter(|&i| i < haystack.len())
    }

    /// Last byte in the class
    pub fn rfind_class(&self, haystack: &[u8], class: &ClassScanner) -> Option<usize> {
        class.rfind(self.tier, haystack)
    }

    /// First byte outside the class
    pub fn find_not_class(&self, haystack: &[u8], class: &ClassScanner) -> Option<usize> {
        Some(class.find_not(self.tier, haystack)).filter(|&i| i < haystack.len())
    }

    /// Last byte outside the class
    pub fn rfind_not_class(&self, haystack: &[u8], class: &ClassScanner) -> Option<usize> {
        class.rfind_not(self.tier, haystack)
    }

    /// Offset of the first byte of the first matching class pair
    pub fn find_class_pair(&self, haystack: &[u8], pair: &ClassPairScanner) -> Option<usize> {
        Some(pair.find(self.tier, haystack)).filter(|&i| i < haystack.len())
    }

    /// Offset of the first byte of the last matching class pair
    pub fn rfind_class_pair(&self, haystack: &[u8], pair: &ClassPairScanner) -> Option<usize> {
        pair.rfind(self.tier, haystack)
    }

    // ------------------------------------------------------------------
    // Literals
    // ------------------------------------------------------------------

    /// Reports every occurrence of `table`'s literal at or after `start`
    ///
    /// Fails when `start` is past the end of `haystack`.
    pub fn scan_literal<F>(
        &self,
        haystack: &[u8],
        table: &NoodleTable,
        start: usize,
        on_match: F,
    ) -> Result<ScanStatus>
    where
        F: FnMut(usize, u32) -> MatchFlow,
    {
        if start > haystack.len() {
            return Err(ScanError::out_of_bounds(start, haystack.len()));
        }
        Ok(table.scan(self.tier, haystack, start, on_match))
    }

    /// Streaming variant of [`scan_literal`](Self::scan_literal)
    pub fn scan_literal_streaming<F>(
        &self,
        history: &[u8],
        haystack: &[u8],
        table: &NoodleTable,
        on_match: F,
    ) -> ScanStatus
    where
        F: FnMut(usize, u32) -> MatchFlow,
    {
        table.scan_streaming(self.tier, history, haystack, on_match)
    }

    /// End offsets of every occurrence of `literal` (1 to 8 bytes)
    pub fn find_literal_ends(
        &self,
        haystack: &[u8],
        literal: &[u8],
        nocase: bool,
    ) -> Result<Vec<usize>> {
        let table = NoodleTable::new(literal, nocase, 0)?;
        let mut ends = Vec::new();
        table.scan(self.tier, haystack, 0, |end, _| {
            ends.push(end);
            MatchFlow::Continue
        });
        Ok(ends)
    }
}

impl Default for ByteScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Global scanner instance for reuse
static GLOBAL_SCANNER: std::sync::OnceLock<ByteScanner> = std::sync::OnceLock::new();

/// Gets the global scanner, configured from the environment on first use
///
/// An invalid environment configuration is logged and replaced by the
/// detected defaults.
pub fn get_global_scanner() -> &'static ByteScanner {
    GLOBAL_SCANNER.get_or_init(|| {
        let config = ScanConfig::from_env().unwrap_or_else(|e| {
            log::warn!("Ignoring scan configuration from environment: {}", e);
            ScanConfig::default()
        });
        ByteScanner::from_config(&config).unwrap_or_else(|e| {
            log::warn!("Falling back to detected tier: {}", e);
            ByteScanner::new()
        })
    })
}

/// Convenience function for single-byte search using the global scanner
pub fn find_byte(haystack: &[u8], byte: u8) -> Option<usize> {
    get_global_scanner().find_byte(haystack, byte, false)
}

/// Convenience function for reverse single-byte search using the global scanner
pub fn rfind_byte(haystack: &[u8], byte: u8) -> Option<usize> {
    get_global_scanner().rfind_byte(haystack, byte, false)
}

/// Convenience function for byte-pair search using the global scanner
pub fn find_pair(haystack: &[u8], first: u8, second: u8) -> Option<usize> {
    get_global_scanner().find_pair(haystack, first, second, false)
}

/// Convenience function for byte-set search using the global scanner
pub fn find_any(haystack: &[u8], bytes: &[u8]) -> Result<Option<usize>> {
    get_global_scanner().find_any(haystack, bytes)
}
