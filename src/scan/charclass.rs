//! Character classes and encoding strategy.

use super::shufti::{DoubleShuftiMask, ShuftiMask};
use super::truffle::{DoubleTruffleMask, TruffleMask};
use super::{first, first_not, first_pair, last, last_not, last_pair};
use crate::error::{Result, ScanError};
use crate::simd::SimdTier;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// A set of byte values, one bit per value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ByteSet([u64; 4]);

impl ByteSet {
    /// The empty set.
    pub const fn new() -> Self {
        Self([0; 4])
    }

    /// All 256 byte values.
    pub const fn full() -> Self {
        Self([u64::MAX; 4])
    }

    /// Set containing exactly `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        bytes.iter().copied().collect()
    }

    /// Set containing every byte in `range`.
    pub fn from_range(range: RangeInclusive<u8>) -> Self {
        range.collect()
    }

    /// Add a byte.
    #[inline]
    pub fn insert(&mut self, byte: u8) {
        self.0[(byte >> 6) as usize] |= 1 << (byte & 63);
    }

    /// Remove a byte.
    #[inline]
    pub fn remove(&mut self, byte: u8) {
        self.0[(byte >> 6) as usize] &= !(1 << (byte & 63));
    }

    /// Membership test.
    #[inline]
    pub fn contains(&self, byte: u8) -> bool {
        self.0[(byte >> 6) as usize] & (1 << (byte & 63)) != 0
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// True when no byte is a member.
    pub fn is_empty(&self) -> bool {
        self.0 == [0; 4]
    }

    /// True when every byte is a member.
    pub fn is_full(&self) -> bool {
        self.0 == [u64::MAX; 4]
    }

    /// Bytes not in the set.
    pub fn complement(&self) -> Self {
        Self([!self.0[0], !self.0[1], !self.0[2], !self.0[3]])
    }

    /// Members of either set.
    pub fn union(&self, other: &Self) -> Self {
        Self([
            self.0[0] | other.0[0],
            self.0[1] | other.0[1],
            self.0[2] | other.0[2],
            self.0[3] | other.0[3],
        ])
    }

    /// The set with both cases of every ASCII letter member.
    pub fn case_folded(&self) -> Self {
        let mut out = *self;
        for b in self.iter().filter(u8::is_ascii_alphabetic) {
            out.insert(b.to_ascii_lowercase());
            out.insert(b.to_ascii_uppercase());
        }
        out
    }

    /// Members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=255u8).filter(move |&b| self.contains(b))
    }
}

impl FromIterator<u8> for ByteSet {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut set = Self::new();
        for b in iter {
            set.insert(b);
        }
        set
    }
}

impl fmt::Debug for ByteSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.iter().map(|b| std::ascii::escape_default(b).to_string()))
            .finish()
    }
}

/// How a character class is encoded for scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassStrategy {
    /// Shufti when the class fits in 8 buckets, Truffle otherwise
    #[default]
    Auto,
    /// Always Shufti; classes needing more than 8 buckets are rejected
    Shufti,
    /// Always Truffle
    Truffle,
}

impl fmt::Display for ClassStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ClassStrategy::Auto => "auto",
            ClassStrategy::Shufti => "shufti",
            ClassStrategy::Truffle => "truffle",
        })
    }
}

impl FromStr for ClassStrategy {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(ClassStrategy::Auto),
            "shufti" => Ok(ClassStrategy::Shufti),
            "truffle" => Ok(ClassStrategy::Truffle),
            _ => Err(ScanError::configuration(format!("unknown class strategy '{}'", s))),
        }
    }
}

/// A character class encoded with one of the class kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassScanner {
    /// Nibble-bucket tables
    Shufti(ShuftiMask),
    /// High-bit split tables
    Truffle(TruffleMask),
}

impl ClassScanner {
    /// Encode `class` with `strategy`.
    pub fn new(class: &ByteSet, strategy: ClassStrategy) -> Result<Self> {
        let scanner = match strategy {
            ClassStrategy::Shufti => ClassScanner::Shufti(ShuftiMask::from_class(class)?),
            ClassStrategy::Truffle => ClassScanner::Truffle(TruffleMask::from_class(class)),
            ClassStrategy::Auto => match ShuftiMask::from_class(class) {
                Ok(mask) => ClassScanner::Shufti(mask),
                Err(ScanError::ClassTooComplex { required, .. }) => {
                    log::debug!(
                        "Class of {} bytes needs {} shufti buckets, using truffle",
                        class.len(),
                        required
                    );
                    ClassScanner::Truffle(TruffleMask::from_class(class))
                }
                Err(e) => return Err(e),
            },
        };
        Ok(scanner)
    }

    /// The strategy actually used.
    pub fn strategy(&self) -> ClassStrategy {
        match self {
            ClassScanner::Shufti(_) => ClassStrategy::Shufti,
            ClassScanner::Truffle(_) => ClassStrategy::Truffle,
        }
    }

    /// Membership test for one byte.
    pub fn contains(&self, byte: u8) -> bool {
        match self {
            ClassScanner::Shufti(m) => m.contains(byte),
            ClassScanner::Truffle(m) => m.contains(byte),
        }
    }

    /// First offset whose byte is in the class, or `haystack.len()`.
    pub fn find(&self, tier: SimdTier, haystack: &[u8]) -> usize {
        let found = match self {
            ClassScanner::Shufti(m) => first(tier, m, haystack),
            ClassScanner::Truffle(m) => first(tier, m, haystack),
        };
        found.unwrap_or(haystack.len())
    }

    /// Last offset whose byte is in the class.
    pub fn rfind(&self, tier: SimdTier, haystack: &[u8]) -> Option<usize> {
        match self {
            ClassScanner::Shufti(m) => last(tier, m, haystack),
            ClassScanner::Truffle(m) => last(tier, m, haystack),
        }
    }

    /// First offset whose byte is not in the class, or `haystack.len()`.
    pub fn find_not(&self, tier: SimdTier, haystack: &[u8]) -> usize {
        let found = match self {
            ClassScanner::Shufti(m) => first_not(tier, m, haystack),
            ClassScanner::Truffle(m) => first_not(tier, m, haystack),
        };
        found.unwrap_or(haystack.len())
    }

    /// Last offset whose byte is not in the class.
    pub fn rfind_not(&self, tier: SimdTier, haystack: &[u8]) -> Option<usize> {
        match self {
            ClassScanner::Shufti(m) => last_not(tier, m, haystack),
            ClassScanner::Truffle(m) => last_not(tier, m, haystack),
        }
    }
}

/// A pair of character classes for adjacent bytes, encoded with one of the
/// double class kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassPairScanner {
    /// Bucket tables per byte of the pair
    Shufti(DoubleShuftiMask),
    /// High-bit split tables per byte of the pair
    Truffle(DoubleTruffleMask),
}

impl ClassPairScanner {
    /// Encode the pair `(first, second)` with `strategy`.
    pub fn new(first: &ByteSet, second: &ByteSet, strategy: ClassStrategy) -> Result<Self> {
        let truffle = || ClassPairScanner::Truffle(DoubleTruffleMask::from_classes(first, second));
        let scanner = match strategy {
            ClassStrategy::Shufti => {
                ClassPairScanner::Shufti(DoubleShuftiMask::from_classes(first, second)?)
            }
            ClassStrategy::Truffle => truffle(),
            ClassStrategy::Auto => match DoubleShuftiMask::from_classes(first, second) {
                Ok(mask) => ClassPairScanner::Shufti(mask),
                Err(ScanError::ClassTooComplex { .. }) => {
                    log::debug!("Class pair does not fit shufti buckets, using truffle");
                    truffle()
                }
                Err(e) => return Err(e),
            },
        };
        Ok(scanner)
    }

    /// The strategy actually used.
    pub fn strategy(&self) -> ClassStrategy {
        match self {
            ClassPairScanner::Shufti(_) => ClassStrategy::Shufti,
            ClassPairScanner::Truffle(_) => ClassStrategy::Truffle,
        }
    }

    /// Whether `(a, b)` is a matching pair.
    pub fn contains_pair(&self, a: u8, b: u8) -> bool {
        match self {
            ClassPairScanner::Shufti(m) => m.contains_pair(a, b),
            ClassPairScanner::Truffle(m) => m.contains_pair(a, b),
        }
    }

    /// Offset of the first byte of the first matching pair, or
    /// `haystack.len()`.
    pub fn find(&self, tier: SimdTier, haystack: &[u8]) -> usize {
        let found = match self {
            ClassPairScanner::Shufti(m) => first_pair(tier, m, haystack),
            ClassPairScanner::Truffle(m) => first_pair(tier, m, haystack),
        };
        found.unwrap_or(haystack.len())
    }

    /// Offset of the first byte of the last matching pair.
    pub fn rfind(&self, tier: SimdTier, haystack: &[u8]) -> Option<usize> {
        match self {
            ClassPairScanner::Shufti(m) => last_pair(tier, m, haystack),
            ClassPairScanner::Truffle(m) => last_pair(tier, m, haystack),
        }
    }
}
