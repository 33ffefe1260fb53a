//! # Noodle
//!
//! Single-literal matcher for literals of 1 to 8 bytes. Every occurrence is
//! reported through a callback with the offset of its last byte.
//!
//! The scan runs a one- or two-byte prefilter over the haystack and confirms
//! each candidate by comparing up to 8 bytes against a mask/compare pair:
//!
//! ```text
//! literal  "needles"
//!                ^^      key pair: first adjacent pair of distinct bytes
//!  msk/cmp  ^^^^^^^      whole literal, 0xDF per letter when caseless
//! ```
//!
//! A one-byte literal uses only the first key and needs no confirmation.
//! Longer literals use the key pair, carried across register blocks in the
//! comparison-mask domain so pairs straddling two blocks are not missed.
//!
//! Streaming scans take the tail of the previous block as history. Matches
//! that begin in the history and end in the new block are found by a scalar
//! check of a small stitched window; matches entirely inside the new block
//! are left to the block scan.

use crate::error::{Result, ScanError};
use crate::scan::vermicelli::fold;
use crate::scan::{ByteMatcher, MaskedEq};
use crate::simd::{dispatch, lane_range, lanes_below, Kernel, SetLanes, SimdTier, SimdVector};

/// Longest literal a [`NoodleTable`] can confirm.
pub const MAX_LITERAL_LEN: usize = 8;

/// Returned by a match callback to continue or stop the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchFlow {
    /// Keep reporting matches
    Continue,
    /// Stop the scan immediately
    Terminate,
}

/// Outcome of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanStatus {
    /// Every match was reported
    Completed,
    /// A callback asked to stop
    Terminated,
}

impl ScanStatus {
    /// True when a callback stopped the scan.
    #[inline]
    pub fn is_terminated(self) -> bool {
        self == ScanStatus::Terminated
    }
}

/// Compiled single-literal matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoodleTable {
    id: u32,
    msk: u64,
    cmp: u64,
    msk_len: u8,
    /// Distance from the first key byte to the end of the literal.
    key_offset: u8,
    key0: u8,
    key1: u8,
    nocase: bool,
    single: bool,
}

/// Index of the first key byte: the first `i` with `s[i] != s[i + 1]`
/// (after folding), or the last pair when every byte is the same.
fn key_index(literal: &[u8], nocase: bool) -> usize {
    let mut offset = 0;
    for i in 0..literal.len().saturating_sub(1) {
        offset = i;
        if fold(literal[i], nocase).0 != fold(literal[i + 1], nocase).0 {
            break;
        }
    }
    offset
}

impl NoodleTable {
    /// Compile `literal`, reporting matches with `id`.
    ///
    /// With `nocase`, letters match in either case; other bytes always match
    /// exactly.
    pub fn new(literal: &[u8], nocase: bool, id: u32) -> Result<Self> {
        if literal.is_empty() {
            return Err(ScanError::invalid_literal("empty literal"));
        }
        if literal.len() > MAX_LITERAL_LEN {
            return Err(ScanError::literal_too_long(literal.len(), MAX_LITERAL_LEN));
        }
        let nocase = nocase && literal.iter().any(u8::is_ascii_alphabetic);

        let mut msk = 0u64;
        let mut cmp = 0u64;
        for (i, &b) in literal.iter().enumerate() {
            let (c, m) = fold(b, nocase);
            msk |= (m as u64) << (8 * i);
            cmp |= (c as u64) << (8 * i);
        }

        let single = literal.len() == 1;
        let ko = key_index(literal, nocase);
        let table = Self {
            id,
            msk,
            cmp,
            msk_len: literal.len() as u8,
            key_offset: (literal.len() - ko) as u8,
            key0: literal[ko],
            key1: if single { 0 } else { literal[ko + 1] },
            nocase,
            single,
        };
        log::debug!(
            "Noodle table for {}-byte literal (id {}): key offset {}, {} mode{}",
            literal.len(),
            id,
            ko,
            if single { "single" } else { "double" },
            if nocase { ", caseless" } else { "" }
        );
        Ok(table)
    }

    /// Literal length in bytes.
    pub fn len(&self) -> usize {
        self.msk_len as usize
    }

    /// Always false: literals are never empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Identifier passed to callbacks.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Whether letters match in either case.
    pub fn is_nocase(&self) -> bool {
        self.nocase
    }

    /// Whether the prefilter uses a single key byte.
    pub fn is_single(&self) -> bool {
        self.single
    }

    /// Position of the first key byte inside the literal.
    fn key_pos(&self) -> usize {
        (self.msk_len - self.key_offset) as usize
    }

    /// Whether the literal occurs at `begin`.
    #[inline]
    pub fn matches_at(&self, haystack: &[u8], begin: usize) -> bool {
        let len = self.len();
        match haystack.get(begin..begin + len) {
            Some(window) => {
                let mut word = [0u8; 8];
                word[..len].copy_from_slice(window);
                u64::from_le_bytes(word) & self.msk == self.cmp
            }
            None => false,
        }
    }

    /// Report every occurrence of the literal starting at or after `start`,
    /// in order of increasing end offset.
    ///
    /// `on_match` receives the offset of the last byte of each occurrence
    /// and the table id.
    pub fn scan<F>(
        &self,
        tier: SimdTier,
        haystack: &[u8],
        start: usize,
        mut on_match: F,
    ) -> ScanStatus
    where
        F: FnMut(usize, u32) -> MatchFlow,
    {
        if start > haystack.len() || haystack.len() - start < self.len() {
            return ScanStatus::Completed;
        }
        dispatch(
            tier,
            NoodleScan {
                table: self,
                haystack,
                start,
                on_match: &mut on_match,
            },
        )
    }

    /// Scan `haystack` as the continuation of a stream whose previous bytes
    /// end with `history`.
    ///
    /// Occurrences that start in `history` and end in `haystack` are reported
    /// first, with offsets relative to `haystack`. Occurrences entirely inside
    /// `history` are not reported again.
    pub fn scan_streaming<F>(
        &self,
        tier: SimdTier,
        history: &[u8],
        haystack: &[u8],
        mut on_match: F,
    ) -> ScanStatus
    where
        F: FnMut(usize, u32) -> MatchFlow,
    {
        let len = self.len();
        if history.len() + haystack.len() < len {
            return ScanStatus::Completed;
        }

        let tl1 = (len - 1).min(history.len());
        let tl2 = (len - 1).min(haystack.len());
        if tl1 + tl2 >= len {
            let mut window = [0u8; 2 * MAX_LITERAL_LEN];
            window[..tl1].copy_from_slice(&history[history.len() - tl1..]);
            window[tl1..tl1 + tl2].copy_from_slice(&haystack[..tl2]);
            let window = &window[..tl1 + tl2];
            for i in 0..=tl1 + tl2 - len {
                if self.matches_at(window, i) {
                    // offsets in the window are shifted by the history part
                    let end = i + len - 1 - tl1;
                    if on_match(end, self.id) == MatchFlow::Terminate {
                        return ScanStatus::Terminated;
                    }
                }
            }
        }

        self.scan(tier, haystack, 0, on_match)
    }

    /// Confirm a prefilter hit with the first key byte at `key0` and report it.
    #[inline(always)]
    fn report<F>(&self, haystack: &[u8], key0: usize, confirm: bool, on_match: &mut F) -> MatchFlow
    where
        F: FnMut(usize, u32) -> MatchFlow,
    {
        let begin = key0 - self.key_pos();
        if confirm && !self.matches_at(haystack, begin) {
            return MatchFlow::Continue;
        }
        on_match(begin + self.len() - 1, self.id)
    }

    /// Report the hits of `z`, where lane `j` stands for key byte
    /// `base + j - shift`.
    #[inline(always)]
    fn emit<V, F>(
        &self,
        haystack: &[u8],
        base: usize,
        shift: usize,
        z: u64,
        on_match: &mut F,
    ) -> ScanStatus
    where
        V: SimdVector,
        F: FnMut(usize, u32) -> MatchFlow,
    {
        let confirm = !self.single && self.len() > 2;
        for j in SetLanes::<V>::new(z) {
            if self.report(haystack, base + j - shift, confirm, on_match) == MatchFlow::Terminate {
                return ScanStatus::Terminated;
            }
        }
        ScanStatus::Completed
    }

    /// Prefilter on the single key byte over `haystack[start..]`.
    #[inline(always)]
    unsafe fn scan_single<V, F>(
        &self,
        haystack: &[u8],
        start: usize,
        on_match: &mut F,
    ) -> ScanStatus
    where
        V: SimdVector,
        F: FnMut(usize, u32) -> MatchFlow,
    {
        let (c, m) = fold(self.key0, self.nocase);
        let n = haystack.len() - start;
        unsafe {
            let key = MaskedEq::<V>::new(c, m);
            if n < V::WIDTH {
                let z = key.hits(V::load_partial(&haystack[start..])).compare_mask()
                    & lanes_below::<V>(n);
                return self.emit::<V, F>(haystack, start, 0, z, on_match);
            }

            let ptr = haystack.as_ptr().add(start);
            let mut d = 0;
            let misalign = ptr as usize % V::WIDTH;
            if misalign != 0 {
                d = V::WIDTH - misalign;
                let z = key.hits(V::load_unaligned(ptr)).compare_mask() & lanes_below::<V>(d);
                if self.emit::<V, F>(haystack, start, 0, z, on_match).is_terminated() {
                    return ScanStatus::Terminated;
                }
            }

            while d + V::WIDTH <= n {
                let z = key.hits(V::load_aligned(ptr.add(d))).compare_mask();
                if self.emit::<V, F>(haystack, start + d, 0, z, on_match).is_terminated() {
                    return ScanStatus::Terminated;
                }
                d += V::WIDTH;
            }

            if d < n {
                let t = n - V::WIDTH;
                let z = key.hits(V::load_unaligned(ptr.add(t))).compare_mask()
                    & lane_range::<V>(d - t, V::WIDTH);
                return self.emit::<V, F>(haystack, start + t, 0, z, on_match);
            }
        }
        ScanStatus::Completed
    }

    /// Prefilter on the key pair.
    ///
    /// Works on second-key positions `p` in `lo..hi`, so the first key sits
    /// at `p - 1` and the whole literal fits between `start` and the end of
    /// the haystack. Lane `j` of a block at `x` is a hit when byte `x + j`
    /// matches the second key and byte `x + j - 1` the first.
    #[inline(always)]
    unsafe fn scan_double<V, F>(
        &self,
        haystack: &[u8],
        start: usize,
        on_match: &mut F,
    ) -> ScanStatus
    where
        V: SimdVector,
        F: FnMut(usize, u32) -> MatchFlow,
    {
        let (c0, m0) = fold(self.key0, self.nocase);
        let (c1, m1) = fold(self.key1, self.nocase);
        let lo = start + self.key_pos() + 1;
        let hi = haystack.len() - self.key_offset as usize + 2;
        let b0 = lo - 1;
        let r = hi - b0;
        let mw = V::MASK_WIDTH;

        unsafe {
            let k0 = MaskedEq::<V>::new(c0, m0);
            let k1 = MaskedEq::<V>::new(c1, m1);
            let masks = |v: V| (k0.hits(v).compare_mask(), k1.hits(v).compare_mask());

            if r <= V::WIDTH {
                let (z1, z2) = masks(V::load_partial(&haystack[b0..hi]));
                let z = (z1 << mw) & z2 & lanes_below::<V>(r);
                return self.emit::<V, F>(haystack, b0, 1, z, on_match);
            }

            let ptr = haystack.as_ptr();
            let head = V::WIDTH - ptr.add(b0) as usize % V::WIDTH;
            let mut d = b0 + head;

            // lanes 1..head; lane head - 1 is byte d - 1 and seeds the carry
            let (z1, z2) = masks(V::load_unaligned(ptr.add(b0)));
            let z = (z1 << mw) & z2 & lanes_below::<V>(head);
            if self.emit::<V, F>(haystack, b0, 1, z, on_match).is_terminated() {
                return ScanStatus::Terminated;
            }
            let mut carry = (z1 >> ((head - 1) as u32 * mw)) & lanes_below::<V>(1);

            while d + V::WIDTH <= hi {
                let (z1, z2) = masks(V::load_aligned(ptr.add(d)));
                let z = ((z1 << mw) | carry) & z2;
                if self.emit::<V, F>(haystack, d, 1, z, on_match).is_terminated() {
                    return ScanStatus::Terminated;
                }
                carry = z1 >> ((V::WIDTH - 1) as u32 * mw);
                d += V::WIDTH;
            }

            if d < hi {
                let t = hi - V::WIDTH;
                let (z1, z2) = masks(V::load_unaligned(ptr.add(t)));
                let z = (z1 << mw) & z2 & lane_range::<V>(d - t, V::WIDTH);
                return self.emit::<V, F>(haystack, t, 1, z, on_match);
            }
        }
        ScanStatus::Completed
    }
}

/// Block scan bound to a table, a haystack and a callback.
struct NoodleScan<'a, F> {
    table: &'a NoodleTable,
    haystack: &'a [u8],
    start: usize,
    on_match: &'a mut F,
}

impl<F: FnMut(usize, u32) -> MatchFlow> Kernel for NoodleScan<'_, F> {
    type Output = ScanStatus;

    #[inline(always)]
    unsafe fn run<V: SimdVector>(self) -> ScanStatus {
        unsafe {
            if self.table.single {
                self.table.scan_single::<V, F>(self.haystack, self.start, self.on_match)
            } else {
                self.table.scan_double::<V, F>(self.haystack, self.start, self.on_match)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive(literal: &[u8], nocase: bool, haystack: &[u8], start: usize) -> Vec<usize> {
        let eq = |a: u8, b: u8| if nocase { a.eq_ignore_ascii_case(&b) } else { a == b };
        (start..haystack.len())
            .filter(|&i| i + literal.len() <= haystack.len())
            .filter(|&i| literal.iter().zip(&haystack[i..]).all(|(&l, &h)| eq(l, h)))
            .map(|i| i + literal.len() - 1)
            .collect()
    }

    fn collect(table: &NoodleTable, tier: SimdTier, haystack: &[u8], start: usize) -> Vec<usize> {
        let mut ends = Vec::new();
        let status = table.scan(tier, haystack, start, |end, id| {
            assert_eq!(id, table.id());
            ends.push(end);
            MatchFlow::Continue
        });
        assert_eq!(status, ScanStatus::Completed);
        ends
    }

    #[test]
    fn test_build_rejects_bad_literals() {
        assert!(matches!(NoodleTable::new(b"", false, 0), Err(ScanError::InvalidLiteral { .. })));
        assert!(matches!(
            NoodleTable::new(b"123456789", false, 0),
            Err(ScanError::LiteralTooLong { len: 9, max: 8 })
        ));
        assert!(NoodleTable::new(b"12345678", false, 0).is_ok());
    }

    #[test]
    fn test_key_selection() {
        assert_eq!(key_index(b"aab", false), 1);
        assert_eq!(key_index(b"abc", false), 0);
        assert_eq!(key_index(b"aaaa", false), 2);
        assert_eq!(key_index(b"aAb", true), 1);
        assert_eq!(key_index(b"aAb", false), 0);
        assert_eq!(key_index(b"x", false), 0);

        let t = NoodleTable::new(b"aab", false, 7).unwrap();
        assert!(!t.is_single());
        assert_eq!((t.key0, t.key1, t.key_offset), (b'a', b'b', 2));
        assert!(NoodleTable::new(b"q", false, 0).unwrap().is_single());
    }

    #[test]
    fn test_nocase_ignored_without_letters() {
        let t = NoodleTable::new(b"12-3", true, 0).unwrap();
        assert!(!t.is_nocase());
        let t = NoodleTable::new(b"@", true, 0).unwrap();
        assert_eq!(collect(&t, SimdTier::Portable16, b"`@`", 0), vec![1]);
    }

    #[test]
    fn test_every_match_in_uniform_buffer() {
        let hay = vec![b'a'; 1024];
        for literal in [&b"a"[..], b"aa", b"aaa", b"aaaaaaaa"] {
            let t = NoodleTable::new(literal, false, 1).unwrap();
            let ends = collect(&t, SimdTier::Portable32, &hay, 0);
            assert_eq!(ends.len(), 1024 - literal.len() + 1);
            assert_eq!(ends[0], literal.len() - 1);
            assert_eq!(*ends.last().unwrap(), 1023);
        }
    }

    #[test]
    fn test_against_naive_all_positions() {
        let mut hay = Vec::new();
        for i in 0..300u32 {
            hay.push(b"abcAB"[(i * 7 % 5) as usize]);
        }
        for tier in [SimdTier::Portable16, SimdTier::Portable32, SimdTier::Portable64] {
            for literal in [&b"a"[..], b"ab", b"cAB", b"bcab", b"abcab", b"BCABCA"] {
                for nocase in [false, true] {
                    let t = NoodleTable::new(literal, nocase, 0).unwrap();
                    for start in [0, 1, 5, 17, 63, 64, 250, 299, 300] {
                        for end in [hay.len(), hay.len() - 1, 70, 33] {
                            let hay = &hay[..end];
                            if start > hay.len() {
                                continue;
                            }
                            assert_eq!(
                                collect(&t, tier, hay, start),
                                naive(literal, nocase, hay, start),
                                "{:?} nocase {} start {} end {} {}",
                                std::str::from_utf8(literal).unwrap(),
                                nocase,
                                start,
                                end,
                                tier
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_callback_terminates() {
        let t = NoodleTable::new(b"ab", false, 3).unwrap();
        let hay = b"ab ab ab ab ab ab ab ab ab ab ab ab ab ab ab ab ab ab ab ab ab ab";
        let mut seen = Vec::new();
        let status = t.scan(SimdTier::Portable16, hay, 0, |end, _| {
            seen.push(end);
            if seen.len() == 3 {
                MatchFlow::Terminate
            } else {
                MatchFlow::Continue
            }
        });
        assert_eq!(status, ScanStatus::Terminated);
        assert_eq!(seen, vec![1, 4, 7]);
    }

    #[test]
    fn test_start_past_end() {
        let t = NoodleTable::new(b"ab", false, 0).unwrap();
        assert!(collect(&t, SimdTier::Portable16, b"ab", 3).is_empty());
        assert!(collect(&t, SimdTier::Portable16, b"ab", 1).is_empty());
    }

    #[test]
    fn test_streaming_reports_straddling_matches() {
        let t = NoodleTable::new(b"needle", false, 9).unwrap();
        let mut ends = Vec::new();
        let status =
            t.scan_streaming(SimdTier::Portable16, b"haystack nee", b"dle and needle", |end, _| {
                ends.push(end);
                MatchFlow::Continue
            });
        assert_eq!(status, ScanStatus::Completed);
        assert_eq!(ends, vec![2, 13]);

        // a match wholly in the history is not reported again
        let mut ends = Vec::new();
        t.scan_streaming(SimdTier::Portable16, b"needle", b"xx", |end, _| {
            ends.push(end);
            MatchFlow::Continue
        });
        assert!(ends.is_empty());
    }

    #[test]
    fn test_streaming_short_history() {
        let t = NoodleTable::new(b"abcd", false, 0).unwrap();
        let mut ends = Vec::new();
        t.scan_streaming(SimdTier::Portable16, b"a", b"bcd", |end, _| {
            ends.push(end);
            MatchFlow::Continue
        });
        assert_eq!(ends, vec![2]);

        let mut ends = Vec::new();
        t.scan_streaming(SimdTier::Portable16, b"abc", b"", |end, _| {
            ends.push(end);
            MatchFlow::Continue
        });
        assert!(ends.is_empty());
    }
}
