//! Chunked Gray fence encoding (CGFE).
//!
//! The field splits into a most-significant chunk (MSC, the block index)
//! and a tail (TC, the offset inside the block). Both are written as
//! unary [fence](super::fence) patterns, but the tail propagates a
//! parity across its chunks: under odd parity a chunk is encoded
//! mirrored, and the parity flips with the low bit of the value actually
//! written. Odd blocks start with odd parity, so the whole encoding is a
//! Gray code: adjacent field values differ in exactly one symbol, and
//! the tail encoding of offset `t` in an even block is symbol-identical
//! to that of `block_size - 1 - t` in an odd block.
//!
//! That symmetry is what the range encoder exploits: a tail pattern
//! extended across one MSC boundary matches the same offsets in its
//! own block and the mirrored offsets in the neighbor, so a range
//! straddling a single boundary often collapses into one entry plus
//! small residuals. Ranges spanning two or more boundaries are covered
//! by an explicit fence over the fully contained middle blocks plus
//! single-block encodings of the two partial ends; extending both ends
//! across the whole span instead can leave a gap in the middle blocks
//! whenever the end offsets do not meet, so the explicit middle fence is
//! the authoritative rule here.
use crate::{
    encode::{check_range, chunk::ChunkConfig, fence, EncodeError},
    pattern::Ternary,
};

/// CGFE parameters: total field width and chunk size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CgfeConfig {
    width: u32,
    chunk: u32,
    /// Chunking of the tail; `None` when the field is a single chunk.
    tail: Option<ChunkConfig>,
}

/// One encoded entry before assembly: an MSC span plus a tail pattern.
#[derive(Debug, Clone)]
struct Entry {
    msc_lo: u32,
    msc_hi: u32,
    tail: Ternary,
}

impl CgfeConfig {
    /// `width - chunk` must be a non-negative multiple of `chunk`, and
    /// the fence expansion must fit a pattern.
    pub fn new(width: u32, chunk: u32) -> Result<Self, EncodeError> {
        if chunk == 0 || chunk > width || (width - chunk) % chunk != 0 || width > crate::encode::PORT_WIDTH {
            return Err(EncodeError::InvalidChunking { width, chunk });
        }
        let tail = if width > chunk { Some(ChunkConfig::new(width - chunk, chunk)?) } else { None };
        let cfg = CgfeConfig { width, chunk, tail };
        if cfg.pattern_len() > crate::pattern::MAX_SYMS {
            return Err(EncodeError::InvalidChunking { width, chunk });
        }
        Ok(cfg)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn chunk(&self) -> u32 {
        self.chunk
    }

    /// Values per block: `2^(width - chunk)`.
    #[inline]
    pub fn block_size(&self) -> u32 {
        1 << (self.width - self.chunk)
    }

    /// Number of blocks: `2^chunk`.
    #[inline]
    pub fn num_blocks(&self) -> u32 {
        1 << self.chunk
    }

    #[inline]
    fn tc_chunks(&self) -> u32 {
        (self.width - self.chunk) / self.chunk
    }

    #[inline]
    fn chunk_max(&self) -> u32 {
        (1 << self.chunk) - 1
    }

    #[inline]
    fn tail_len(&self) -> usize {
        self.tc_chunks() as usize * fence::fence_len(self.chunk)
    }

    /// Symbols per assembled pattern: `(width / chunk) * (2^chunk - 1)`.
    #[inline]
    pub fn pattern_len(&self) -> usize {
        fence::fence_len(self.chunk) + self.tail_len()
    }

    /// Block index of `x`.
    #[inline]
    pub fn msc(&self, x: u32) -> u32 {
        x >> (self.width - self.chunk)
    }

    /// Offset of `x` inside its block.
    #[inline]
    pub fn tc(&self, x: u32) -> u32 {
        x & (self.block_size() - 1)
    }

    #[inline]
    fn tc_chunk_at(&self, tc: u32, idx: u32) -> u32 {
        let shift = (self.tc_chunks() - 1 - idx) * self.chunk;
        (tc >> shift) & self.chunk_max()
    }

    /// The concrete key `x` encodes to: MSC fence plus parity-propagated
    /// tail. Adjacent values yield keys differing in exactly one symbol.
    pub fn value_key(&self, x: u16) -> Ternary {
        let m = self.msc(x as u32);
        fence::value(m, self.chunk, false).concat(&self.tc_value(self.tc(x as u32), m & 1 == 1))
    }

    /// Tail encoding of a single offset under the given starting parity.
    fn tc_value(&self, tc: u32, msc_parity: bool) -> Ternary {
        let mut pat = Ternary::new();
        let mut parity = msc_parity;
        for i in 0..self.tc_chunks() {
            let v = self.tc_chunk_at(tc, i);
            let enc = if parity { self.chunk_max() - v } else { v };
            pat = pat.concat(&fence::value(enc, self.chunk, false));
            parity ^= enc & 1 == 1;
        }
        pat
    }

    /// One tail pattern for a directly encodable offset range. The
    /// parity handed to the next chunk tracks the low bit of the encoded
    /// value, not the raw one.
    fn tc_direct(&self, lo: u32, hi: u32, msc_parity: bool) -> Ternary {
        let mut pat = Ternary::new();
        let mut parity = msc_parity;
        for i in 0..self.tc_chunks() {
            let sc = self.tc_chunk_at(lo, i);
            let ec = self.tc_chunk_at(hi, i);
            pat = pat.concat(&fence::range(sc, ec, self.chunk, parity));
            let enc_s = if parity { self.chunk_max() - ec } else { sc };
            parity ^= enc_s & 1 == 1;
        }
        pat
    }

    /// Tail patterns covering exactly the offsets `lo..=hi` of a block
    /// with the given parity.
    fn tc_range(&self, lo: u32, hi: u32, msc_parity: bool) -> Vec<Ternary> {
        debug_assert!(lo <= hi);
        match self.tail {
            // single-chunk field: the tail is empty
            None => vec![Ternary::new()],
            Some(tail) => tail
                .decompose(lo, hi)
                .into_iter()
                .map(|(s, e)| self.tc_direct(s, e, msc_parity))
                .collect(),
        }
    }

    fn entries(&self, s: u32, e: u32) -> Vec<Entry> {
        let (ms, me) = (self.msc(s), self.msc(e));
        let (ts, te) = (self.tc(s), self.tc(e));
        let bsize = self.block_size();
        let par_s = ms & 1 == 1;
        let par_e = me & 1 == 1;
        let mut out = Vec::new();

        if ms == me {
            // whole range inside one block
            for tail in self.tc_range(ts, te, par_s) {
                out.push(Entry { msc_lo: ms, msc_hi: ms, tail });
            }
        } else if me - ms == 1 {
            // one boundary: the suffix of the low block reflects onto the
            // prefix of the high block, so the overlap rides a single
            // entry with a widened MSC fence; what the reflection cannot
            // reach stays in single-block residuals
            let sym_hi = bsize - 1 - ts;
            let common_hi = sym_hi.min(te);
            let extend_lo = bsize - 1 - common_hi;
            if extend_lo > ts {
                for tail in self.tc_range(ts, extend_lo - 1, par_s) {
                    out.push(Entry { msc_lo: ms, msc_hi: ms, tail });
                }
            }
            for tail in self.tc_range(extend_lo, bsize - 1, par_s) {
                out.push(Entry { msc_lo: ms, msc_hi: me, tail });
            }
            if te > sym_hi {
                for tail in self.tc_range(sym_hi + 1, te, par_e) {
                    out.push(Entry { msc_lo: me, msc_hi: me, tail });
                }
            }
        } else {
            // two or more boundaries: explicit fence over the fully
            // contained blocks, single-block entries for the partial ends
            let mid_lo = if ts == 0 { ms } else { ms + 1 };
            let mid_hi = if te == bsize - 1 { me } else { me - 1 };
            if ts != 0 {
                for tail in self.tc_range(ts, bsize - 1, par_s) {
                    out.push(Entry { msc_lo: ms, msc_hi: ms, tail });
                }
            }
            out.push(Entry { msc_lo: mid_lo, msc_hi: mid_hi, tail: Ternary::all_star(self.tail_len()) });
            if te != bsize - 1 {
                for tail in self.tc_range(0, te, par_e) {
                    out.push(Entry { msc_lo: me, msc_hi: me, tail });
                }
            }
        }
        out
    }

    fn assemble(&self, entry: &Entry) -> Ternary {
        fence::range(entry.msc_lo, entry.msc_hi, self.chunk, false).concat(&entry.tail)
    }

    /// CGFE expansion of [lo, hi].
    pub fn encode_range(&self, lo: u16, hi: u16) -> Result<Vec<Ternary>, EncodeError> {
        check_range(lo as u32, hi as u32, self.width)?;
        if lo > hi {
            return Ok(Vec::new());
        }
        Ok(self.entries(lo as u32, hi as u32).iter().map(|e| self.assemble(e)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(width: u32, chunk: u32) -> CgfeConfig {
        CgfeConfig::new(width, chunk).unwrap()
    }

    fn strs(pats: &[Ternary]) -> Vec<String> {
        pats.iter().map(|p| p.to_string()).collect()
    }

    /// Values whose keys are matched by some pattern.
    fn matched(c: &CgfeConfig, pats: &[Ternary]) -> Vec<u32> {
        (0..1u32 << c.width())
            .filter(|&v| {
                let key = c.value_key(v as u16);
                pats.iter().any(|p| p.covers(&key))
            })
            .collect()
    }

    #[test]
    fn test_config_invariant() {
        assert!(CgfeConfig::new(16, 0).is_err());
        assert!(CgfeConfig::new(16, 5).is_err());
        assert!(CgfeConfig::new(4, 3).is_err());
        let c = cfg(16, 2);
        assert_eq!(c.block_size(), 1 << 14);
        assert_eq!(c.num_blocks(), 4);
        assert_eq!(c.pattern_len(), 24);
        // degenerate single-chunk field
        assert_eq!(cfg(2, 2).pattern_len(), 3);
    }

    #[test]
    fn test_value_key_tables() {
        let c = cfg(4, 2);
        // even block: plain fences; odd block: tail mirrored
        assert_eq!(c.value_key(3).to_string(), "000111");
        assert_eq!(c.value_key(4).to_string(), "001111");
        assert_eq!(c.value_key(5).to_string(), "001011");
        assert_eq!(c.value_key(7).to_string(), "001000");
        assert_eq!(c.value_key(8).to_string(), "011000");
    }

    #[test]
    fn test_value_keys_are_gray() {
        for c in [cfg(4, 2), cfg(6, 2), cfg(8, 2), cfg(8, 4)] {
            for x in 0..(1u32 << c.width()) - 1 {
                let a = c.value_key(x as u16);
                let b = c.value_key(x as u16 + 1);
                let differing = (0..a.len()).filter(|&i| a.get(i) != b.get(i)).count();
                assert_eq!(differing, 1, "x = {x}");
            }
        }
    }

    #[test]
    fn test_value_keys_are_distinct() {
        let c = cfg(8, 2);
        let keys: Vec<_> = (0..256u32).map(|x| c.value_key(x as u16).to_string()).collect();
        for i in 0..keys.len() {
            for j in i + 1..keys.len() {
                assert_ne!(keys[i], keys[j]);
            }
        }
    }

    #[test]
    fn test_single_boundary_reflection() {
        // [6, 9] straddles one boundary symmetrically: one entry, no residual
        let c = cfg(4, 2);
        let pats = c.encode_range(6, 9).unwrap();
        assert_eq!(strs(&pats), ["0*100*"]);
        assert_eq!(matched(&c, &pats), (6..=9).collect::<Vec<_>>());
    }

    #[test]
    fn test_single_boundary_with_residual() {
        // [5, 9]: the reflection of [5, 7] covers [8, 10], which overshoots;
        // the extended entry carries [6, 9] and the residual [5, 5] stays
        // in its own block
        let c = cfg(4, 2);
        let pats = c.encode_range(5, 9).unwrap();
        assert_eq!(matched(&c, &pats), (5..=9).collect::<Vec<_>>());
        assert_eq!(pats.len(), 2);
    }

    #[test]
    fn test_two_boundary_range() {
        let c = cfg(4, 2);
        let pats = c.encode_range(2, 9).unwrap();
        assert_eq!(strs(&pats), ["000*11", "001***", "01100*"]);
        assert_eq!(matched(&c, &pats), (2..=9).collect::<Vec<_>>());
    }

    #[test]
    fn test_whole_domain() {
        for c in [cfg(4, 2), cfg(8, 2), cfg(8, 4)] {
            let hi = (1u32 << c.width()) - 1;
            let pats = c.encode_range(0, hi as u16).unwrap();
            assert_eq!(pats.len(), 1);
            assert_eq!(pats[0].star_count(), c.pattern_len());
        }
    }

    #[test]
    fn test_singletons_are_star_free() {
        let c = cfg(4, 2);
        for v in 0..16u16 {
            let pats = c.encode_range(v, v).unwrap();
            assert_eq!(pats.len(), 1);
            assert_eq!(pats[0].star_count(), 0);
            assert!(pats[0].covers(&c.value_key(v)), "v = {v}");
        }
    }

    #[test]
    fn test_port_width_spot_checks() {
        let c = cfg(16, 2);
        for (lo, hi) in [(0u16, 65535u16), (1024, 65535), (6, 9), (16380, 16390), (0, 80)] {
            let pats = c.encode_range(lo, hi).unwrap();
            for p in &pats {
                assert_eq!(p.len(), 24);
            }
            let mid = ((lo as u32 + hi as u32) / 2) as u16;
            for v in [lo, hi, mid] {
                assert!(pats.iter().any(|p| p.covers(&c.value_key(v))), "[{lo},{hi}] misses {v}");
            }
            if hi < u16::MAX {
                assert!(!pats.iter().any(|p| p.covers(&c.value_key(hi + 1))));
            }
            if lo > 0 {
                assert!(!pats.iter().any(|p| p.covers(&c.value_key(lo - 1))));
            }
        }
    }
}
