//! Chunk-aligned decomposition and the DIRPE encoder.
//!
//! The field is split into `width / chunk` chunks, most significant
//! first. A subrange is directly encodable as one pattern iff at most
//! one chunk carries a strict range and every chunk below it spans its
//! full domain; the pattern is then the concatenation of the per-chunk
//! [fence](super::fence) ranges. Everything else is decomposed
//! recursively, splitting at the highest chunk where the endpoints
//! disagree. The CGFE tail encoder reuses the same decomposition at
//! `width - chunk` bits.
use crate::{
    encode::{check_range, fence, EncodeError, PORT_WIDTH},
    pattern::{Ternary, MAX_SYMS},
};

/// Chunking parameters of a DIRPE field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    width: u32,
    chunk: u32,
}

impl ChunkConfig {
    /// `width` must be a positive multiple of `chunk`, and the fence
    /// expansion must fit a pattern.
    pub fn new(width: u32, chunk: u32) -> Result<Self, EncodeError> {
        if chunk == 0 || width == 0 || width % chunk != 0 || width > PORT_WIDTH {
            return Err(EncodeError::InvalidChunking { width, chunk });
        }
        let cfg = ChunkConfig { width, chunk };
        if cfg.pattern_len() > MAX_SYMS {
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

    #[inline]
    pub fn num_chunks(&self) -> u32 {
        self.width / self.chunk
    }

    /// Largest value one chunk can hold.
    #[inline]
    pub fn chunk_max(&self) -> u32 {
        (1 << self.chunk) - 1
    }

    /// Symbols emitted per value: `num_chunks * (2^chunk - 1)`.
    #[inline]
    pub fn pattern_len(&self) -> usize {
        self.num_chunks() as usize * fence::fence_len(self.chunk)
    }

    /// Chunk value at `idx`, where index 0 is the most significant chunk.
    #[inline]
    pub fn chunk_at(&self, v: u32, idx: u32) -> u32 {
        let shift = (self.num_chunks() - 1 - idx) * self.chunk;
        (v >> shift) & self.chunk_max()
    }

    /// Can [s, e] be written as a single cartesian product of chunk
    /// ranges? True iff after the highest chunk with a strict range,
    /// every lower chunk spans 0..=chunk_max.
    pub fn is_direct(&self, s: u32, e: u32) -> bool {
        let mut found_span = false;
        for i in 0..self.num_chunks() {
            let sc = self.chunk_at(s, i);
            let ec = self.chunk_at(e, i);
            if sc > ec {
                return false;
            }
            if found_span {
                if sc != 0 || ec != self.chunk_max() {
                    return false;
                }
            } else if sc < ec {
                found_span = true;
            }
        }
        true
    }

    /// Highest chunk where the endpoints disagree, if any.
    fn split_chunk(&self, s: u32, e: u32) -> Option<u32> {
        (0..self.num_chunks()).find(|&i| self.chunk_at(s, i) != self.chunk_at(e, i))
    }

    /// Split [s, e] at chunk `k` into left / middle blocks / right.
    fn split_at(&self, s: u32, e: u32, k: u32) -> Vec<(u32, u32)> {
        let mut parts = Vec::new();
        let low_bits = (self.num_chunks() - k - 1) * self.chunk;
        let low_mask = if low_bits > 0 { (1u32 << low_bits) - 1 } else { 0 };

        let sc = self.chunk_at(s, k);
        let ec = self.chunk_at(e, k);
        // bits strictly above chunk k are identical for s and e
        let prefix = (s >> (low_bits + self.chunk)) << (low_bits + self.chunk);

        let left_end = prefix | (sc << low_bits) | low_mask;
        if s <= left_end && left_end <= e {
            parts.push((s, left_end));
        }
        for c in sc + 1..ec {
            let base = prefix | (c << low_bits);
            parts.push((base, base | low_mask));
        }
        let right_start = prefix | (ec << low_bits);
        if right_start <= e && right_start > left_end {
            parts.push((right_start, e));
        }
        parts
    }

    /// Decompose [s, e] into directly encodable subranges, highest
    /// differing chunk first.
    pub fn decompose(&self, s: u32, e: u32) -> Vec<(u32, u32)> {
        let mut out = Vec::new();
        if s > e {
            return out;
        }
        if self.is_direct(s, e) {
            out.push((s, e));
            return out;
        }
        let k = match self.split_chunk(s, e) {
            Some(k) => k,
            // all chunks equal means s == e, directly encodable
            None => {
                out.push((s, e));
                return out;
            }
        };
        for (ls, le) in self.split_at(s, e, k) {
            out.extend(self.decompose(ls, le));
        }
        out
    }

    /// Fence encoding of the single value `v` over all chunks; the
    /// concrete key a DIRPE pattern is matched against.
    pub fn encode_value(&self, v: u32) -> Ternary {
        let mut pat = Ternary::new();
        for i in 0..self.num_chunks() {
            pat = pat.concat(&fence::value(self.chunk_at(v, i), self.chunk, false));
        }
        pat
    }

    /// One pattern for a directly encodable subrange.
    fn encode_direct(&self, s: u32, e: u32) -> Ternary {
        debug_assert!(self.is_direct(s, e));
        let mut pat = Ternary::new();
        for i in 0..self.num_chunks() {
            let sc = self.chunk_at(s, i);
            let ec = self.chunk_at(e, i);
            pat = pat.concat(&fence::range(sc, ec, self.chunk, false));
        }
        pat
    }

    /// DIRPE expansion of [lo, hi]: decompose, then encode each
    /// subrange as one pattern.
    pub fn encode_range(&self, lo: u16, hi: u16) -> Result<Vec<Ternary>, EncodeError> {
        check_range(lo as u32, hi as u32, self.width)?;
        Ok(self
            .decompose(lo as u32, hi as u32)
            .into_iter()
            .map(|(s, e)| self.encode_direct(s, e))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(width: u32, chunk: u32) -> ChunkConfig {
        ChunkConfig::new(width, chunk).unwrap()
    }

    fn strs(pats: &[Ternary]) -> Vec<String> {
        pats.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_config_invariant() {
        assert!(ChunkConfig::new(16, 3).is_err());
        assert!(ChunkConfig::new(4, 0).is_err());
        assert!(ChunkConfig::new(0, 2).is_err());
        assert_eq!(cfg(16, 2).num_chunks(), 8);
        assert_eq!(cfg(16, 2).pattern_len(), 24);
    }

    #[test]
    fn test_chunk_at() {
        let c = cfg(4, 2);
        assert_eq!(c.chunk_at(0b1001, 0), 0b10);
        assert_eq!(c.chunk_at(0b1001, 1), 0b01);
    }

    #[test]
    fn test_decompose_paper_example() {
        assert_eq!(cfg(4, 2).decompose(2, 9), [(2, 3), (4, 7), (8, 9)]);
    }

    #[test]
    fn test_decompose_critical_cases() {
        // splits that leave partial chunks on both flanks
        let c = cfg(4, 2);
        assert_eq!(c.decompose(1, 6), [(1, 3), (4, 6)]);
        assert_eq!(c.decompose(6, 14), [(6, 7), (8, 11), (12, 14)]);
        assert_eq!(c.decompose(1, 13), [(1, 3), (4, 7), (8, 11), (12, 13)]);
    }

    #[test]
    fn test_decompose_three_chunks() {
        let c = cfg(6, 2);
        let parts = c.decompose(26, 36);
        assert_eq!(parts.first().unwrap().0, 26);
        assert_eq!(parts.last().unwrap().1, 36);
        for w in parts.windows(2) {
            assert_eq!(w[0].1 + 1, w[1].0, "subranges must tile the input");
        }
        for (s, e) in parts {
            assert!(c.is_direct(s, e));
        }
    }

    #[test]
    fn test_encode_paper_example() {
        assert_eq!(strs(&cfg(4, 2).encode_range(2, 9).unwrap()), ["000*11", "001***", "01100*"]);
    }

    #[test]
    fn test_encode_direct_ranges() {
        let c = cfg(4, 2);
        assert_eq!(strs(&c.encode_range(1, 6).unwrap()), ["000**1", "0010**"]);
        assert_eq!(strs(&c.encode_range(4, 7).unwrap()), ["001***"]);
        assert_eq!(strs(&c.encode_range(0, 15).unwrap()), ["******"]);
        assert_eq!(strs(&c.encode_range(5, 5).unwrap()), ["001001"]);
    }

    #[test]
    fn test_encode_value() {
        assert_eq!(cfg(4, 2).encode_value(6).to_string(), "001011");
    }
}
