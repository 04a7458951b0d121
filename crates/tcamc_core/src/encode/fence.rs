//! Single-chunk unary "fence" encoding.
//!
//! A c-bit chunk value x is written as `2^c - 1` symbols: a block of
//! ZEROs followed by a block of ONEs whose sizes encode x. Patterns for
//! x and x + 1 differ in exactly one position, so the fence behaves like
//! a unary Gray code inside the chunk. A chunk range [s, e] opens a STAR
//! window between the two blocks and matches exactly the fences of
//! s..=e.
//!
//! The reflected forms encode the value mirrored inside the chunk
//! (x ↦ 2^c − 1 − x); CGFE uses them to flip chunks under odd parity.
use crate::pattern::{Sym, Ternary};

/// Number of symbols in a c-bit fence.
#[inline]
pub fn fence_len(chunk: u32) -> usize {
    (1usize << chunk) - 1
}

/// Fence pattern of the single value `x`, `0 <= x < 2^chunk`.
///
/// With `reflected`, encodes `2^chunk - 1 - x` instead.
pub fn value(x: u32, chunk: u32, reflected: bool) -> Ternary {
    range(x, x, chunk, reflected)
}

/// Fence pattern matching exactly the values `s..=e` of one chunk.
///
/// With `reflected`, encodes the mirrored range `[2^c-1-e, 2^c-1-s]`.
pub fn range(s: u32, e: u32, chunk: u32, reflected: bool) -> Ternary {
    debug_assert!(s <= e, "fence range requires s <= e");
    let max = (1u32 << chunk) - 1;
    debug_assert!(e <= max);
    let (s, e) = if reflected { (max - e, max - s) } else { (s, e) };

    let mut pat = Ternary::new();
    pat.push_run(Sym::Zero, (max - e) as usize);
    pat.push_run(Sym::Star, (e - s) as usize);
    pat.push_run(Sym::One, s as usize);
    pat
}
