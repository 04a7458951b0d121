//! Symmetric range Gray encoding (SRGE).
//!
//! The field is matched in Gray code space. The binary-reflected Gray
//! code is locally symmetric: around the point `p` where bit `d` flips
//! (an odd multiple of `2^d`), `G(p - 1 - i)` and `G(p + i)` differ only
//! in bit `d` for the whole surrounding `2^(d+1)`-aligned block. A
//! subrange on one side of `p` can therefore be merged with its mirror
//! image on the other side into a single pattern by starring bit `d`;
//! this is the reflection merge.
//!
//! Encoding a range [bs, be]:
//!
//! 1. If the interval's Gray image is a subcube, one pattern suffices.
//! 2. Otherwise split at the pivot `p`, the flip point of the highest
//!    bit on which `G(bs)` and `G(be)` differ (both endpoints live in
//!    the same `2^(d+1)`-aligned block, so `p` is its midpoint).
//! 3. If the range is exactly symmetric around `p`, encode one side and
//!    star the branch bit in every pattern: each pattern then also
//!    matches its mirror image, so the whole other side comes for free.
//! 4. Otherwise take the maximal hypercube of the shorter side that
//!    touches `p`, merge it with its mirror slice of the longer side
//!    (one starred pattern), and recurse on what remains of both sides.
//! 5. A merge that fragments the longer side can cost more than it
//!    saves; among the applicable candidates the shortest encoding
//!    wins, which keeps the result within the prefix-expansion size
//!    for every range.
//!
//! Reflections are emitted before the deeper recursions; subranges are
//! memoized so both candidates share work and the output stays
//! deterministic.
use fxhash::FxHashMap;

use crate::{
    encode::{check_range, EncodeError},
    gray::to_gray,
    pattern::{Sym, Ternary},
};

type Memo = FxHashMap<(u32, u32), Vec<Ternary>>;

/// Encode [lo, hi] over a `width`-bit Gray-coded field.
pub fn encode(lo: u16, hi: u16, width: u32) -> Result<Vec<Ternary>, EncodeError> {
    check_range(lo as u32, hi as u32, width)?;
    if lo > hi {
        return Ok(Vec::new());
    }
    let mut memo = Memo::default();
    Ok(encode_rec(lo as u32, hi as u32, width, &mut memo))
}

fn encode_rec(bs: u32, be: u32, width: u32, memo: &mut Memo) -> Vec<Ternary> {
    if let Some(hit) = memo.get(&(bs, be)) {
        return hit.clone();
    }

    let out = if is_gray_cube(bs, be) {
        vec![cube_pattern(bs, be, width)]
    } else {
        let d = branch_bit(bs, be);
        let p = (bs & !((1u32 << (d + 1)) - 1)) | (1 << d);
        let nl = p - bs;
        let nr = be - p + 1;
        // maximal hypercube of the shorter side, anchored at the pivot;
        // with its mirror it collapses into the cube [p - h, p + h - 1]
        let h = 1u32 << (31 - nl.min(nr).leading_zeros());

        let mut merged = vec![cube_pattern(p - h, p + h - 1, width)];
        if bs + h < p {
            merged.extend(encode_rec(bs, p - h - 1, width, memo));
        }
        if p + h <= be {
            merged.extend(encode_rec(p + h, be, width, memo));
        }

        let mut indep = encode_rec(bs, p - 1, width, memo);
        indep.extend(encode_rec(p, be, width, memo));

        let mut best = if merged.len() <= indep.len() { merged } else { indep };

        // a range symmetric around the pivot reflects wholesale: the
        // right side's encoding with the branch bit starred also covers
        // the mirrored left side
        if bs + be == 2 * p - 1 {
            let sym: Vec<Ternary> = encode_rec(p, be, width, memo)
                .into_iter()
                .map(|mut pat| {
                    pat.set((width - 1 - d) as usize, Sym::Star);
                    pat
                })
                .collect();
            if sym.len() <= best.len() {
                best = sym;
            }
        }
        best
    };

    memo.insert((bs, be), out.clone());
    out
}

/// Index of the highest bit on which the endpoint Gray codes differ.
fn branch_bit(bs: u32, be: u32) -> u32 {
    let x = to_gray(bs) ^ to_gray(be);
    debug_assert!(x != 0);
    31 - x.leading_zeros()
}

/// Is the Gray image of [bs, be] a subcube (one ternary pattern)?
///
/// Holds exactly for intervals of size 2^k starting at a multiple of
/// 2^(k-1): the 2^k-aligned blocks, and the mirror-symmetric unions of
/// two adjacent 2^(k-1)-aligned blocks.
fn is_gray_cube(bs: u32, be: u32) -> bool {
    let n = be - bs + 1;
    if !n.is_power_of_two() {
        return false;
    }
    let k = n.trailing_zeros();
    k == 0 || bs % (1 << (k - 1)) == 0
}

/// The single pattern matching exactly { G(v) : bs <= v <= be }.
fn cube_pattern(bs: u32, be: u32, width: u32) -> Ternary {
    debug_assert!(is_gray_cube(bs, be));
    let n = be - bs + 1;
    let k = n.trailing_zeros();
    if k == 0 {
        return Ternary::from_bits(to_gray(bs) as u64, width as usize);
    }
    if bs % (1 << k) == 0 {
        // aligned block: Gray bits at and above k are constant, the low
        // k bits run over all combinations
        let mut pat = Ternary::from_bits((to_gray(bs) >> k) as u64, (width - k) as usize);
        pat.push_run(Sym::Star, k as usize);
        pat
    } else {
        // two half blocks mirrored around their shared boundary; the
        // halves differ only in the bit that flips there
        let mid = bs + n / 2;
        let d = mid.trailing_zeros();
        let mut pat = cube_pattern(bs, mid - 1, width);
        pat.set((width - 1 - d) as usize, Sym::Star);
        pat
    }
}
