//! # Range encoders
//!
//! Four encoders turn a port range [lo, hi] into ternary patterns:
//!
//! - [prefix]: classical power-of-two prefix expansion (PFX),
//! - [chunk]: chunked unary fence encoding (DIRPE),
//! - [srge]: symmetric range Gray encoding,
//! - [cgfe]: chunked Gray fence encoding.
//!
//! All four share one contract: the output is deterministic, every
//! pattern has the algorithm's fixed width, the output is empty exactly
//! when `lo > hi`, and the union of the patterns' match sets, taken
//! over the algorithm's own value encoding of the field, equals
//! `{lo, lo+1, ..., hi}`. Patterns may overlap; none matches a value
//! outside the range.
//!
//! PFX and SRGE match against the plain binary (resp. Gray-coded) field,
//! so their patterns are `width` symbols long. DIRPE and CGFE match
//! against a fence-encoded field of `num_chunks * (2^c - 1)` symbols.
//! [key] produces the concrete key a value encodes to under each
//! algorithm, which is what the coverage tests enumerate.
pub mod cgfe;
pub mod chunk;
pub mod fence;
pub mod prefix;
pub mod srge;

use thiserror::Error;

use crate::pattern::Ternary;

pub use cgfe::CgfeConfig;
pub use chunk::ChunkConfig;

/// Width of a transport port field.
pub const PORT_WIDTH: u32 = 16;

/// Errors raised by the encoders.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The range does not fit into the encoder's field width.
    #[error("range [{lo}, {hi}] does not fit in {width} bits")]
    InvalidRange { lo: u32, hi: u32, width: u32 },

    /// The (width, chunk) pair violates the chunking invariant.
    #[error("width {width} cannot be split into {chunk}-bit chunks")]
    InvalidChunking { width: u32, chunk: u32 },
}

/// Range-to-ternary algorithm selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// Prefix expansion.
    Pfx,
    /// Chunked fence encoding.
    Dirpe,
    /// Symmetric range Gray encoding.
    Srge,
    /// Chunked Gray fence encoding.
    Cgfe,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [Algorithm::Pfx, Algorithm::Dirpe, Algorithm::Srge, Algorithm::Cgfe];

    /// Tag used in output file names, `<base>_<tag>.txt`.
    pub fn tag(&self) -> &'static str {
        match self {
            Algorithm::Pfx => "PFX",
            Algorithm::Dirpe => "DIRPE",
            Algorithm::Srge => "SRGE",
            Algorithm::Cgfe => "CGFE",
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Reject ranges that do not fit in `width` bits. `lo > hi` is not an
/// error here; the encoders return an empty expansion for it.
pub(crate) fn check_range(lo: u32, hi: u32, width: u32) -> Result<(), EncodeError> {
    debug_assert!(width >= 1 && width <= PORT_WIDTH);
    let limit = 1u32 << width;
    if lo >= limit || hi >= limit {
        return Err(EncodeError::InvalidRange { lo, hi, width });
    }
    Ok(())
}

/// Check that `alg` can run with the given chunk parameter over a full
/// port field, without encoding anything.
pub fn validate(alg: Algorithm, chunk: u32) -> Result<(), EncodeError> {
    match alg {
        Algorithm::Pfx | Algorithm::Srge => Ok(()),
        Algorithm::Dirpe => ChunkConfig::new(PORT_WIDTH, chunk).map(|_| ()),
        Algorithm::Cgfe => CgfeConfig::new(PORT_WIDTH, chunk).map(|_| ()),
    }
}

/// Encode a port range with the selected algorithm over the full 16-bit
/// port field. `chunk` is only consulted by DIRPE and CGFE.
pub fn encode(alg: Algorithm, lo: u16, hi: u16, chunk: u32) -> Result<Vec<Ternary>, EncodeError> {
    match alg {
        Algorithm::Pfx => prefix::encode(lo, hi, PORT_WIDTH),
        Algorithm::Srge => srge::encode(lo, hi, PORT_WIDTH),
        Algorithm::Dirpe => ChunkConfig::new(PORT_WIDTH, chunk)?.encode_range(lo, hi),
        Algorithm::Cgfe => CgfeConfig::new(PORT_WIDTH, chunk)?.encode_range(lo, hi),
    }
}

/// The concrete key `v` encodes to under `alg`: the star-free pattern an
/// output pattern must cover for the entry to match `v`.
pub fn key(alg: Algorithm, v: u16, chunk: u32) -> Result<Ternary, EncodeError> {
    match alg {
        Algorithm::Pfx => Ok(Ternary::from_bits(v as u64, PORT_WIDTH as usize)),
        Algorithm::Srge => Ok(Ternary::from_bits(crate::gray::to_gray(v as u32) as u64, PORT_WIDTH as usize)),
        Algorithm::Dirpe => Ok(ChunkConfig::new(PORT_WIDTH, chunk)?.encode_value(v as u32)),
        Algorithm::Cgfe => Ok(CgfeConfig::new(PORT_WIDTH, chunk)?.value_key(v)),
    }
}
