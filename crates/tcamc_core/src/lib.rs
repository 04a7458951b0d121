//! # tcamc_core
//!
//! Ternary match patterns and the range-to-ternary encoders of the
//! `tcamc` TCAM rule compiler.
//!
//! ## Example
//! ```
//! use tcamc_core::prelude::*;
//!
//! // expand the range [2, 9] over a 16-bit port field
//! let pats = encode(Algorithm::Srge, 2, 9, 2).unwrap();
//! assert!(!pats.is_empty());
//! for p in &pats {
//!     assert_eq!(p.len(), 16);
//! }
//! ```
pub mod encode;
pub mod gray;
pub mod pattern;

#[allow(missing_docs)]
pub mod prelude {
    #[doc(hidden)]
    pub use crate::{
        encode::{encode, key, validate, Algorithm, CgfeConfig, ChunkConfig, EncodeError, PORT_WIDTH},
        gray::{from_gray, to_gray},
        pattern::{Sym, Ternary},
    };
}
