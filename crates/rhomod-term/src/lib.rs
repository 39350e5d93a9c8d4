//! # rhomod-term
//!
//! Canonical conversion between plain data and Rholang process terms.
//!
//! ## Pipeline
//!
//! ```text
//! serde_json::Value
//!     │  Value::from_json        (rejects floats, out-of-range integers)
//! Value                          ← Null | Bool | Int | Str | List | Map
//!     │  encode / decode         (maps become sends on quoted string names)
//! Par                            ← exprs | sends | ids | bundles, in parallel
//!     ├─ to_bytes / from_bytes   (RhoTypes wire schema, signing payload)
//!     └─ to_text                 (Rholang concrete syntax)
//! ```
//!
//! Map entries are always emitted in byte order of their keys, so two maps
//! with the same contents produce identical bytes no matter how they were
//! built. Every traversal carries an explicit depth counter bounded by
//! [`CodecOptions::max_depth`].

pub mod codec;
pub mod error;
pub mod hex;
pub mod par;
pub mod text;
pub mod value;
pub mod wire;

pub use codec::{CodecOptions, DEFAULT_MAX_DEPTH, decode, decode_with, encode, encode_with};
pub use error::CodecError;
pub use hex::{HexError, hex_lower, parse_hex};
pub use par::{Bundle, Expr, GPrivate, Par, Send};
pub use text::{to_text, to_text_with};
pub use value::Value;
pub use wire::{from_bytes, from_bytes_with, to_bytes, to_bytes_with};
