//! Value ↔ term conversion.
//!
//! Mapping:
//! - `Null` → `Nil`
//! - `Bool`, `Int`, `Str` → one ground expression
//! - `List` → one `EList`, element order preserved
//! - `Map` → one send per entry on `@"key"`, carrying the encoded value,
//!   in byte order of the keys
//!
//! [`decode`] inverts exactly this image and rejects every other shape.
//!
//! An empty map has no entries to send, so it encodes to `Nil` and decodes
//! as `Null`. That is the one value the round trip does not preserve.

use crate::error::CodecError;
use crate::par::{Expr, Par, Send};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Nesting limit applied when no options are given.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Tunables shared by every codec traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodecOptions {
    /// Deepest list/map/send nesting any traversal will follow.
    pub max_depth: usize,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Encode a value as a term using default options.
pub fn encode(value: &Value) -> Result<Par, CodecError> {
    encode_with(value, CodecOptions::default())
}

/// Encode a value as a term.
pub fn encode_with(value: &Value, options: CodecOptions) -> Result<Par, CodecError> {
    encode_at(value, 0, options.max_depth)
}

/// Decode a term produced by [`encode`] back into a value.
///
/// `Nil` always decodes to [`Value::Null`], including the `Nil` an empty
/// map encodes to.
pub fn decode(par: &Par) -> Result<Value, CodecError> {
    decode_with(par, CodecOptions::default())
}

/// Decode a term back into a value.
pub fn decode_with(par: &Par, options: CodecOptions) -> Result<Value, CodecError> {
    decode_at(par, 0, options.max_depth)
}

fn encode_at(value: &Value, depth: usize, limit: usize) -> Result<Par, CodecError> {
    if depth > limit {
        return Err(CodecError::unsupported(format!(
            "value nested deeper than {limit} levels"
        )));
    }

    match value {
        Value::Null => Ok(Par::nil()),
        Value::Bool(b) => Ok(Par::from_expr(Expr::GBool(*b))),
        Value::Int(n) => Ok(Par::from_expr(Expr::GInt(*n))),
        Value::Str(s) => Ok(Par::from_expr(Expr::GString(s.clone()))),
        Value::List(items) => {
            let ps = items
                .iter()
                .map(|item| encode_at(item, depth + 1, limit))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Par::from_expr(Expr::EList(ps)))
        }
        // BTreeMap iterates in byte order of the keys.
        Value::Map(entries) => {
            let sends = entries
                .iter()
                .map(|(key, item)| {
                    let datum = encode_at(item, depth + 1, limit)?;
                    Ok(Send::on_quoted_string(key.clone(), vec![datum]))
                })
                .collect::<Result<Vec<_>, CodecError>>()?;
            Ok(Par::from_sends(sends))
        }
    }
}

fn decode_at(par: &Par, depth: usize, limit: usize) -> Result<Value, CodecError> {
    if depth > limit {
        return Err(CodecError::shape(format!(
            "term nested deeper than {limit} levels"
        )));
    }
    if !par.ids.is_empty() {
        return Err(CodecError::shape("unforgeable names have no data form"));
    }
    if !par.bundles.is_empty() {
        return Err(CodecError::shape("bundles have no data form"));
    }

    match (par.exprs.as_slice(), par.sends.is_empty()) {
        ([], true) => Ok(Value::Null),
        ([expr], true) => decode_expr(expr, depth, limit),
        ([], false) => decode_map(&par.sends, depth, limit),
        (exprs, true) => Err(CodecError::shape(format!(
            "{} expressions in parallel",
            exprs.len()
        ))),
        (_, false) => Err(CodecError::shape("expressions mixed with sends")),
    }
}

fn decode_expr(expr: &Expr, depth: usize, limit: usize) -> Result<Value, CodecError> {
    match expr {
        Expr::GBool(b) => Ok(Value::Bool(*b)),
        Expr::GInt(n) => Ok(Value::Int(*n)),
        Expr::GString(s) => Ok(Value::Str(s.clone())),
        Expr::EList(ps) => ps
            .iter()
            .map(|p| decode_at(p, depth + 1, limit))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
    }
}

fn decode_map(sends: &[Send], depth: usize, limit: usize) -> Result<Value, CodecError> {
    let mut entries = BTreeMap::new();
    for send in sends {
        let key = send
            .chan
            .as_quoted_string()
            .ok_or_else(|| CodecError::shape("send on a channel that is not a quoted string"))?;
        let datum = match send.data.as_slice() {
            [datum] => datum,
            data => {
                return Err(CodecError::shape(format!(
                    "send on @{key:?} carries {} values, expected 1",
                    data.len()
                )));
            }
        };
        let value = decode_at(datum, depth + 1, limit)?;
        if entries.insert(key.to_string(), value).is_some() {
            return Err(CodecError::shape(format!("duplicate key {key:?}")));
        }
    }
    Ok(Value::Map(entries))
}
