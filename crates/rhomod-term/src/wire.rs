//! RhoTypes wire encoding.
//!
//! Field numbers and wire types are fixed by the ledger's schema:
//!
//! ```text
//! Par      sends=1  exprs=5  ids=7  bundles=11
//! Send     chan=1 (Channel)  data=2
//! Channel  quote=1
//! Expr     g_bool=1  g_int=2 (zig-zag)  g_string=3  e_list_body=20
//! EList    ps=1
//! GPrivate id=1
//! Bundle   body=1  write_flag=2  read_flag=3
//! ```
//!
//! Fields are written in ascending field-number order. Empty repeated
//! fields and false/empty scalars are omitted; the set member of the `Expr`
//! oneof is always written, so `false`, `0` and `""` still occupy bytes.
//!
//! The published conformance vectors carry `Send.chan` as an empty `Channel`
//! message, so the quoted channel name does not contribute to the bytes.
//! The decoder accepts a populated `Channel.quote` as well.

use crate::codec::CodecOptions;
use crate::error::CodecError;
use crate::par::{Bundle, Expr, GPrivate, Par, Send};

const WIRE_VARINT: u8 = 0;
const WIRE_FIXED64: u8 = 1;
const WIRE_LEN: u8 = 2;
const WIRE_FIXED32: u8 = 5;

const PAR_SENDS: u32 = 1;
const PAR_EXPRS: u32 = 5;
const PAR_IDS: u32 = 7;
const PAR_BUNDLES: u32 = 11;
const SEND_CHAN: u32 = 1;
const SEND_DATA: u32 = 2;
const CHANNEL_QUOTE: u32 = 1;
const EXPR_G_BOOL: u32 = 1;
const EXPR_G_INT: u32 = 2;
const EXPR_G_STRING: u32 = 3;
const EXPR_E_LIST: u32 = 20;
const ELIST_PS: u32 = 1;
const GPRIVATE_ID: u32 = 1;
const BUNDLE_BODY: u32 = 1;
const BUNDLE_WRITE: u32 = 2;
const BUNDLE_READ: u32 = 3;

/// Serialize a term with default options.
pub fn to_bytes(par: &Par) -> Result<Vec<u8>, CodecError> {
    to_bytes_with(par, CodecOptions::default())
}

/// Serialize a term to RhoTypes bytes.
pub fn to_bytes_with(par: &Par, options: CodecOptions) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    write_par(&mut out, par, 0, options.max_depth)?;
    Ok(out)
}

/// Parse RhoTypes bytes with default options.
pub fn from_bytes(bytes: &[u8]) -> Result<Par, CodecError> {
    from_bytes_with(bytes, CodecOptions::default())
}

/// Parse RhoTypes bytes into a term.
///
/// Unknown fields are skipped. Expression variants outside the term model
/// are reported as [`CodecError::MalformedBytes`].
pub fn from_bytes_with(bytes: &[u8], options: CodecOptions) -> Result<Par, CodecError> {
    read_par(bytes, 0, 0, options.max_depth)
}

// ── Writing ─────────────────────────────────────────────────────────────────

fn depth_guard(depth: usize, limit: usize) -> Result<(), CodecError> {
    if depth > limit {
        return Err(CodecError::shape(format!(
            "term nested deeper than {limit} levels"
        )));
    }
    Ok(())
}

fn put_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

fn put_key(out: &mut Vec<u8>, field: u32, wire_type: u8) {
    put_varint(out, (u64::from(field) << 3) | u64::from(wire_type));
}

fn put_len_delimited(out: &mut Vec<u8>, field: u32, payload: &[u8]) {
    put_key(out, field, WIRE_LEN);
    put_varint(out, payload.len() as u64);
    out.extend_from_slice(payload);
}

fn put_bool(out: &mut Vec<u8>, field: u32, value: bool) {
    put_key(out, field, WIRE_VARINT);
    put_varint(out, u64::from(value));
}

fn zigzag(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

fn unzigzag(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

fn write_par(out: &mut Vec<u8>, par: &Par, depth: usize, limit: usize) -> Result<(), CodecError> {
    depth_guard(depth, limit)?;
    let mut buf = Vec::new();
    for send in &par.sends {
        buf.clear();
        write_send(&mut buf, send, depth, limit)?;
        put_len_delimited(out, PAR_SENDS, &buf);
    }
    for expr in &par.exprs {
        buf.clear();
        write_expr(&mut buf, expr, depth, limit)?;
        put_len_delimited(out, PAR_EXPRS, &buf);
    }
    for id in &par.ids {
        buf.clear();
        if !id.id.is_empty() {
            put_len_delimited(&mut buf, GPRIVATE_ID, &id.id);
        }
        put_len_delimited(out, PAR_IDS, &buf);
    }
    for bundle in &par.bundles {
        buf.clear();
        write_bundle(&mut buf, bundle, depth, limit)?;
        put_len_delimited(out, PAR_BUNDLES, &buf);
    }
    Ok(())
}

fn write_send(
    out: &mut Vec<u8>,
    send: &Send,
    depth: usize,
    limit: usize,
) -> Result<(), CodecError> {
    put_len_delimited(out, SEND_CHAN, &[]);
    let mut buf = Vec::new();
    for datum in &send.data {
        buf.clear();
        write_par(&mut buf, datum, depth + 1, limit)?;
        put_len_delimited(out, SEND_DATA, &buf);
    }
    Ok(())
}

fn write_expr(
    out: &mut Vec<u8>,
    expr: &Expr,
    depth: usize,
    limit: usize,
) -> Result<(), CodecError> {
    match expr {
        Expr::GBool(b) => put_bool(out, EXPR_G_BOOL, *b),
        Expr::GInt(n) => {
            put_key(out, EXPR_G_INT, WIRE_VARINT);
            put_varint(out, zigzag(*n));
        }
        Expr::GString(s) => put_len_delimited(out, EXPR_G_STRING, s.as_bytes()),
        Expr::EList(ps) => {
            let mut body = Vec::new();
            let mut buf = Vec::new();
            for p in ps {
                buf.clear();
                write_par(&mut buf, p, depth + 1, limit)?;
                put_len_delimited(&mut body, ELIST_PS, &buf);
            }
            put_len_delimited(out, EXPR_E_LIST, &body);
        }
    }
    Ok(())
}

fn write_bundle(
    out: &mut Vec<u8>,
    bundle: &Bundle,
    depth: usize,
    limit: usize,
) -> Result<(), CodecError> {
    let mut body = Vec::new();
    write_par(&mut body, &bundle.body, depth + 1, limit)?;
    put_len_delimited(out, BUNDLE_BODY, &body);
    if bundle.write_flag {
        put_bool(out, BUNDLE_WRITE, true);
    }
    if bundle.read_flag {
        put_bool(out, BUNDLE_READ, true);
    }
    Ok(())
}

// ── Reading ─────────────────────────────────────────────────────────────────

/// Cursor over one message's bytes. `base` is the message's offset in the
/// outermost buffer, so errors report absolute positions.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
    base: usize,
}

enum Field<'a> {
    Varint(u64),
    Bytes { data: &'a [u8], offset: usize },
    Skipped,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8], base: usize) -> Self {
        Self {
            bytes,
            pos: 0,
            base,
        }
    }

    fn offset(&self) -> usize {
        self.base + self.pos
    }

    fn is_done(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn varint(&mut self) -> Result<u64, CodecError> {
        let start = self.offset();
        let mut value: u64 = 0;
        for shift in (0..64).step_by(7) {
            let Some(&byte) = self.bytes.get(self.pos) else {
                return Err(CodecError::malformed(start, "truncated varint"));
            };
            self.pos += 1;
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(CodecError::malformed(start, "varint longer than 10 bytes"))
    }

    fn take(&mut self, len: usize) -> Result<(&'a [u8], usize), CodecError> {
        let offset = self.offset();
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| CodecError::malformed(offset, "length prefix runs past the end"))?;
        let bytes: &'a [u8] = self.bytes;
        let data = &bytes[self.pos..end];
        self.pos = end;
        Ok((data, offset))
    }

    /// Read the next `(field number, value)` pair.
    fn field(&mut self) -> Result<(u32, Field<'a>), CodecError> {
        let at = self.offset();
        let key = self.varint()?;
        let field = u32::try_from(key >> 3)
            .map_err(|_| CodecError::malformed(at, "field number out of range"))?;
        if field == 0 {
            return Err(CodecError::malformed(at, "field number 0"));
        }
        let value = match (key & 0x7) as u8 {
            WIRE_VARINT => Field::Varint(self.varint()?),
            WIRE_LEN => {
                let len = usize::try_from(self.varint()?)
                    .map_err(|_| CodecError::malformed(at, "length prefix out of range"))?;
                let (data, offset) = self.take(len)?;
                Field::Bytes { data, offset }
            }
            WIRE_FIXED64 => {
                self.take(8)?;
                Field::Skipped
            }
            WIRE_FIXED32 => {
                self.take(4)?;
                Field::Skipped
            }
            other => {
                return Err(CodecError::malformed(
                    at,
                    format!("unsupported wire type {other}"),
                ));
            }
        };
        Ok((field, value))
    }
}

fn expect_bytes<'a>(
    field: u32,
    value: Field<'a>,
    at: usize,
) -> Result<(&'a [u8], usize), CodecError> {
    match value {
        Field::Bytes { data, offset } => Ok((data, offset)),
        _ => Err(CodecError::malformed(
            at,
            format!("field {field} should be length-delimited"),
        )),
    }
}

fn expect_varint(field: u32, value: Field<'_>, at: usize) -> Result<u64, CodecError> {
    match value {
        Field::Varint(v) => Ok(v),
        _ => Err(CodecError::malformed(
            at,
            format!("field {field} should be a varint"),
        )),
    }
}

fn read_par(bytes: &[u8], base: usize, depth: usize, limit: usize) -> Result<Par, CodecError> {
    if depth > limit {
        return Err(CodecError::malformed(
            base,
            format!("term nested deeper than {limit} levels"),
        ));
    }
    let mut par = Par::nil();
    let mut reader = Reader::new(bytes, base);
    while !reader.is_done() {
        let at = reader.offset();
        let (field, value) = reader.field()?;
        match field {
            PAR_SENDS => {
                let (data, offset) = expect_bytes(field, value, at)?;
                par.sends.push(read_send(data, offset, depth, limit)?);
            }
            PAR_EXPRS => {
                let (data, offset) = expect_bytes(field, value, at)?;
                par.exprs.push(read_expr(data, offset, depth, limit)?);
            }
            PAR_IDS => {
                let (data, offset) = expect_bytes(field, value, at)?;
                par.ids.push(read_private(data, offset)?);
            }
            PAR_BUNDLES => {
                let (data, offset) = expect_bytes(field, value, at)?;
                par.bundles.push(read_bundle(data, offset, depth, limit)?);
            }
            _ => {}
        }
    }
    Ok(par)
}

fn read_send(bytes: &[u8], base: usize, depth: usize, limit: usize) -> Result<Send, CodecError> {
    let mut send = Send {
        chan: Par::nil(),
        data: Vec::new(),
    };
    let mut reader = Reader::new(bytes, base);
    while !reader.is_done() {
        let at = reader.offset();
        let (field, value) = reader.field()?;
        match field {
            SEND_CHAN => {
                let (data, offset) = expect_bytes(field, value, at)?;
                send.chan = read_channel(data, offset, depth, limit)?;
            }
            SEND_DATA => {
                let (data, offset) = expect_bytes(field, value, at)?;
                send.data.push(read_par(data, offset, depth + 1, limit)?);
            }
            _ => {}
        }
    }
    Ok(send)
}

fn read_channel(bytes: &[u8], base: usize, depth: usize, limit: usize) -> Result<Par, CodecError> {
    let mut quote = Par::nil();
    let mut reader = Reader::new(bytes, base);
    while !reader.is_done() {
        let at = reader.offset();
        let (field, value) = reader.field()?;
        if field == CHANNEL_QUOTE {
            let (data, offset) = expect_bytes(field, value, at)?;
            quote = read_par(data, offset, depth + 1, limit)?;
        }
    }
    Ok(quote)
}

fn read_expr(bytes: &[u8], base: usize, depth: usize, limit: usize) -> Result<Expr, CodecError> {
    let mut expr = None;
    let mut reader = Reader::new(bytes, base);
    while !reader.is_done() {
        let at = reader.offset();
        let (field, value) = reader.field()?;
        expr = Some(match field {
            EXPR_G_BOOL => Expr::GBool(expect_varint(field, value, at)? != 0),
            EXPR_G_INT => Expr::GInt(unzigzag(expect_varint(field, value, at)?)),
            EXPR_G_STRING => {
                let (data, offset) = expect_bytes(field, value, at)?;
                let s = std::str::from_utf8(data)
                    .map_err(|_| CodecError::malformed(offset, "g_string is not UTF-8"))?;
                Expr::GString(s.to_string())
            }
            EXPR_E_LIST => {
                let (data, offset) = expect_bytes(field, value, at)?;
                Expr::EList(read_elist(data, offset, depth, limit)?)
            }
            other => {
                return Err(CodecError::malformed(
                    at,
                    format!("expression field {other} is not part of the term model"),
                ));
            }
        });
    }
    expr.ok_or_else(|| CodecError::malformed(base, "expression with no variant set"))
}

fn read_elist(
    bytes: &[u8],
    base: usize,
    depth: usize,
    limit: usize,
) -> Result<Vec<Par>, CodecError> {
    let mut ps = Vec::new();
    let mut reader = Reader::new(bytes, base);
    while !reader.is_done() {
        let at = reader.offset();
        let (field, value) = reader.field()?;
        if field == ELIST_PS {
            let (data, offset) = expect_bytes(field, value, at)?;
            ps.push(read_par(data, offset, depth + 1, limit)?);
        }
    }
    Ok(ps)
}

fn read_private(bytes: &[u8], base: usize) -> Result<GPrivate, CodecError> {
    let mut id = Vec::new();
    let mut reader = Reader::new(bytes, base);
    while !reader.is_done() {
        let at = reader.offset();
        let (field, value) = reader.field()?;
        if field == GPRIVATE_ID {
            id = expect_bytes(field, value, at)?.0.to_vec();
        }
    }
    Ok(GPrivate { id })
}

fn read_bundle(
    bytes: &[u8],
    base: usize,
    depth: usize,
    limit: usize,
) -> Result<Bundle, CodecError> {
    let mut bundle = Bundle {
        body: Par::nil(),
        write_flag: false,
        read_flag: false,
    };
    let mut reader = Reader::new(bytes, base);
    while !reader.is_done() {
        let at = reader.offset();
        let (field, value) = reader.field()?;
        match field {
            BUNDLE_BODY => {
                let (data, offset) = expect_bytes(field, value, at)?;
                bundle.body = read_par(data, offset, depth + 1, limit)?;
            }
            BUNDLE_WRITE => bundle.write_flag = expect_varint(field, value, at)? != 0,
            BUNDLE_READ => bundle.read_flag = expect_varint(field, value, at)? != 0,
            _ => {}
        }
    }
    Ok(bundle)
}
