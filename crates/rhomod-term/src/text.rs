//! Rholang concrete syntax.
//!
//! Presentation only: the output is never parsed back.

use crate::codec::CodecOptions;
use crate::error::CodecError;
use crate::hex_lower;
use crate::par::{Bundle, Expr, Par, Send};

const PAR_SEPARATOR: &str = " | ";

/// Render a term with default options.
pub fn to_text(par: &Par) -> Result<String, CodecError> {
    to_text_with(par, CodecOptions::default())
}

/// Render a term as Rholang source.
pub fn to_text_with(par: &Par, options: CodecOptions) -> Result<String, CodecError> {
    render_par(par, 0, options.max_depth)
}

/// Printable form of an unforgeable name.
pub fn unforgeable_text(id: &[u8]) -> String {
    format!("Unforgeable(0x{})", hex_lower(id))
}

fn render_par(par: &Par, depth: usize, limit: usize) -> Result<String, CodecError> {
    if depth > limit {
        return Err(CodecError::shape(format!(
            "term nested deeper than {limit} levels"
        )));
    }
    if par.is_nil() {
        return Ok("Nil".to_string());
    }

    let mut parts = Vec::with_capacity(par.component_count());
    for send in &par.sends {
        parts.push(render_send(send, depth, limit)?);
    }
    for expr in &par.exprs {
        parts.push(render_expr(expr, depth, limit)?);
    }
    for id in &par.ids {
        parts.push(unforgeable_text(&id.id));
    }
    for bundle in &par.bundles {
        parts.push(render_bundle(bundle, depth, limit)?);
    }
    Ok(parts.join(PAR_SEPARATOR))
}

fn render_expr(expr: &Expr, depth: usize, limit: usize) -> Result<String, CodecError> {
    Ok(match expr {
        Expr::GBool(b) => b.to_string(),
        Expr::GInt(n) => n.to_string(),
        Expr::GString(s) => quote_string(s),
        Expr::EList(ps) => {
            let items = ps
                .iter()
                .map(|p| render_par(p, depth + 1, limit))
                .collect::<Result<Vec<_>, _>>()?;
            format!("[{}]", items.join(", "))
        }
    })
}

fn render_send(send: &Send, depth: usize, limit: usize) -> Result<String, CodecError> {
    let chan = render_par(&send.chan, depth + 1, limit)?;
    let data = send
        .data
        .iter()
        .map(|p| render_par(p, depth + 1, limit))
        .collect::<Result<Vec<_>, _>>()?;
    let name = if send.chan.component_count() > 1 {
        format!("@{{{chan}}}")
    } else {
        format!("@{chan}")
    };
    Ok(format!("{name}!({})", data.join(", ")))
}

fn render_bundle(bundle: &Bundle, depth: usize, limit: usize) -> Result<String, CodecError> {
    let keyword = match (bundle.write_flag, bundle.read_flag) {
        (true, false) => "bundle+",
        (false, true) => "bundle-",
        (false, false) => "bundle0",
        (true, true) => "bundle",
    };
    let body = render_par(&bundle.body, depth + 1, limit)?;
    Ok(format!("{keyword} {{ {body} }}"))
}

fn quote_string(s: &str) -> String {
    // JSON string escaping is a subset Rholang's string literals accept.
    serde_json::Value::String(s.to_string()).to_string()
}
