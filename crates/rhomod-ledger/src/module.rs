//! Module source parsing.
//!
//! A module is Rholang source shaped like:
//!
//! ```text
//! /**
//!  * ListOps -- list utilities
//!  */
//! new ListOps(`export:`), helper in {
//!   ...
//! }
//! ```
//!
//! The second line carries the title, whose first word is the module name.
//! Everything up to the first `{` is the module top; the name marked with
//! `` (`export:`) `` is exported. The text between that `{` and the last `}`
//! is the body. Parsing splices these into the loader template, which
//! registers the exported name and reports its URI on a private return
//! channel.

use regex::Regex;
use std::sync::OnceLock;

/// The registration template, with `__NAME__`, `__TOP__`, `__BODY__` and
/// `__EXPORT__` placeholders.
pub const LOADER_TEMPLATE: &str = include_str!("../assets/loader.rho");

const EXPORT_MARKER: &str = "(`export:`)";

/// Source text lacks a structural marker the loader requires.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModuleSyntaxError {
    #[error("bad module syntax: cannot find title in source code")]
    MissingTitle,

    #[error("bad module syntax: no {{")]
    MissingOpenBrace,

    #[error("bad module syntax: no export: in {top:?}")]
    MissingExport { top: String },

    #[error("bad module syntax: no ending }}")]
    MissingCloseBrace,
}

/// A module source split into its parts and spliced into the loader term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedModule {
    pub name: String,
    pub title: String,
    pub export: String,
    /// Loader term ready to deploy.
    pub term: String,
}

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"...\n...((\S+).*)").expect("header regex must compile"))
}

fn top_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)^([^{]*\{)(.*)").expect("top regex must compile"))
}

fn export_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\b\w+\b)\s*\(`export:`\)").expect("export regex must compile")
    })
}

/// Split a module's source and assemble its loader term.
pub fn parse_module(source: &str) -> Result<ParsedModule, ModuleSyntaxError> {
    let header = header_re()
        .captures(source)
        .ok_or(ModuleSyntaxError::MissingTitle)?;
    let title = header[1].to_string();
    let name = header[2].to_string();

    let parts = top_re()
        .captures(source)
        .ok_or(ModuleSyntaxError::MissingOpenBrace)?;
    let (modtop, rest) = match (parts.get(1), parts.get(2)) {
        (Some(top), Some(rest)) => (top.as_str(), rest.as_str()),
        _ => return Err(ModuleSyntaxError::MissingOpenBrace),
    };

    let export = export_re()
        .captures(modtop)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| ModuleSyntaxError::MissingExport {
            top: modtop.to_string(),
        })?;
    let top = modtop.replacen(EXPORT_MARKER, "", 1);

    let body_end = rest.rfind('}').ok_or(ModuleSyntaxError::MissingCloseBrace)?;
    let body = &rest[..body_end];

    let term = LOADER_TEMPLATE
        .replacen("__TOP__", &top, 1)
        .replacen("__EXPORT__", &export, 1)
        .replacen("__NAME__", &name, 1)
        .replacen("__BODY__", body, 1);

    Ok(ParsedModule {
        name,
        title,
        export,
        term,
    })
}
