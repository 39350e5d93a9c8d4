//! The Rholang term tree.
//!
//! A [`Par`] is a parallel composition: all four collections coexist on one
//! node and are read as `P1 | P2 | ...`. The empty `Par` is the stopped
//! process `Nil`.

/// A parallel composition of expressions, sends, unforgeable names and
/// bundles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Par {
    pub sends: Vec<Send>,
    pub exprs: Vec<Expr>,
    pub ids: Vec<GPrivate>,
    pub bundles: Vec<Bundle>,
}

/// Ground and collection expressions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    GBool(bool),
    GInt(i64),
    GString(String),
    EList(Vec<Par>),
}

/// An output `@chan!(data, ...)` on a quoted channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Send {
    /// The quoted process naming the channel.
    pub chan: Par,
    pub data: Vec<Par>,
}

/// An unforgeable name, opaque bytes assigned by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GPrivate {
    pub id: Vec<u8>,
}

/// A capability-restricted process.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bundle {
    pub body: Par,
    pub write_flag: bool,
    pub read_flag: bool,
}

impl Par {
    /// The stopped process.
    pub fn nil() -> Self {
        Self::default()
    }

    /// Whether no component is populated.
    pub fn is_nil(&self) -> bool {
        self.sends.is_empty()
            && self.exprs.is_empty()
            && self.ids.is_empty()
            && self.bundles.is_empty()
    }

    pub fn from_expr(expr: Expr) -> Self {
        Self {
            exprs: vec![expr],
            ..Self::default()
        }
    }

    pub fn from_sends(sends: Vec<Send>) -> Self {
        Self {
            sends,
            ..Self::default()
        }
    }

    /// A process carrying a single unforgeable name.
    pub fn from_private(id: impl Into<Vec<u8>>) -> Self {
        Self {
            ids: vec![GPrivate { id: id.into() }],
            ..Self::default()
        }
    }

    /// Compose two processes in parallel.
    pub fn par(mut self, other: Par) -> Self {
        self.sends.extend(other.sends);
        self.exprs.extend(other.exprs);
        self.ids.extend(other.ids);
        self.bundles.extend(other.bundles);
        self
    }

    /// Number of parallel components.
    pub fn component_count(&self) -> usize {
        self.sends.len() + self.exprs.len() + self.ids.len() + self.bundles.len()
    }

    /// The string a quoted `@"name"` channel carries, if this process is
    /// exactly one string literal.
    pub fn as_quoted_string(&self) -> Option<&str> {
        if !(self.sends.is_empty() && self.ids.is_empty() && self.bundles.is_empty()) {
            return None;
        }
        match self.exprs.as_slice() {
            [Expr::GString(s)] => Some(s),
            _ => None,
        }
    }

    /// The first unforgeable name in this process, if any.
    pub fn first_private(&self) -> Option<&GPrivate> {
        self.ids.first()
    }
}

impl Send {
    /// A send on the channel `@"key"`.
    pub fn on_quoted_string(key: impl Into<String>, data: Vec<Par>) -> Self {
        Self {
            chan: Par::from_expr(Expr::GString(key.into())),
            data,
        }
    }
}
