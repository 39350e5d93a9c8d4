//! Error types for codec operations.

/// Errors raised by the value/term codec.
///
/// Every codec operation is atomic: it either produces a complete result or
/// fails with exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The input uses a kind of data the term model cannot carry.
    #[error("unsupported value kind: {kind}")]
    UnsupportedValueKind { kind: String },

    /// A term does not match any decodable (or renderable) pattern.
    #[error("unrecognized term shape: {reason}")]
    UnrecognizedTermShape { reason: String },

    /// Wire bytes do not follow the RhoTypes schema.
    #[error("malformed bytes at offset {offset}: {reason}")]
    MalformedBytes { offset: usize, reason: String },
}

impl CodecError {
    pub(crate) fn unsupported(kind: impl Into<String>) -> Self {
        Self::UnsupportedValueKind { kind: kind.into() }
    }

    pub(crate) fn shape(reason: impl Into<String>) -> Self {
        Self::UnrecognizedTermShape {
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        Self::MalformedBytes {
            offset,
            reason: reason.into(),
        }
    }
}
