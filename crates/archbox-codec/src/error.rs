use crate::wire::FieldKind;

/// Errors that can occur while encoding or decoding an archive.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// A string or blob is longer than its length prefix allows.
    #[error("{kind} too large to encode ({len} bytes, max {max})")]
    EncodingTooLarge {
        kind: FieldKind,
        len: usize,
        max: usize,
    },

    /// A read ran past the end of the buffer.
    #[error("truncated data (needed {needed} bytes, {remaining} remaining)")]
    TruncatedData { needed: usize, remaining: usize },

    /// A length prefix on the wire is negative.
    #[error("negative length prefix ({0})")]
    NegativeLength(i16),

    /// A string field does not hold valid UTF-8.
    #[error("invalid utf-8 in string field: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// An entity decoded without consuming its whole frame.
    #[error("{0} trailing bytes after decoded entity")]
    TrailingBytes(usize),
}

pub type Result<T> = std::result::Result<T, CodecError>;
