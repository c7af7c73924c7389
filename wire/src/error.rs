use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The buffer does not have room for the bytes an operation needs.
    #[error("end of buffer: needed {needed} bytes, {remaining} remaining")]
    EndOfBuffer { needed: usize, remaining: usize },

    /// A string or array is longer than a `u16` length prefix can describe.
    #[error("length {len} does not fit in a u16 length prefix")]
    LengthOverflow { len: usize },

    #[error("string at offset {offset} is not valid UTF-8")]
    InvalidUtf8 { offset: usize },
}
