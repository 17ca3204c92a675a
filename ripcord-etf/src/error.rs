use std::fmt::Display;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EtfError {
    #[error("expected version byte 131, got {0}")]
    BadVersion(u8),
    #[error("unknown term tag {0}")]
    BadTag(u8),
    #[error("unexpected end of buffer")]
    UnexpectedEof,
    #[error("integer does not fit the target width")]
    IntOutOfRange,
    #[error("fixed buffer capacity of {0} bytes exceeded")]
    CapacityExceeded(usize),
    #[error("atom of {0} bytes is too long")]
    AtomTooLong(usize),
    #[error("sequence length must be known up front")]
    UnsizedSequence,
    #[error("trailing bytes after the term")]
    TrailingBytes,
    #[error("{0}")]
    Message(Box<str>),
}

impl serde::ser::Error for EtfError {
    fn custom<T: Display>(msg: T) -> Self {
        Self::Message(msg.to_string().into_boxed_str())
    }
}

impl serde::de::Error for EtfError {
    fn custom<T: Display>(msg: T) -> Self {
        Self::Message(msg.to_string().into_boxed_str())
    }
}
