use crate::compression::CompressionError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("truncated input reading {what}: needed {needed} bytes, {available} available")]
    TruncatedInput {
        what: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("bad {what}: expected {expected:02x?}, found {found:02x?}")]
    MagicMismatch {
        what: &'static str,
        expected: Vec<u8>,
        found: Vec<u8>,
    },

    #[error("unknown {what} {value}")]
    UnknownTag {
        what: &'static str,
        value: String,
    },

    #[error("inconsistent size fields: {0}")]
    InconsistentSizeFields(String),

    #[error("compression service failure")]
    CompressionServiceFailure(#[from] CompressionError),

    #[error("invalid file name {0:?}")]
    InvalidName(String),

    #[error("{what} value {value} does not fit its field")]
    FieldOverflow {
        what: &'static str,
        value: u64,
    },

    #[error("an end chunk can only terminate a container")]
    MisplacedEnd,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn magic(what: &'static str, expected: &[u8], found: &[u8]) -> Self {
        Error::MagicMismatch{what, expected: expected.to_vec(), found: found.to_vec()}
    }

    pub(crate) fn sizes(msg: impl Into<String>) -> Self {
        Error::InconsistentSizeFields(msg.into())
    }
}
