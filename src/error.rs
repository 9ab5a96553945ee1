use std::fmt;

/// The four error kinds a decoder/encoder boundary can report.
///
/// Internal plumbing still uses `anyhow` (see `primitives`/`codec`), but
/// anything crossing the `Term::from_mem`/`dump` boundary gets funneled into
/// one of these so callers can match on kind instead of sniffing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Malformed magic, out-of-range index, unknown tag byte, oversize
    /// field, inconsistent extended-section offsets.
    Invalid(&'static str),
    /// A required read ran past the end of the input buffer.
    Truncated(&'static str),
    /// A backing arena or dynamic sequence could not grow to the requested
    /// size (the request itself is unrepresentable, not an allocator OOM).
    AllocationFailure,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Invalid(msg) => write!(f, "invalid input: {msg}"),
            Error::Truncated(what) => write!(f, "truncated input: {what}"),
            Error::AllocationFailure => write!(f, "allocation failure"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// Encoder-only outcome: either a hard [`Error`] or a non-fatal
/// "buffer too small" signal carrying the size that would have sufficed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpError {
    Hard(Error),
    BufferTooSmall { required: usize },
}

impl fmt::Display for DumpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DumpError::Hard(e) => write!(f, "{e}"),
            DumpError::BufferTooSmall { required } => {
                write!(f, "buffer too small, need {required} bytes")
            }
        }
    }
}

impl std::error::Error for DumpError {}

impl From<Error> for DumpError {
    fn from(e: Error) -> Self {
        DumpError::Hard(e)
    }
}

pub type DumpResult<T> = std::result::Result<T, DumpError>;

/// A macro analogue of `ensure!` that produces `Error::Truncated` instead of
/// an `anyhow::Error`, for use in the codec's boundary-checked readers.
macro_rules! ensure_len {
    ($have:expr, $need:expr, $what:expr) => {
        if $have < $need {
            return Err($crate::error::Error::Truncated($what));
        }
    };
}
pub(crate) use ensure_len;
