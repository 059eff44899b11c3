use std::fmt;
use std::io;

/// The error taxonomy a command-line run can fail with. `ShortSeq` is the one
/// variant callers are expected to recover from locally (skip the sequence);
/// everything else propagates to the command boundary.
#[derive(Debug)]
pub enum UnikError {
    /// A non-ACGT byte was seen while encoding a k-mer.
    IllegalBase { base: u8, position: usize },
    /// The magic bytes or metadata record didn't parse.
    InvalidFileFormat(String),
    /// Two `.unik` headers that must agree (k, canonical, hashed, scaled,
    /// numHashes...) don't.
    IncompatibleHeader(String),
    /// A sequence shorter than k was encountered; not fatal on its own.
    ShortSeq,
    /// An operation requires a sorted input file, but its header lacks `SORTED`.
    NotSorted,
    /// The index build requires a known k-mer count but the file's `number` is
    /// negative ("unknown").
    NumberUnknown(String),
    /// A parameter combination is invalid or out of range.
    ConfigError(String),
    /// Wraps an underlying read/write failure.
    IOError(io::Error),
}

impl fmt::Display for UnikError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnikError::IllegalBase { base, position } => write!(
                f,
                "illegal base {:?} at position {}",
                *base as char, position
            ),
            UnikError::InvalidFileFormat(msg) => write!(f, "invalid file format: {msg}"),
            UnikError::IncompatibleHeader(msg) => write!(f, "incompatible header: {msg}"),
            UnikError::ShortSeq => write!(f, "sequence shorter than k"),
            UnikError::NotSorted => write!(f, "operation requires a sorted .unik file"),
            UnikError::NumberUnknown(msg) => write!(f, "k-mer count unknown: {msg}"),
            UnikError::ConfigError(msg) => write!(f, "invalid configuration: {msg}"),
            UnikError::IOError(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for UnikError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UnikError::IOError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for UnikError {
    fn from(err: io::Error) -> Self {
        UnikError::IOError(err)
    }
}

impl From<UnikError> for io::Error {
    fn from(err: UnikError) -> Self {
        match err {
            UnikError::IOError(e) => e,
            other => io::Error::new(io::ErrorKind::Other, other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, UnikError>;
