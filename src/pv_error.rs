use crate::store::ValueType;
use thiserror::Error;

/// A list specifying categories of [`PvError`](crate::PvError).
///
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PvError {
    /// A typed value carries a type code that is not part of the wire contract.
    #[error("Unknown value type code: 0x{0:02x}")]
    UnknownTypeCode(u8),

    /// A block-split payload is inconsistent: the length chain runs past the
    /// end of the buffer, or the zero-length terminator is missing.
    #[error("Malformed value encoding: {}", _0)]
    MalformedValue(&'static str),

    /// A typed value cannot be coerced to the requested representation.
    #[error("A {} value has no {} representation", from, to)]
    ValueConversion {
        /// The type of the value at hand.
        from: ValueType,
        /// The requested representation.
        to: &'static str,
    },

    /// Error occured in communication or framing I/O.
    #[error(transparent)]
    Io {
        /// The causing Error.
        #[from]
        source: std::io::Error,
    },

    /// Error occured in thread synchronization.
    #[error("Error occured in thread synchronization")]
    Poison,

    /// Implementation error.
    #[error("Implementation error: {}", _0)]
    Impl(&'static str),

    /// Error caused by wrong usage.
    #[error("Wrong usage: {}", _0)]
    Usage(&'static str),
}

/// Abbreviation of `Result<T, PvError>`.
pub type PvResult<T> = std::result::Result<T, PvError>;

impl PvError {
    /// Reveal the inner error
    pub fn inner(&self) -> Option<&dyn std::error::Error> {
        match self {
            Self::Io { source } => Some(source),
            _ => None,
        }
    }
}

impl<G> From<std::sync::PoisonError<G>> for PvError {
    fn from(_error: std::sync::PoisonError<G>) -> Self {
        Self::Poison
    }
}
