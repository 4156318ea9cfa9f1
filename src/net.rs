//! The optionally TLS-protected byte stream underneath the port client.
//!
//! A [`PortStream`] hides the plain-TCP vs. TLS distinction behind an
//! `"[host]:port"` address and a latched status taxonomy: operations on a
//! failed stream are no-ops until the error is cleared.

mod addr;
mod stream;
#[cfg(feature = "tls")]
mod tls;

pub use stream::PortStream;

/// Status of a [`PortStream`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum StreamStatus {
    /// Success.
    Ok,
    /// Error detected by the underlying I/O or TLS library; the description
    /// is available from [`PortStream::error_message`].
    AskErr,
    /// Illegal state.
    IllegalState,
    /// Illegal argument.
    IllegalArg,
    /// Internal error.
    InternalError,
    /// Server closed.
    ServerClosed,
    /// Bad address.
    BadAddress,
    /// Unknown host.
    UnknownHost,
    /// Untrusted host.
    UntrustedHost,
    /// Unknown error.
    UnknownError,
}

impl std::fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(match self {
            Self::Ok => "ok",
            Self::AskErr => "ask 'ERR'",
            Self::IllegalState => "illegal state",
            Self::IllegalArg => "illegal argument",
            Self::InternalError => "internal error",
            Self::ServerClosed => "server closed",
            Self::BadAddress => "bad address",
            Self::UnknownHost => "unknown host",
            Self::UntrustedHost => "untrusted host",
            Self::UnknownError => "unknown error",
        })
    }
}
