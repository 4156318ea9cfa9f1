//! The XML point-value port client.
//!
//! A unidirectional push protocol: the client emits `<login/>` and
//! `<messages>` documents over a [`PortStream`](crate::net::PortStream) and
//! reads exactly one `<done ref='N'/>` acknowledgement line per document,
//! verifying the echoed id. Session life cycle:
//!
//! ```text
//! new → set_client? → set_trust?/set_certificate? → open → login
//!     → send_value* (flush?)* → close
//! ```
//!
//! Any transition outside this order latches [`Status::IllegalState`].

mod client;
mod xml;

pub use client::XpvpcClient;

use crate::net::StreamStatus;

/// Status of an [`XpvpcClient`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum Status {
    /// Success.
    Ok,
    /// Illegal state.
    IllegalState,
    /// Illegal argument.
    IllegalArg,
    /// Internal error.
    InternalError,
    /// Unexpected response from the server.
    UnexpectedResponse,
    /// The acknowledged id differs from the id just sent.
    MismatchedId,
    /// Unknown error.
    UnknownError,
    /// A failure latched by the underlying stream.
    Stream(StreamStatus),
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Ok => f.write_str("ok"),
            Self::IllegalState => f.write_str("illegal state"),
            Self::IllegalArg => f.write_str("illegal argument"),
            Self::InternalError => f.write_str("internal error"),
            Self::UnexpectedResponse => f.write_str("unexpected response"),
            Self::MismatchedId => f.write_str("mismatched id"),
            Self::UnknownError => f.write_str("unknown error"),
            Self::Stream(status) => std::fmt::Display::fmt(status, f),
        }
    }
}
