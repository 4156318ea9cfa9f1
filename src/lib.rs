//! Native endpoints for a data-historian framework.
//!
//! This crate packages the plumbing that external executables and libraries
//! use to exchange time-stamped point values with the framework:
//!
//! * [`pipe`] — the line-oriented text protocol spoken by a child process
//!   acting as a transform engine or as a sink, over stdin/stdout;
//! * [`xpvpc`] — the XML point-value port client, which pushes point-value
//!   batches to a remote acceptor and verifies per-batch acknowledgements;
//! * [`net`] — the optionally TLS-protected byte stream underneath the port
//!   client;
//! * [`store`] — the typed value codec and the store-bridge contracts shared
//!   with hosted storage runtimes.
//!
//! Each endpoint is synchronous and single-threaded; concurrency, if any,
//! belongs to the embedding program.

#![deny(missing_debug_implementations)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde;

pub mod logging;
pub mod net;
pub mod pipe;
mod point_value;
mod pv_error;
pub mod store;
pub mod xpvpc;

pub use crate::point_value::{PointValue, State, DELETED_STATE};
pub use crate::pv_error::{PvError, PvResult};
