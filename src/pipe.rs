//! The line-oriented protocol between the framework and a child process
//! acting as a transform engine or as a sink.
//!
//! The child consumes newline-terminated requests on its standard input and
//! emits responses on its standard output. An engine request frame is
//!
//! ```text
//! <reqID> <ver> <nT> <nP> <nI>
//! <resultSeed-PointValue>
//! <transformParam-1..nT>
//! <pointParam-1..nP>
//! <input-1..nI-PointValue>
//! ```
//!
//! and a sink request frame is
//!
//! ```text
//! <reqID> <ver> (+|-)
//! <PointValue>
//! ```
//!
//! A line consisting solely of `0`, or end of input, terminates the request
//! stream gracefully. Drivers loop with [`serve_engine`] / [`serve_sink`] and
//! return [`PipeStatus::exit_code`] from `main`.

mod engine_request;
mod line_input;
mod point_value_line;
mod sink_request;

pub use engine_request::EngineRequest;
pub use sink_request::{SinkRequest, SinkRequestType};

use crate::pipe::line_input::{parse_decimal, FieldCursor, LineInput};
use crate::pipe::point_value_line::{format_point_value, parse_point_value};
use std::io::{BufRead, BufReader, Write};
use thiserror::Error;

/// Highest engine request format version understood by this endpoint.
pub const ENGINE_REQUEST_FORMAT_VERSION: i32 = 1;

/// Highest sink request format version understood by this endpoint.
pub const SINK_REQUEST_FORMAT_VERSION: i32 = 1;

const SINK_UPDATE_REQUEST_TYPE: &str = "+";
const SINK_DELETE_REQUEST_TYPE: &str = "-";

/// Terminal status of a pipe endpoint, returned by the drivers from `main`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[repr(i32)]
pub enum PipeStatus {
    /// Graceful end of the request stream.
    Ok = 0,
    /// A recoverable, per-request error.
    Error = 1,
    /// The endpoint cannot continue.
    Fatal = 2,
}

impl PipeStatus {
    /// The process exit code for this status.
    pub fn exit_code(self) -> i32 {
        self as i32
    }
}

/// Errors raised while parsing requests or emitting responses.
///
/// Everything except I/O failure is recoverable: the driver logs it and
/// accepts the next request.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PipeError {
    /// End of input in the middle of a request frame.
    #[error("Unexpected end of input")]
    UnexpectedEndOfInput,

    /// A required field is missing from a request line.
    #[error("Unexpected request format")]
    UnexpectedFormat,

    /// A count or version field is not a complete decimal number.
    #[error("Bad decimal string '{}'", _0)]
    BadDecimal(String),

    /// The request announces a format version newer than this endpoint.
    #[error("Unsupported request format version: {}", _0)]
    UnsupportedVersion(i32),

    /// The sink request type is neither `+` nor `-`.
    #[error("Unsupported request type '{}'", _0)]
    UnsupportedRequestType(String),

    /// An extra result without a point name.
    #[error("Missing point name")]
    MissingPointName,

    /// An extra result without a time stamp.
    #[error("Missing time stamp")]
    MissingStamp,

    /// The state of a cleared result cannot be set.
    #[error("Can't set the state of a cleared result!")]
    ClearedResultState,

    /// The value of a cleared result cannot be set.
    #[error("Can't set the value of a cleared result!")]
    ClearedResultValue,

    /// The input or output stream failed.
    #[error(transparent)]
    Io {
        /// The causing Error.
        #[from]
        source: std::io::Error,
    },
}

impl PipeError {
    /// The endpoint status this error maps to.
    pub fn status(&self) -> PipeStatus {
        match self {
            Self::Io { .. } => PipeStatus::Fatal,
            _ => PipeStatus::Error,
        }
    }
}

/// Abbreviation of `Result<T, PipeError>`.
pub type PipeResult<T> = std::result::Result<T, PipeError>;

/// One side of the pipe protocol: reads request frames, writes responses.
///
/// The endpoint assumes exclusive ownership of its streams; requests are
/// processed strictly in arrival order and each response is emitted and
/// flushed before the next request is read.
pub struct PipeEndpoint<R, W> {
    input: LineInput<R>,
    output: W,
}

impl<R, W> std::fmt::Debug for PipeEndpoint<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "PipeEndpoint {{ .. }}")
    }
}

impl PipeEndpoint<BufReader<std::io::Stdin>, std::io::Stdout> {
    /// An endpoint over this process' standard input and output.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(std::io::stdin()), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> PipeEndpoint<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: LineInput::new(input),
            output,
        }
    }

    /// Releases the output stream, for drivers that own it.
    pub fn into_output(self) -> W {
        self.output
    }

    /// Reads the next engine request, or `None` at graceful end.
    pub fn next_engine_request(&mut self) -> PipeResult<Option<EngineRequest>> {
        let Some(first) = self.first_line()? else {
            return Ok(None);
        };
        let mut fields = FieldCursor::new(first);

        let request_id = fields.require_field()?;
        let version = parse_decimal(&fields.require_field()?)?;
        if version > ENGINE_REQUEST_FORMAT_VERSION {
            return Err(PipeError::UnsupportedVersion(version));
        }
        let transform_param_count = parse_decimal(&fields.require_field()?)?;
        let point_param_count = parse_decimal(&fields.require_field()?)?;
        let input_count = parse_decimal(&fields.require_field()?)?;

        let seed_line = self.require_line()?;
        let result = parse_point_value(&seed_line, true)?;

        let mut transform_params = Vec::new();
        for _ in 0..transform_param_count {
            transform_params.push(self.require_line()?);
        }

        let mut point_params = Vec::new();
        for _ in 0..point_param_count {
            point_params.push(self.require_line()?);
        }

        let mut inputs = Vec::new();
        for _ in 0..input_count {
            let line = self.require_line()?;
            inputs.push(parse_point_value(&line, false)?);
        }

        Ok(Some(EngineRequest {
            request_id,
            version,
            transform_params,
            point_params,
            inputs,
            result: Some(result),
            extra_results: Vec::new(),
        }))
    }

    /// Emits the engine response and consumes the request.
    pub fn end_engine_request(&mut self, request: EngineRequest) -> PipeResult<()> {
        let summary = request.summary();

        let mut line = String::new();
        line.push_str(&request.request_id);
        line.push(' ');
        line.push_str(&summary.to_string());
        self.emit_line(&line)?;

        if summary > 0 {
            for extra in &request.extra_results {
                line.clear();
                format_point_value(extra, &mut line);
                self.emit_line(&line)?;
            }
            if let Some(result) = &request.result {
                line.clear();
                format_point_value(result, &mut line);
                self.emit_line(&line)?;
            }
        }

        Ok(())
    }

    /// Reads the next sink request, or `None` at graceful end.
    pub fn next_sink_request(&mut self) -> PipeResult<Option<SinkRequest>> {
        let Some(first) = self.first_line()? else {
            return Ok(None);
        };
        let mut fields = FieldCursor::new(first);

        let request_id = fields.require_field()?;
        let version = parse_decimal(&fields.require_field()?)?;
        if version > SINK_REQUEST_FORMAT_VERSION {
            return Err(PipeError::UnsupportedVersion(version));
        }

        let type_field = fields.require_field()?;
        let request_type = match type_field.as_str() {
            SINK_UPDATE_REQUEST_TYPE => SinkRequestType::Update,
            SINK_DELETE_REQUEST_TYPE => SinkRequestType::Delete,
            _ => return Err(PipeError::UnsupportedRequestType(type_field)),
        };

        let line = self.require_line()?;
        let point_value = parse_point_value(&line, request_type == SinkRequestType::Update)?;

        Ok(Some(SinkRequest {
            request_id,
            version,
            request_type,
            point_value,
        }))
    }

    /// Emits the sink response and consumes the request.
    pub fn end_sink_request(&mut self, request: SinkRequest, summary: i32) -> PipeResult<()> {
        let mut line = String::new();
        line.push_str(&request.request_id);
        line.push(' ');
        line.push_str(&summary.to_string());
        self.emit_line(&line)
    }

    // A request header line, which must contain at least one space. A bare
    // `0` or end of input ends the stream; any other solitary token is
    // echoed back and skipped.
    fn first_line(&mut self) -> PipeResult<Option<String>> {
        loop {
            let Some(line) = self.input.next_line(false)? else {
                return Ok(None);
            };
            if line.contains(' ') {
                return Ok(Some(line));
            }
            if line == "0" {
                return Ok(None);
            }
            self.emit_line(&line)?;
        }
    }

    fn require_line(&mut self) -> PipeResult<String> {
        self.input
            .next_line(true)?
            .ok_or(PipeError::UnexpectedEndOfInput)
    }

    fn emit_line(&mut self, line: &str) -> PipeResult<()> {
        self.output.write_all(line.as_bytes())?;
        self.output.write_all(b"\n")?;
        self.output.flush()?;
        trace!("Sent: {{{line}}}");
        Ok(())
    }
}

/// Serves engine requests until graceful end or a fatal error.
///
/// Recoverable errors, from the parser or from the handler, are logged and
/// the loop accepts the next request; a handler error abandons its request
/// without emitting a response.
pub fn serve_engine<R, W, F>(endpoint: &mut PipeEndpoint<R, W>, mut handler: F) -> PipeStatus
where
    R: BufRead,
    W: Write,
    F: FnMut(&mut EngineRequest) -> PipeResult<()>,
{
    loop {
        let outcome = match endpoint.next_engine_request() {
            Ok(None) => {
                debug!("End of engine requests");
                return PipeStatus::Ok;
            }
            Ok(Some(mut request)) => {
                handler(&mut request).and_then(|()| endpoint.end_engine_request(request))
            }
            Err(error) => Err(error),
        };

        if let Err(error) = outcome {
            error!("{error}");
            if error.status() == PipeStatus::Fatal {
                return PipeStatus::Fatal;
            }
        }
    }
}

/// Serves sink requests until graceful end or a fatal error.
///
/// The handler returns the response summary, conventionally the number of
/// rows affected, negative on failure. Recoverable errors are logged and the
/// loop accepts the next request.
pub fn serve_sink<R, W, F>(endpoint: &mut PipeEndpoint<R, W>, mut handler: F) -> PipeStatus
where
    R: BufRead,
    W: Write,
    F: FnMut(&SinkRequest) -> PipeResult<i32>,
{
    loop {
        let outcome = match endpoint.next_sink_request() {
            Ok(None) => {
                debug!("End of sink requests");
                return PipeStatus::Ok;
            }
            Ok(Some(request)) => handler(&request)
                .and_then(|summary| endpoint.end_sink_request(request, summary)),
            Err(error) => Err(error),
        };

        if let Err(error) = outcome {
            error!("{error}");
            if error.status() == PipeStatus::Fatal {
                return PipeStatus::Fatal;
            }
        }
    }
}
