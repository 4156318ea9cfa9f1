use crate::net::PortStream;
use crate::point_value::State;
use crate::xpvpc::xml::push_encoded;
use crate::xpvpc::Status;
use debug_ignore::DebugIgnore;
use secstr::SecUtf8;

#[cfg(feature = "tls")]
use std::path::Path;

// Matches the smallest buffer the protocol needs; an acknowledgement line
// that does not fit is not an acknowledgement.
const RECEIVE_BUFFER_SIZE: usize = 256;

const RESPONSE_START: &str = "<done ref='";
const RESPONSE_END: &str = "'/>";

/// The XML point-value port client.
///
/// Pushes point-value batches to a remote acceptor over a [`PortStream`] and
/// verifies that each document is acknowledged by id:
///
/// ```text
/// <messages id='N' flush='yes'>
///  <point-value>
///   <point>…</point>
///   <stamp>…</stamp>
///  </point-value>
/// </messages>
/// ```
///
/// is answered by a single line `<done ref='N'/>`. Like the stream, the
/// client latches its first failure; all operations on a failed client are
/// no-ops until [`clear_error`](Self::clear_error).
#[derive(Debug)]
pub struct XpvpcClient {
    client: Option<String>,
    id: i64,
    pending: u32,
    auto_flush: u32,
    stream: PortStream,
    buffer: DebugIgnore<String>,
    status: Status,
}

impl Default for XpvpcClient {
    fn default() -> Self {
        Self::new()
    }
}

impl XpvpcClient {
    pub fn new() -> Self {
        Self {
            client: None,
            id: 0,
            pending: 0,
            auto_flush: 0,
            stream: PortStream::new(),
            buffer: DebugIgnore(String::with_capacity(RECEIVE_BUFFER_SIZE)),
            status: Status::Ok,
        }
    }

    /// Sets the client name sent with [`login`](Self::login).
    pub fn set_client(&mut self, client: Option<&str>) {
        self.client = client.map(str::to_string);
    }

    /// Sets the automatic flush threshold; 0 disables automatic flushing.
    pub fn set_auto_flush(&mut self, auto_flush: u32) {
        if self.is_open() {
            self.flush();
        }
        self.auto_flush = auto_flush;
    }

    /// Configures the trust anchors of the underlying stream.
    #[cfg(feature = "tls")]
    pub fn set_trust(&mut self, file: Option<&Path>, directory: Option<&Path>) {
        self.stream.set_trust(file, directory);
    }

    /// Configures the client certificate of the underlying stream.
    #[cfg(feature = "tls")]
    pub fn set_certificate(&mut self, file: Option<&Path>) {
        self.stream.set_certificate(file);
    }

    /// The underlying stream.
    pub fn stream(&mut self) -> &mut PortStream {
        &mut self.stream
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_open()
    }

    /// The combined status; the client's own status takes precedence over
    /// the stream's.
    pub fn status(&self) -> Status {
        if self.status != Status::Ok {
            return self.status;
        }
        match self.stream.status() {
            crate::net::StreamStatus::Ok => Status::Ok,
            status => Status::Stream(status),
        }
    }

    pub fn failed(&self) -> bool {
        self.status != Status::Ok || self.stream.failed()
    }

    pub fn succeeded(&self) -> bool {
        !self.failed()
    }

    /// Resets the latched status, dropping any pending batch.
    pub fn clear_error(&mut self) {
        self.buffer.clear();
        self.pending = 0;
        self.status = Status::Ok;
        self.stream.clear_error();
    }

    /// A description of the latched failure, or `None` when none is latched.
    pub fn error_message(&self) -> Option<String> {
        if self.status != Status::Ok {
            return Some(self.status.to_string());
        }
        self.stream.error_message()
    }

    /// Connects to `"[host]:port"`.
    pub fn open(&mut self, address: &str) -> Status {
        if self.stream.is_open() {
            self.status = Status::IllegalState;
            return self.status();
        }
        self.status = Status::Ok;
        self.stream.open(address);
        self.status()
    }

    /// Sends a `<login/>` document and awaits its acknowledgement.
    pub fn login(&mut self, user: &str, password: &SecUtf8) -> Status {
        if self.failed() {
            return self.status();
        }
        if !self.is_open() {
            self.status = Status::IllegalState;
            return self.status();
        }

        self.flush();
        if self.failed() {
            return self.status();
        }

        self.id += 1;
        let id = self.id;
        let buffer = &mut *self.buffer;
        buffer.push_str("<login ");
        if let Some(client) = &self.client {
            buffer.push_str("client='");
            push_encoded(buffer, client, Some('\''));
            buffer.push_str("' ");
        }
        buffer.push_str("id='");
        buffer.push_str(&id.to_string());
        buffer.push_str("' user='");
        push_encoded(buffer, user, Some('\''));
        buffer.push_str("' password='");
        push_encoded(buffer, password.unsecure(), Some('\''));
        buffer.push_str("'/>\n");

        self.send_text();
        self.verify_response(id);

        self.status()
    }

    /// Adds a point value to the pending batch, opening the batch when
    /// needed and flushing it when the automatic flush threshold is reached.
    ///
    /// A state of [`State::Deleted`] emits a `<deleted-value>` element
    /// carrying only the point and the stamp.
    pub fn send_value(
        &mut self,
        point: &str,
        stamp: &str,
        state: Option<&State>,
        value: Option<&str>,
    ) -> Status {
        if self.failed() {
            return self.status();
        }
        if !self.is_open() {
            self.status = Status::IllegalState;
            return self.status();
        }
        if point.is_empty() || stamp.is_empty() {
            self.status = Status::IllegalArg;
            return self.status();
        }

        if self.pending == 0 {
            self.id += 1;
            let id = self.id;
            let buffer = &mut *self.buffer;
            buffer.push_str("<messages id='");
            buffer.push_str(&id.to_string());
            buffer.push_str("' flush='yes'>\n");
        }

        let deleted = matches!(state, Some(State::Deleted));
        let element = if deleted { "deleted-value" } else { "point-value" };

        let buffer = &mut *self.buffer;
        buffer.push_str(" <");
        buffer.push_str(element);
        buffer.push_str(">\n  <point>");
        push_encoded(buffer, point, None);
        buffer.push_str("</point>\n  <stamp>");
        push_encoded(buffer, stamp, None);
        buffer.push_str("</stamp>\n");

        if !deleted {
            if let Some(State::Text(state)) = state {
                buffer.push_str("  <state>");
                push_encoded(buffer, state, None);
                buffer.push_str("</state>\n");
            }
            if let Some(value) = value {
                buffer.push_str("  <value>");
                push_encoded(buffer, value, None);
                buffer.push_str("</value>\n");
            }
        }

        buffer.push_str(" </");
        buffer.push_str(element);
        buffer.push_str(">\n");

        self.pending += 1;
        if self.auto_flush > 0 && self.pending >= self.auto_flush {
            self.flush();
        }

        self.status()
    }

    /// Closes the pending batch and awaits its acknowledgement.
    pub fn flush(&mut self) -> Status {
        if self.failed() {
            return self.status();
        }
        if !self.is_open() {
            self.status = Status::IllegalState;
            return self.status();
        }

        if self.pending > 0 {
            self.buffer.push_str("</messages>\n");
            let id = self.id;
            self.send_text();
            self.verify_response(id);
            self.pending = 0;
        }

        self.status()
    }

    /// Flushes when the session is clean, then closes the stream. Closing a
    /// closed client only clears its error state.
    pub fn close(&mut self) -> Status {
        if !self.stream.is_open() {
            self.clear_error();
            return self.status();
        }

        if self.succeeded() {
            self.flush();
        } else {
            self.status = Status::Ok;
        }

        self.stream.close();
        self.status()
    }

    fn send_text(&mut self) {
        if self.failed() {
            self.buffer.clear();
            return;
        }

        let text = std::mem::take(&mut *self.buffer);
        let bytes = text.as_bytes();
        let mut position = 0;

        while position < bytes.len() {
            let count = self.stream.send(&bytes[position..]);
            if self.stream.failed() {
                break;
            }
            position += count;
        }
    }

    // Reads one acknowledgement line and verifies `<done ref='N'/>`.
    fn verify_response(&mut self, expected_id: i64) {
        if self.failed() {
            return;
        }

        let Some(line) = self.receive_line() else {
            return;
        };

        let Some(rest) = line.strip_prefix(RESPONSE_START) else {
            self.status = Status::UnexpectedResponse;
            return;
        };
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let received_id = rest[..digits_end].parse::<i64>().unwrap_or(0);
        if !rest[digits_end..].starts_with(RESPONSE_END) {
            self.status = Status::UnexpectedResponse;
            return;
        }

        if received_id != expected_id {
            self.status = Status::MismatchedId;
        }
    }

    fn receive_line(&mut self) -> Option<String> {
        let mut buffer = [0_u8; RECEIVE_BUFFER_SIZE];
        let mut limit = 0;

        while limit < RECEIVE_BUFFER_SIZE - 1 {
            let count = self.stream.receive(&mut buffer[limit..RECEIVE_BUFFER_SIZE - 1]);
            if self.stream.failed() {
                return None;
            }
            if limit + count >= RECEIVE_BUFFER_SIZE - 1 {
                self.status = Status::InternalError;
                return None;
            }

            for index in limit..limit + count {
                if buffer[index] == b'\n' {
                    return Some(String::from_utf8_lossy(&buffer[..index]).into_owned());
                }
            }
            limit += count;
        }

        self.status = Status::UnexpectedResponse;
        None
    }
}

impl Drop for XpvpcClient {
    fn drop(&mut self) {
        self.close();
    }
}
