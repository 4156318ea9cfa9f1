use crate::net::{addr, StreamStatus};
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

#[cfg(feature = "tls")]
use crate::net::tls::TlsSettings;
#[cfg(feature = "tls")]
use std::path::Path;
#[cfg(feature = "tls")]
use std::sync::Arc;

/// An address-parsed byte stream, plain TCP or TLS.
///
/// The stream latches the first failure: once any operation fails, all
/// subsequent operations short-circuit until [`clear_error`](Self::clear_error)
/// is called. Configuring a trust file, a trust directory, the bundled root
/// certificates, or a client certificate before [`open`](Self::open) switches
/// the endpoint to TLS.
pub struct PortStream {
    #[cfg(feature = "tls")]
    tls: TlsSettings,
    state: StreamState,
    status: StreamStatus,
    detail: Option<String>,
}

enum StreamState {
    Closed,
    Plain(TcpStream),
    #[cfg(feature = "tls")]
    Tls(Box<rustls::StreamOwned<rustls::ClientConnection, TcpStream>>),
}

impl std::fmt::Debug for PortStream {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let state = match self.state {
            StreamState::Closed => "closed",
            StreamState::Plain(_) => "plain",
            #[cfg(feature = "tls")]
            StreamState::Tls(_) => "tls",
        };
        write!(f, "PortStream {{ state: {state}, status: {:?} }}", self.status)
    }
}

impl Default for PortStream {
    fn default() -> Self {
        Self::new()
    }
}

impl PortStream {
    pub fn new() -> Self {
        Self {
            #[cfg(feature = "tls")]
            tls: TlsSettings::default(),
            state: StreamState::Closed,
            status: StreamStatus::Ok,
            detail: None,
        }
    }

    /// Whether this build carries TLS support.
    pub fn tls_enabled() -> bool {
        cfg!(feature = "tls")
    }

    /// Configures the trust anchors: a PEM file and/or a directory of
    /// `*.pem` files. Requires the peer to present a verifiable certificate.
    #[cfg(feature = "tls")]
    pub fn set_trust(&mut self, file: Option<&Path>, directory: Option<&Path>) {
        if self.succeeded() {
            self.tls.trust_file = file.map(Path::to_path_buf);
            self.tls.trust_directory = directory.map(Path::to_path_buf);
        }
    }

    /// Adds the bundled `webpki` server roots to the trust anchors.
    #[cfg(feature = "tls")]
    pub fn use_root_certificates(&mut self) {
        if self.succeeded() {
            self.tls.use_root_certificates = true;
        }
    }

    /// Configures the client certificate: a PEM file carrying the chain and
    /// the private key.
    #[cfg(feature = "tls")]
    pub fn set_certificate(&mut self, file: Option<&Path>) {
        if self.succeeded() {
            self.tls.certificate_file = file.map(Path::to_path_buf);
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, StreamState::Closed)
    }

    pub fn status(&self) -> StreamStatus {
        self.status
    }

    pub fn failed(&self) -> bool {
        self.status != StreamStatus::Ok
    }

    pub fn succeeded(&self) -> bool {
        self.status == StreamStatus::Ok
    }

    /// Resets the latched status.
    pub fn clear_error(&mut self) {
        self.status = StreamStatus::Ok;
        self.detail = None;
    }

    /// A description of the latched failure, or `None` when none is latched.
    ///
    /// For [`StreamStatus::AskErr`] this is the message drained from the
    /// underlying I/O or TLS library.
    pub fn error_message(&self) -> Option<String> {
        match self.status {
            StreamStatus::Ok => None,
            StreamStatus::AskErr => Some(
                self.detail
                    .clone()
                    .unwrap_or_else(|| self.status.to_string()),
            ),
            status => Some(status.to_string()),
        }
    }

    /// Connects to `"[host]:port"`, performing the TLS handshake when the
    /// endpoint is configured for TLS.
    pub fn open(&mut self, address: &str) -> StreamStatus {
        if self.is_open() {
            return self.fail(StreamStatus::IllegalState);
        }
        self.clear_error();

        let Some(address) = addr::parse(address) else {
            return self.fail(StreamStatus::BadAddress);
        };

        debug!("Connecting to {address}");
        let socket_addrs = match (address.host.as_str(), address.port).to_socket_addrs() {
            Ok(socket_addrs) => socket_addrs.collect::<Vec<_>>(),
            Err(error) => {
                self.detail = Some(error.to_string());
                return self.fail(StreamStatus::UnknownHost);
            }
        };
        if socket_addrs.is_empty() {
            return self.fail(StreamStatus::UnknownHost);
        }

        let tcp = match TcpStream::connect(socket_addrs.as_slice()) {
            Ok(tcp) => tcp,
            Err(error) => {
                self.detail = Some(error.to_string());
                return self.fail(StreamStatus::AskErr);
            }
        };

        #[cfg(feature = "tls")]
        if self.tls.is_tls() {
            return self.open_tls(&address.host, tcp);
        }

        self.state = StreamState::Plain(tcp);
        self.status
    }

    #[cfg(feature = "tls")]
    fn open_tls(&mut self, host: &str, mut tcp: TcpStream) -> StreamStatus {
        let config = match self.tls.client_config() {
            Ok(config) => config,
            Err(error) => {
                self.detail = Some(error.to_string());
                return self.fail(StreamStatus::AskErr);
            }
        };

        let Ok(server_name) = rustls::client::ServerName::try_from(host) else {
            return self.fail(StreamStatus::BadAddress);
        };

        let mut connection = match rustls::ClientConnection::new(Arc::new(config), server_name) {
            Ok(connection) => connection,
            Err(error) => {
                self.detail = Some(error.to_string());
                return self.fail(StreamStatus::AskErr);
            }
        };

        while connection.is_handshaking() {
            if let Err(error) = connection.complete_io(&mut tcp) {
                let untrusted = error
                    .get_ref()
                    .and_then(|inner| inner.downcast_ref::<rustls::Error>())
                    .map_or(false, |tls_error| {
                        matches!(tls_error, rustls::Error::InvalidCertificate(_))
                    });
                if untrusted {
                    return self.fail(StreamStatus::UntrustedHost);
                }
                self.detail = Some(error.to_string());
                return self.fail(StreamStatus::AskErr);
            }
        }

        if self.tls.is_verified() && connection.peer_certificates().is_none() {
            return self.fail(StreamStatus::UntrustedHost);
        }

        debug!("TLS session established with {host}");
        self.state = StreamState::Tls(Box::new(rustls::StreamOwned::new(connection, tcp)));
        self.status
    }

    /// Closes the stream. Closing a closed stream is a no-op.
    pub fn close(&mut self) -> StreamStatus {
        match std::mem::replace(&mut self.state, StreamState::Closed) {
            StreamState::Closed | StreamState::Plain(_) => {}
            #[cfg(feature = "tls")]
            StreamState::Tls(mut tls) => {
                tls.conn.send_close_notify();
                let _ = tls.flush();
            }
        }
        self.status
    }

    /// Sends bytes, returning the count written. On failure the count is 0
    /// and the status is latched.
    pub fn send(&mut self, buffer: &[u8]) -> usize {
        if self.failed() {
            return 0;
        }
        if buffer.is_empty() {
            self.fail(StreamStatus::IllegalArg);
            return 0;
        }

        let outcome = match &mut self.state {
            StreamState::Closed => Err(StreamStatus::IllegalState),
            StreamState::Plain(tcp) => Ok(tcp.write(buffer)),
            #[cfg(feature = "tls")]
            StreamState::Tls(tls) => Ok(tls.write(buffer)),
        };

        match outcome {
            Ok(Ok(0)) => {
                self.fail(StreamStatus::InternalError);
                0
            }
            Ok(Ok(count)) => count,
            Ok(Err(error)) => {
                self.detail = Some(error.to_string());
                self.fail(StreamStatus::AskErr);
                0
            }
            Err(status) => {
                self.fail(status);
                0
            }
        }
    }

    /// Receives bytes, returning the count read. A count of 0 with status
    /// [`StreamStatus::ServerClosed`] means the peer closed the stream.
    pub fn receive(&mut self, buffer: &mut [u8]) -> usize {
        if self.failed() {
            return 0;
        }
        if buffer.is_empty() {
            self.fail(StreamStatus::IllegalArg);
            return 0;
        }

        let outcome = match &mut self.state {
            StreamState::Closed => Err(StreamStatus::IllegalState),
            StreamState::Plain(tcp) => Ok(tcp.read(buffer)),
            #[cfg(feature = "tls")]
            StreamState::Tls(tls) => Ok(tls.read(buffer)),
        };

        match outcome {
            Ok(Ok(0)) => {
                self.fail(StreamStatus::ServerClosed);
                0
            }
            Ok(Ok(count)) => count,
            Ok(Err(error)) => {
                self.detail = Some(error.to_string());
                self.fail(StreamStatus::AskErr);
                0
            }
            Err(status) => {
                self.fail(status);
                0
            }
        }
    }

    fn fail(&mut self, status: StreamStatus) -> StreamStatus {
        self.status = status;
        status
    }
}
