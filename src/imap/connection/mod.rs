#[expect(clippy::module_inception)]
mod connection;
mod response_stream;
mod send_command;

use std::io;

use thiserror::Error;

pub use connection::Connection;
pub use send_command::SendCommand;
#[cfg(test)]
pub mod mock_connection;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("cannot reach {host}:{port}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },
    #[error("tls handshake with {host} failed")]
    Tls {
        host: String,
        #[source]
        source: tokio_native_tls::native_tls::Error,
    },
    #[error("transport failure")]
    Io(#[from] io::Error),
    #[error("server closed the connection")]
    Closed,
    #[error("server refused the session: {0}")]
    Refused(String),
    #[error("expected completion for tag {expected}, received {received}")]
    TagMismatch { expected: String, received: String },
}
