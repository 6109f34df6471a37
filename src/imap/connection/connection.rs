use futures::StreamExt as _;
use log::{debug, trace};
use tokio::net::TcpStream;
use tokio_native_tls::{TlsConnector, TlsStream, native_tls};
use tokio_util::codec::Framed;

use super::{ConnectionError, SendCommand, response_stream::ResponseStream};
use crate::imap::{
    codec::{ImapCodec, ResponseData},
    tag_generator::TagGenerator,
};

pub type ImapStream = Framed<TlsStream<TcpStream>, ImapCodec>;

pub struct Connection {
    stream: ImapStream,
    tag_generator: TagGenerator,
}

impl Connection {
    /// Opens an implicit-TLS connection and returns it together with the server greeting.
    pub async fn connect_to(host: &str, port: u16) -> Result<(Self, ResponseData), ConnectionError> {
        debug!("connecting to {host}:{port}");
        let tls = native_tls::TlsConnector::new().map_err(|source| ConnectionError::Tls {
            host: host.to_string(),
            source,
        })?;
        let tls = TlsConnector::from(tls);
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|source| ConnectionError::Connect {
                host: host.to_string(),
                port,
                source,
            })?;
        let stream = tls
            .connect(host, stream)
            .await
            .map_err(|source| ConnectionError::Tls {
                host: host.to_string(),
                source,
            })?;

        let mut stream = Framed::new(stream, ImapCodec);

        let greeting = stream.next().await.ok_or(ConnectionError::Closed)??;
        trace!("greeting = {:?}", greeting.parsed());

        Ok((
            Connection {
                stream,
                tag_generator: TagGenerator::default(),
            },
            greeting,
        ))
    }
}

impl SendCommand for Connection {
    type Responses<'a> = ResponseStream<'a>;

    fn send<'a>(&'a mut self, command: &'a str) -> Self::Responses<'a> {
        ResponseStream::new(&mut self.stream, &mut self.tag_generator, command)
    }
}
