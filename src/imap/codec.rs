use std::io;

use bytes::{Buf as _, BufMut as _, BytesMut};
use imap_proto::{Request, RequestId, Response};
use tokio_util::codec::{Decoder, Encoder};

/// Frames a byte stream into parsed IMAP responses and serializes tagged requests.
#[derive(Debug, Default)]
pub struct ImapCodec;

/// One complete server response, detached from the receive buffer.
#[derive(Debug)]
pub struct ResponseData {
    response: Response<'static>,
}

impl ResponseData {
    pub fn parsed(&self) -> &Response<'static> {
        &self.response
    }

    /// The tag of a tagged completion response.
    pub fn request_id(&self) -> Option<&RequestId> {
        if let Response::Done { tag, .. } = &self.response {
            Some(tag)
        } else {
            None
        }
    }
}

impl TryFrom<&[u8]> for ResponseData {
    type Error = io::Error;

    fn try_from(raw: &[u8]) -> Result<Self, Self::Error> {
        match parse_frame(raw)? {
            Some((_, response)) => Ok(response),
            None => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "incomplete response",
            )),
        }
    }
}

fn parse_frame(buf: &[u8]) -> io::Result<Option<(usize, ResponseData)>> {
    match imap_proto::parser::parse_response(buf) {
        Ok((rest, response)) => {
            let consumed = buf.len() - rest.len();
            Ok(Some((
                consumed,
                ResponseData {
                    response: response.into_owned(),
                },
            )))
        }
        Err(nom::Err::Incomplete(_)) => Ok(None),
        Err(nom::Err::Error(err) | nom::Err::Failure(err)) => {
            let line = err.input.split(|byte| *byte == b'\n').next().unwrap_or_default();
            Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "unparseable response ({:?}): {}",
                    err.code,
                    String::from_utf8_lossy(line).trim_end()
                ),
            ))
        }
    }
}

impl Decoder for ImapCodec {
    type Item = ResponseData;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        let Some((consumed, response)) = parse_frame(src)? else {
            return Ok(None);
        };
        src.advance(consumed);
        Ok(Some(response))
    }
}

impl Encoder<Request<'_>> for ImapCodec {
    type Error = io::Error;

    fn encode(&mut self, request: Request<'_>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let Request(tag, command) = request;
        dst.reserve(tag.len() + command.len() + 3);
        if !tag.is_empty() {
            dst.put_slice(&tag);
            dst.put_u8(b' ');
        }
        dst.put_slice(&command);
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
