use std::{
    borrow::Cow,
    io,
    pin::Pin,
    task::{Context, Poll, ready},
};

use futures::{Sink, Stream, StreamExt as _};
use imap_proto::Request;

use super::{ConnectionError, connection::ImapStream};
use crate::imap::{codec::ResponseData, tag_generator::TagGenerator};

enum ResponseStreamState {
    Start,
    Sending,
    Receiving,
    Done,
}

pub struct ResponseStream<'a> {
    imap_stream: &'a mut ImapStream,
    state: ResponseStreamState,
    tag_generator: &'a mut TagGenerator,
    tag: String,
    command: &'a str,
}

impl<'a> ResponseStream<'a> {
    pub fn new(
        imap_stream: &'a mut ImapStream,
        tag_generator: &'a mut TagGenerator,
        command: &'a str,
    ) -> Self {
        Self {
            imap_stream,
            state: ResponseStreamState::Start,
            tag_generator,
            tag: String::with_capacity(0),
            command,
        }
    }

    fn start_sending(&mut self) -> io::Result<()> {
        let tag = self.tag_generator.next();
        let request = Request(
            Cow::Owned(tag.clone().into_bytes()),
            Cow::Owned(self.command.as_bytes().to_vec()),
        );
        Pin::new(&mut *self.imap_stream).start_send(request)?;
        self.tag = tag;
        self.state = ResponseStreamState::Sending;
        Ok(())
    }

    fn fail(&mut self, error: impl Into<ConnectionError>) -> Poll<Option<<Self as Stream>::Item>> {
        self.state = ResponseStreamState::Done;
        Poll::Ready(Some(Err(error.into())))
    }
}

impl Stream for ResponseStream<'_> {
    type Item = Result<ResponseData, ConnectionError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match self.state {
                ResponseStreamState::Start => {
                    let ready = ready!(<ImapStream as Sink<Request<'static>>>::poll_ready(
                        Pin::new(&mut *self.imap_stream),
                        cx
                    ));
                    if let Err(e) = ready.and_then(|()| self.start_sending()) {
                        return self.fail(e);
                    }
                }
                ResponseStreamState::Sending => {
                    let flushed = ready!(<ImapStream as Sink<Request<'static>>>::poll_flush(
                        Pin::new(&mut *self.imap_stream),
                        cx
                    ));
                    if let Err(e) = flushed {
                        return self.fail(e);
                    }
                    self.state = ResponseStreamState::Receiving;
                }
                ResponseStreamState::Receiving => {
                    match ready!(self.imap_stream.poll_next_unpin(cx)) {
                        None => return self.fail(ConnectionError::Closed),
                        Some(Ok(data)) => {
                            if let Some(tag) = data.request_id() {
                                if tag.0 != self.tag {
                                    let mismatch = ConnectionError::TagMismatch {
                                        expected: self.tag.clone(),
                                        received: tag.0.clone(),
                                    };
                                    return self.fail(mismatch);
                                }
                                self.state = ResponseStreamState::Done;
                            }
                            return Poll::Ready(Some(Ok(data)));
                        }
                        Some(Err(e)) => return self.fail(e),
                    }
                }
                ResponseStreamState::Done => return Poll::Ready(None),
            }
        }
    }
}
