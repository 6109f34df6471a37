use futures::Stream;

use super::ConnectionError;
use crate::imap::codec::ResponseData;

/// Sends one tagged command. The returned stream yields every response up to and including the
/// tagged completion and then ends.
pub trait SendCommand {
    type Responses<'a>: Stream<Item = Result<ResponseData, ConnectionError>> + Unpin
    where
        Self: 'a;

    fn send<'a>(&'a mut self, command: &'a str) -> Self::Responses<'a>;
}
