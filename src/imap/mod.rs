mod codec;
mod connection;
mod mailbox;
mod quoting;
mod session;
mod tag_generator;

pub use codec::ResponseData;
pub use connection::Connection;
pub use connection::ConnectionError;
pub use connection::SendCommand;
#[cfg(test)]
pub use connection::mock_connection;
pub use mailbox::MailboxPath;
pub use mailbox::SearchQuery;
pub use mailbox::SeqNum;
pub use mailbox::SequenceSet;
pub use mailbox::Uid;
pub use mailbox::ZeroNumberError;
pub use session::Access;
pub use session::FolderAttribute;
pub use session::ListEntry;
pub use session::Selection;
pub use session::Session;
