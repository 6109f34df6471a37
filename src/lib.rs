mod batch;
mod cleaner;
mod connector;
mod error;
mod folders;
mod imap;
mod mutator;
mod progress;
mod resolver;
mod senders;
mod unsubscribe;
mod validate;

pub use batch::BatchLimits;
pub use cleaner::{Cleaner, PruneAction, threshold_date};
pub use connector::{Connector, Credentials, DEFAULT_PORT, ImapConnector, with_session};
pub use error::{Error, Rejection, Result};
pub use folders::{FolderCatalog, FolderDescriptor, FolderRole, count_messages};
pub use imap::{
    Access, Connection, ConnectionError, FolderAttribute, ListEntry, MailboxPath, ResponseData,
    SearchQuery, SendCommand, SeqNum, Selection, SequenceSet, Session, Uid, ZeroNumberError,
};
pub use mutator::{MutationOutcome, move_messages, purge_messages};
pub use progress::{BatchProgress, Progress};
pub use resolver::resolve_sequence_numbers;
pub use senders::{SenderRecord, SenderReport, aggregate_senders};
pub use unsubscribe::find_unsubscribe_link;
pub use validate::{Address, ValidationError, is_valid_address, validate_address, validate_app_password};
