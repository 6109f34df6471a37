mod mailbox_path;
mod search;
mod sequence_set;
mod uid;

pub use mailbox_path::MailboxPath;
pub use search::SearchQuery;
pub use sequence_set::SequenceSet;
pub use uid::SeqNum;
pub use uid::Uid;
pub use uid::ZeroNumberError;
