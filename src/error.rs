use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::{folders::FolderRole, imap::ConnectionError, validate::ValidationError};

pub type Result<T> = std::result::Result<T, Error>;

/// Non-OK completion status of a tagged command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    No,
    Bad,
}

impl Display for Rejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::No => f.write_str("NO"),
            Rejection::Bad => f.write_str("BAD"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("server rejected the credentials: {0}")]
    Authentication(String),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error("{command} answered {status}: {information}")]
    Protocol {
        command: String,
        status: Rejection,
        information: String,
    },
    #[error(
        "batch {batch}: resolved {resolved} sequence numbers for {requested} UIDs, the mailbox was changed by another client"
    )]
    ResolutionMismatch {
        batch: usize,
        requested: usize,
        resolved: usize,
    },
    #[error("no {role} folder found; available folders: {}", available.join(", "))]
    FolderNotFound {
        role: FolderRole,
        available: Vec<String>,
    },
    #[error("batch {batch} failed after {processed} of {total} messages were processed")]
    Interrupted {
        batch: usize,
        processed: usize,
        total: usize,
        #[source]
        source: Box<Error>,
    },
    #[error("cancelled after {processed} of {total} messages")]
    Cancelled { processed: usize, total: usize },
    #[error("no mailbox selected")]
    NotSelected,
    #[error("{0} is selected read-only")]
    ReadOnly(String),
}

impl Error {
    /// The failure itself, looking through batch context.
    pub fn root(&self) -> &Error {
        match self {
            Error::Interrupted { source, .. } => source.root(),
            other => other,
        }
    }
}
