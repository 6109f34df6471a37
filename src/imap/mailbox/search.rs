use std::fmt::{Display, Formatter};

use jiff::civil::Date;

use crate::{imap::quoting::quoted, validate::Address};

/// Criteria for `UID SEARCH`. Free text only enters through an already validated [`Address`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    All,
    From(Address),
    /// Messages whose Date header is before the given day; the server compares dates only.
    SentBefore(Date),
}

impl Display for SearchQuery {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchQuery::All => f.write_str("ALL"),
            SearchQuery::From(address) => write!(f, "FROM {}", quoted(address.as_str())),
            SearchQuery::SentBefore(date) => write!(f, "SENTBEFORE {}", date.strftime("%d-%b-%Y")),
        }
    }
}
