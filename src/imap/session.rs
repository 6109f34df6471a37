use std::fmt::{Debug, Formatter};

use derive_builder::Builder;
use derive_getters::Getters;
use enumflags2::{BitFlags, bitflags};
use futures::StreamExt as _;
use imap_proto::{AttributeValue, MailboxDatum, NameAttribute, Response, ResponseCode, Status};
use log::{debug, trace, warn};

use crate::{
    error::{Error, Rejection, Result},
    imap::{
        ConnectionError, SendCommand,
        mailbox::{MailboxPath, SearchQuery, SeqNum, SequenceSet, Uid},
        quoting::astring,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

/// The currently selected mailbox. `exists` follows untagged EXISTS and EXPUNGE responses.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Builder)]
pub struct Selection {
    mailbox: MailboxPath,
    #[getter(skip)]
    access: Access,
    exists: u32,
}

impl Selection {
    pub fn access(&self) -> Access {
        self.access
    }
}

#[bitflags]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FolderAttribute {
    NoSelect,
    NoInferiors,
    HasChildren,
    HasNoChildren,
    Marked,
    Unmarked,
}

impl FolderAttribute {
    fn from_name_attribute(attribute: &NameAttribute<'_>) -> Option<Self> {
        match attribute {
            NameAttribute::NoSelect => Some(Self::NoSelect),
            NameAttribute::NoInferiors => Some(Self::NoInferiors),
            NameAttribute::Marked => Some(Self::Marked),
            NameAttribute::Unmarked => Some(Self::Unmarked),
            NameAttribute::Extension(name) => {
                match name.trim_start_matches('\\').to_ascii_lowercase().as_str() {
                    "noselect" | "nonexistent" => Some(Self::NoSelect),
                    "haschildren" => Some(Self::HasChildren),
                    "hasnochildren" => Some(Self::HasNoChildren),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

/// One line of a LIST response.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct ListEntry {
    attributes: BitFlags<FolderAttribute>,
    delimiter: Option<String>,
    path: MailboxPath,
}

impl ListEntry {
    pub fn new(
        attributes: BitFlags<FolderAttribute>,
        delimiter: Option<String>,
        path: MailboxPath,
    ) -> Self {
        Self {
            attributes,
            delimiter,
            path,
        }
    }

    pub fn is_selectable(&self) -> bool {
        !self.attributes.contains(FolderAttribute::NoSelect)
    }

    /// Last hierarchy segment, for display.
    pub fn printable_name(&self) -> &str {
        self.path.last_segment(self.delimiter.as_deref())
    }
}

/// An authenticated connection and the explicit state of its selected mailbox.
pub struct Session<C> {
    connection: C,
    selection: Option<Selection>,
}

impl<C> Debug for Session<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("selection", &self.selection)
            .finish_non_exhaustive()
    }
}

impl<C: SendCommand> Session<C> {
    pub async fn login(connection: C, user: &str, password: &str) -> Result<Self> {
        let mut session = Self {
            connection,
            selection: None,
        };
        let command = format!("LOGIN {} {}", astring(user), astring(password));
        match session.execute(&command, |_| {}).await {
            Ok(_) => Ok(session),
            Err(Error::Protocol { information, .. }) => Err(Error::Authentication(information)),
            Err(e) => Err(e),
        }
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub async fn list(&mut self) -> Result<Vec<ListEntry>> {
        let mut entries = Vec::new();
        self.execute("LIST \"\" \"*\"", |response| {
            if let Response::MailboxData(MailboxDatum::List {
                name_attributes,
                delimiter,
                name,
            }) = response
            {
                let attributes = name_attributes
                    .iter()
                    .filter_map(FolderAttribute::from_name_attribute)
                    .collect();
                entries.push(ListEntry::new(
                    attributes,
                    delimiter.as_ref().map(ToString::to_string),
                    MailboxPath::new(name.as_ref()),
                ));
            }
        })
        .await?;
        Ok(entries)
    }

    /// Read-only selection. Never changes flags and never expunges.
    pub async fn examine(&mut self, mailbox: &MailboxPath) -> Result<&Selection> {
        self.open(mailbox, Access::ReadOnly).await
    }

    pub async fn select(&mut self, mailbox: &MailboxPath) -> Result<&Selection> {
        self.open(mailbox, Access::ReadWrite).await
    }

    async fn open(&mut self, mailbox: &MailboxPath, access: Access) -> Result<&Selection> {
        let command = match access {
            Access::ReadOnly => format!("EXAMINE {mailbox}"),
            Access::ReadWrite => format!("SELECT {mailbox}"),
        };
        self.selection = None;
        let mut selection = SelectionBuilder::default();
        selection.mailbox(mailbox.clone()).access(access);
        let read_only = self
            .execute(&command, |response| {
                if let Response::MailboxData(MailboxDatum::Exists(exists)) = response {
                    selection.exists(*exists);
                }
            })
            .await?;
        if read_only {
            selection.access(Access::ReadOnly);
        }
        let selection = selection.build().map_err(|e| Error::Protocol {
            command: command.clone(),
            status: Rejection::Bad,
            information: format!("incomplete selection data: {e}"),
        })?;
        trace!("selected = {selection:?}");
        Ok(self.selection.insert(selection))
    }

    pub async fn uid_search(&mut self, query: &SearchQuery) -> Result<Vec<Uid>> {
        self.require_selected()?;
        let mut uids = Vec::new();
        self.execute(&format!("UID SEARCH {query}"), |response| {
            if let Response::MailboxData(MailboxDatum::Search(found)) = response {
                uids.extend(found.iter().filter_map(|uid| Uid::try_from(uid).ok()));
            }
        })
        .await?;
        Ok(uids)
    }

    /// `(UID, sequence number)` pairs as reported by the server, which may include unsolicited
    /// FETCH responses for other messages.
    pub async fn uid_fetch_sequence_numbers(&mut self, uids: &[Uid]) -> Result<Vec<(Uid, SeqNum)>> {
        self.require_selected()?;
        let set: SequenceSet = uids.iter().copied().collect();
        let mut pairs = Vec::with_capacity(uids.len());
        self.execute(&format!("UID FETCH {set} (UID)"), |response| {
            if let Response::Fetch(seq, attributes) = response
                && let (Some(uid), Ok(seq)) = (fetched_uid(attributes), SeqNum::try_from(seq))
            {
                pairs.push((uid, seq));
            }
        })
        .await?;
        Ok(pairs)
    }

    /// Fetches full messages without setting `\Seen`, handing each one to `each` as it arrives.
    pub async fn uid_fetch_bodies(
        &mut self,
        uids: &[Uid],
        mut each: impl FnMut(Uid, &[u8]),
    ) -> Result<()> {
        self.require_selected()?;
        let set: SequenceSet = uids.iter().copied().collect();
        self.execute(&format!("UID FETCH {set} (UID BODY.PEEK[])"), |response| {
            if let Response::Fetch(_, attributes) = response {
                let body = attributes.iter().find_map(|attribute| match attribute {
                    AttributeValue::BodySection {
                        data: Some(data), ..
                    }
                    | AttributeValue::Rfc822(Some(data)) => Some(data.as_ref()),
                    _ => None,
                });
                if let (Some(uid), Some(body)) = (fetched_uid(attributes), body) {
                    each(uid, body);
                }
            }
        })
        .await?;
        Ok(())
    }

    pub async fn copy(&mut self, messages: &[SeqNum], destination: &MailboxPath) -> Result<()> {
        self.require_selected()?;
        let set: SequenceSet = messages.iter().copied().collect();
        self.execute(&format!("COPY {set} {destination}"), |_| {})
            .await?;
        Ok(())
    }

    pub async fn uid_store_deleted(&mut self, uids: &[Uid]) -> Result<()> {
        self.require_writable()?;
        let set: SequenceSet = uids.iter().copied().collect();
        self.execute(&format!("UID STORE {set} +FLAGS.SILENT (\\Deleted)"), |_| {})
            .await?;
        Ok(())
    }

    pub async fn expunge(&mut self) -> Result<()> {
        self.require_writable()?;
        self.execute("EXPUNGE", |_| {}).await?;
        Ok(())
    }

    pub async fn close(&mut self) -> Result<()> {
        self.require_selected()?;
        self.execute("CLOSE", |_| {}).await?;
        self.selection = None;
        Ok(())
    }

    pub async fn logout(mut self) -> Result<()> {
        match self.execute("LOGOUT", |_| {}).await {
            Ok(_) | Err(Error::Connection(ConnectionError::Closed)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Ends the session on any exit path of an operation. A read-write selection is closed first;
    /// failures are only logged.
    pub async fn release(mut self) {
        if self
            .selection
            .as_ref()
            .is_some_and(|selection| selection.access == Access::ReadWrite)
            && let Err(e) = self.close().await
        {
            warn!("closing the selected mailbox failed: {e}");
        }
        if let Err(e) = self.logout().await {
            warn!("logout failed: {e}");
        }
    }

    fn require_selected(&self) -> Result<&Selection> {
        self.selection.as_ref().ok_or(Error::NotSelected)
    }

    fn require_writable(&self) -> Result<&Selection> {
        let selection = self.require_selected()?;
        if selection.access == Access::ReadWrite {
            Ok(selection)
        } else {
            Err(Error::ReadOnly(selection.mailbox.name().to_string()))
        }
    }

    /// Runs one command to completion. Untagged responses are handed to `on_untagged`; the
    /// selection's message count is kept current along the way.
    ///
    /// Returns whether the OK completion carried `[READ-ONLY]`.
    async fn execute(
        &mut self,
        command: &str,
        mut on_untagged: impl FnMut(&Response<'static>),
    ) -> Result<bool> {
        let loggable = loggable(command);
        debug!("{loggable}");
        let mut responses = self.connection.send(command);
        while let Some(response) = responses.next().await {
            let response = response?;
            match response.parsed() {
                Response::Done {
                    status,
                    code,
                    information,
                    ..
                } => {
                    let information = information.as_deref().unwrap_or_default().to_string();
                    let status = match status {
                        Status::Ok => return Ok(matches!(code, Some(ResponseCode::ReadOnly))),
                        Status::No => Rejection::No,
                        _ => Rejection::Bad,
                    };
                    debug!("{loggable} failed: {status} {information}");
                    return Err(Error::Protocol {
                        command: loggable.to_string(),
                        status,
                        information,
                    });
                }
                Response::MailboxData(MailboxDatum::Exists(exists)) => {
                    if let Some(selection) = self.selection.as_mut() {
                        selection.exists = *exists;
                    }
                    on_untagged(response.parsed());
                }
                Response::Expunge(_) => {
                    if let Some(selection) = self.selection.as_mut() {
                        selection.exists = selection.exists.saturating_sub(1);
                    }
                }
                Response::Data {
                    status: Status::Bye,
                    information,
                    ..
                } => {
                    debug!("server is closing the connection: {information:?}");
                }
                other => {
                    trace!("{other:?}");
                    on_untagged(other);
                }
            }
        }
        warn!("connection ended before {loggable} completed");
        Err(ConnectionError::Closed.into())
    }
}

fn fetched_uid(attributes: &[AttributeValue<'_>]) -> Option<Uid> {
    attributes.iter().find_map(|attribute| match attribute {
        AttributeValue::Uid(uid) => Uid::try_from(uid).ok(),
        _ => None,
    })
}

fn loggable(command: &str) -> &str {
    if command.starts_with("LOGIN ") {
        "LOGIN <user> <password>"
    } else {
        command
    }
}
