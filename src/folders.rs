use std::fmt::{Display, Formatter};

use derive_getters::Getters;
use log::{debug, info};

use crate::{
    error::{Error, Result},
    imap::{ListEntry, MailboxPath, SendCommand, Session},
    progress::Progress,
};

const TRASH_NAMES: &[&str] = &[
    "Trash",
    "[Gmail]/Bin",
    "[Gmail]/Trash",
    "[Yahoo]/Bin",
    "[Yahoo]/Trash",
    "Deleted Items",
];
const ARCHIVE_NAMES: &[&str] = &["Archive", "Archief"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FolderRole {
    Trash,
    Archive,
    Other,
}

impl FolderRole {
    /// Full mailbox names that identify the role, most preferred first.
    pub fn known_names(self) -> &'static [&'static str] {
        match self {
            FolderRole::Trash => TRASH_NAMES,
            FolderRole::Archive => ARCHIVE_NAMES,
            FolderRole::Other => &[],
        }
    }
}

impl Display for FolderRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FolderRole::Trash => f.write_str("trash"),
            FolderRole::Archive => f.write_str("archive"),
            FolderRole::Other => f.write_str("other"),
        }
    }
}

/// One folder with its message count at the time it was described.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct FolderDescriptor {
    printable_name: String,
    raw_path: MailboxPath,
    message_count: u32,
}

/// Snapshot of the server's folder listing. Never updated in place; fetch a new one after
/// anything that may have created or removed folders.
#[derive(Debug, Clone, Default)]
pub struct FolderCatalog {
    entries: Vec<ListEntry>,
}

impl FolderCatalog {
    pub async fn fetch<C: SendCommand>(session: &mut Session<C>) -> Result<Self> {
        let entries = session.list().await?;
        debug!("listed {} folders", entries.len());
        Ok(Self::from_entries(entries))
    }

    pub fn from_entries(entries: Vec<ListEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ListEntry] {
        &self.entries
    }

    pub fn names(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| entry.path().name().to_string())
            .collect()
    }

    pub fn classify(entry: &ListEntry) -> FolderRole {
        let name = entry.path().name();
        [FolderRole::Trash, FolderRole::Archive]
            .into_iter()
            .find(|role| role.known_names().contains(&name))
            .unwrap_or(FolderRole::Other)
    }

    /// The path of the most preferred selectable folder carrying `role`.
    pub fn resolve_role(&self, role: FolderRole) -> Result<&MailboxPath> {
        role.known_names()
            .iter()
            .find_map(|name| {
                self.entries
                    .iter()
                    .filter(|entry| entry.is_selectable())
                    .find(|entry| entry.path().name() == *name)
            })
            .map(ListEntry::path)
            .ok_or_else(|| Error::FolderNotFound {
                role,
                available: self.names(),
            })
    }

    /// Counts the messages of every listed folder, reporting progress per folder.
    pub async fn describe<C: SendCommand>(
        &self,
        session: &mut Session<C>,
        progress: &Progress,
    ) -> Result<Vec<FolderDescriptor>> {
        let total = self.entries.len();
        let mut descriptors = Vec::with_capacity(total);
        for (index, entry) in self.entries.iter().enumerate() {
            progress.checkpoint(index, total)?;
            let message_count = if entry.is_selectable() {
                count_messages(session, entry.path()).await?
            } else {
                0
            };
            descriptors.push(FolderDescriptor {
                printable_name: entry.printable_name().to_string(),
                raw_path: entry.path().clone(),
                message_count,
            });
            progress.report(index + 1, total);
        }
        Ok(descriptors)
    }
}

/// Message count from a read-only selection. A folder the server refuses to open counts as
/// empty; transport failures still propagate.
pub async fn count_messages<C: SendCommand>(
    session: &mut Session<C>,
    path: &MailboxPath,
) -> Result<u32> {
    match session.examine(path).await {
        Ok(selection) => Ok(selection.exists()),
        Err(Error::Protocol {
            status,
            information,
            ..
        }) => {
            info!("cannot open {}, counting it as empty: {status} {information}", path.name());
            Ok(0)
        }
        Err(e) => Err(e),
    }
}
