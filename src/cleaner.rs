use std::{
    fmt::{Debug, Display, Formatter},
    num::NonZeroUsize,
    str::FromStr,
};

use jiff::{Span, Zoned, civil::Date};
use log::info;

use crate::{
    batch::BatchLimits,
    connector::{Connector, with_session},
    error::Result,
    folders::{self, FolderCatalog, FolderDescriptor, FolderRole},
    imap::{MailboxPath, SearchQuery},
    mutator::{MutationOutcome, move_messages, purge_messages},
    progress::Progress,
    senders::{SenderReport, aggregate_senders},
    validate::{ValidationError, validate_address},
};

/// What pruning does with the old messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PruneAction {
    /// Move to the trash folder and expunge from the source.
    #[default]
    Delete,
    /// Copy to the archive folder and leave the source untouched.
    Archive,
}

impl PruneAction {
    fn destination_role(self) -> FolderRole {
        match self {
            PruneAction::Delete => FolderRole::Trash,
            PruneAction::Archive => FolderRole::Archive,
        }
    }

    fn marks_deleted(self) -> bool {
        self == PruneAction::Delete
    }
}

impl FromStr for PruneAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "delete" => Ok(PruneAction::Delete),
            "archive" => Ok(PruneAction::Archive),
            other => Err(ValidationError::UnknownAction(other.to_string())),
        }
    }
}

impl Display for PruneAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PruneAction::Delete => f.write_str("delete"),
            PruneAction::Archive => f.write_str("archive"),
        }
    }
}

/// The calendar day `days` before `today`. Messages sent before it are old.
pub fn threshold_date(today: Date, days: i64) -> std::result::Result<Date, ValidationError> {
    if days < 0 {
        return Err(ValidationError::NegativeDays(days));
    }
    Span::new()
        .try_days(days)
        .and_then(|span| today.checked_sub(span))
        .map_err(|_| ValidationError::DateOutOfRange { days, today })
}

/// Mailbox maintenance for one account.
///
/// Each operation validates its input and resolves the folders it needs against the cached
/// catalog before opening its own session, which is released however the operation ends.
pub struct Cleaner<C> {
    connector: C,
    catalog: FolderCatalog,
    limits: BatchLimits,
}

impl<C> Debug for Cleaner<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cleaner")
            .field("catalog", &self.catalog)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl<C: Connector> Cleaner<C> {
    /// Fetches the folder catalog and keeps it for role resolution.
    pub async fn connect(connector: C, limits: BatchLimits) -> Result<Self> {
        let catalog =
            with_session(&connector, async |session| FolderCatalog::fetch(session).await).await?;
        Ok(Self::with_catalog(connector, catalog, limits))
    }

    pub fn with_catalog(connector: C, catalog: FolderCatalog, limits: BatchLimits) -> Self {
        Self {
            connector,
            catalog,
            limits,
        }
    }

    pub fn catalog(&self) -> &FolderCatalog {
        &self.catalog
    }

    /// Replaces the cached catalog with a fresh listing.
    pub async fn refresh_catalog(&mut self) -> Result<&FolderCatalog> {
        let catalog =
            with_session(&self.connector, async |session| FolderCatalog::fetch(session).await)
                .await?;
        self.catalog = catalog;
        Ok(&self.catalog)
    }

    /// Every cached folder with a current message count.
    pub async fn list_folders(&self, progress: &Progress) -> Result<Vec<FolderDescriptor>> {
        with_session(&self.connector, async |session| {
            self.catalog.describe(session, progress).await
        })
        .await
    }

    pub async fn count_messages(&self, folder: &MailboxPath) -> Result<u32> {
        with_session(&self.connector, async |session| {
            folders::count_messages(session, folder).await
        })
        .await
    }

    pub async fn sender_statistics(
        &self,
        max_batches: Option<NonZeroUsize>,
        progress: &Progress,
    ) -> Result<SenderReport> {
        with_session(&self.connector, async |session| {
            aggregate_senders(session, &self.limits, max_batches, progress).await
        })
        .await
    }

    /// Moves every INBOX message from `address` to the trash folder.
    pub async fn delete_from_sender(
        &self,
        address: &str,
        progress: &Progress,
    ) -> Result<MutationOutcome> {
        let address = validate_address(address)?;
        let trash = self.catalog.resolve_role(FolderRole::Trash)?;

        with_session(&self.connector, async |session| {
            session.select(&MailboxPath::inbox()).await?;
            let uids = session
                .uid_search(&SearchQuery::From(address.clone()))
                .await?;
            info!("{} messages from {address}", uids.len());
            move_messages(session, &uids, trash, true, &self.limits, progress).await
        })
        .await
    }

    /// Deletes or archives the messages of `folder` sent more than `days` days ago.
    pub async fn prune_older_than(
        &self,
        folder: &MailboxPath,
        days: i64,
        action: PruneAction,
        progress: &Progress,
    ) -> Result<MutationOutcome> {
        let threshold = threshold_date(Zoned::now().date(), days)?;
        let destination = self.catalog.resolve_role(action.destination_role())?;

        with_session(&self.connector, async |session| {
            session.select(folder).await?;
            let uids = session
                .uid_search(&SearchQuery::SentBefore(threshold))
                .await?;
            info!(
                "{} messages in {} sent before {threshold}, {action} to {}",
                uids.len(),
                folder.name(),
                destination.name()
            );
            move_messages(
                session,
                &uids,
                destination,
                action.marks_deleted(),
                &self.limits,
                progress,
            )
            .await
        })
        .await
    }

    /// Permanently removes everything in the trash folder.
    pub async fn empty_trash(&self, progress: &Progress) -> Result<MutationOutcome> {
        let trash = self.catalog.resolve_role(FolderRole::Trash)?;

        with_session(&self.connector, async |session| {
            session.select(trash).await?;
            let uids = session.uid_search(&SearchQuery::All).await?;
            info!("{} messages in {}", uids.len(), trash.name());
            purge_messages(session, &uids, &self.limits, progress).await
        })
        .await
    }
}
