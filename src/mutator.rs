use derive_getters::Getters;
use log::{debug, info, warn};

use crate::{
    batch::{BatchLimits, ExpungeSchedule},
    error::{Error, Result},
    imap::{MailboxPath, SendCommand, SeqNum, Session, Uid},
    progress::Progress,
    resolver::resolve_sequence_numbers,
};

/// Counts of a finished mutation run. `succeeded < attempted` is a partial result and must be
/// surfaced as such.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Getters)]
pub struct MutationOutcome {
    attempted: usize,
    succeeded: usize,
}

impl MutationOutcome {
    pub fn is_partial(&self) -> bool {
        self.succeeded < self.attempted
    }
}

#[derive(Debug, Clone, Copy)]
enum BatchAction<'a> {
    Move {
        destination: &'a MailboxPath,
        mark_deleted: bool,
    },
    Purge,
}

impl BatchAction<'_> {
    fn marks_deleted(self) -> bool {
        match self {
            BatchAction::Move { mark_deleted, .. } => mark_deleted,
            BatchAction::Purge => true,
        }
    }
}

/// Copies `uids` of the selected folder to `destination` batch by batch and, if `mark_deleted`
/// is set, flags and expunges them from the source.
///
/// A rejected batch COPY is retried one message at a time; if any single copy is rejected the
/// whole run stops. Expunge failures are logged and left to the next expunge.
pub async fn move_messages<C: SendCommand>(
    session: &mut Session<C>,
    uids: &[Uid],
    destination: &MailboxPath,
    mark_deleted: bool,
    limits: &BatchLimits,
    progress: &Progress,
) -> Result<MutationOutcome> {
    let action = BatchAction::Move {
        destination,
        mark_deleted,
    };
    run_batches(session, uids, action, limits, progress).await
}

/// Flags `uids` of the selected folder as deleted and expunges them, without copying them
/// anywhere first.
pub async fn purge_messages<C: SendCommand>(
    session: &mut Session<C>,
    uids: &[Uid],
    limits: &BatchLimits,
    progress: &Progress,
) -> Result<MutationOutcome> {
    run_batches(session, uids, BatchAction::Purge, limits, progress).await
}

async fn run_batches<C: SendCommand>(
    session: &mut Session<C>,
    uids: &[Uid],
    action: BatchAction<'_>,
    limits: &BatchLimits,
    progress: &Progress,
) -> Result<MutationOutcome> {
    let total = uids.len();
    if total == 0 {
        return Ok(MutationOutcome::default());
    }

    let batch_size = limits.mutation().get();
    let batches = total.div_ceil(batch_size);
    let mut schedule = ExpungeSchedule::new(limits.expunge_interval());
    let mut processed = 0;

    for (index, chunk) in uids.chunks(batch_size).enumerate() {
        let batch = index + 1;
        progress.checkpoint(processed, total)?;
        info!("batch {batch} of {batches} ({} messages)", chunk.len());

        match apply(session, batch, chunk, action).await {
            Ok(()) => {}
            Err(e @ Error::ResolutionMismatch { .. }) => return Err(e),
            Err(e) => {
                return Err(Error::Interrupted {
                    batch,
                    processed,
                    total,
                    source: Box::new(e),
                });
            }
        }

        processed += chunk.len();
        progress.report(processed, total);

        if action.marks_deleted() && schedule.record(chunk.len()) {
            reclaim(session, processed).await;
        }
    }

    if action.marks_deleted() {
        reclaim(session, processed).await;
    }

    Ok(MutationOutcome {
        attempted: total,
        succeeded: processed,
    })
}

async fn apply<C: SendCommand>(
    session: &mut Session<C>,
    batch: usize,
    uids: &[Uid],
    action: BatchAction<'_>,
) -> Result<()> {
    match action {
        BatchAction::Move {
            destination,
            mark_deleted,
        } => {
            let resolved = resolve_sequence_numbers(session, batch, uids).await?;
            copy_batch(session, &resolved, destination).await?;
            if mark_deleted {
                session.uid_store_deleted(uids).await?;
            }
        }
        BatchAction::Purge => session.uid_store_deleted(uids).await?,
    }
    Ok(())
}

async fn copy_batch<C: SendCommand>(
    session: &mut Session<C>,
    resolved: &[(Uid, SeqNum)],
    destination: &MailboxPath,
) -> Result<()> {
    let positions: Vec<SeqNum> = resolved.iter().map(|(_, seq)| *seq).collect();
    match session.copy(&positions, destination).await {
        Ok(()) => Ok(()),
        Err(Error::Protocol {
            status,
            information,
            ..
        }) => {
            warn!(
                "batch COPY to {} answered {status} {information}, copying one message at a time",
                destination.name()
            );
            for (uid, seq) in resolved {
                if let Err(e) = session.copy(&[*seq], destination).await {
                    warn!("copying UID {uid} (message {seq}) failed");
                    return Err(e);
                }
            }
            Ok(())
        }
        Err(e) => Err(e),
    }
}

async fn reclaim<C: SendCommand>(session: &mut Session<C>, processed: usize) {
    match session.expunge().await {
        Ok(()) => debug!("expunged after {processed} messages"),
        Err(e) => warn!("expunge after {processed} messages failed, deferring: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use assertables::*;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::{
        error::Rejection,
        imap::mock_connection::{MockConnection, fetch_uid_line},
    };

    fn uids(nums: impl IntoIterator<Item = u32>) -> Vec<Uid> {
        nums.into_iter()
            .map(|num| assert_ok!(Uid::try_from(num)))
            .collect()
    }

    fn nz(value: usize) -> NonZeroUsize {
        assert_some!(NonZeroUsize::new(value))
    }

    /// Answers a sequence number lookup for `batch`, numbering the messages from 1.
    fn resolves(connection: MockConnection, batch: impl IntoIterator<Item = u32>) -> MockConnection {
        let lines: Vec<String> = batch
            .into_iter()
            .zip(1..)
            .map(|(uid, seq)| fetch_uid_line(seq, uid))
            .collect();
        let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
        connection.expect("UID FETCH", &lines, "OK")
    }

    fn inbox(connection: MockConnection) -> MockConnection {
        connection.expect("SELECT INBOX", &["* 200 EXISTS"], "OK [READ-WRITE] done")
    }

    async fn selected(connection: MockConnection) -> Session<MockConnection> {
        let mut session = assert_ok!(Session::login(connection, "me", "app password").await);
        assert_ok!(session.select(&MailboxPath::inbox()).await);
        session
    }

    fn trash() -> MailboxPath {
        MailboxPath::new("Trash")
    }

    #[tokio::test]
    async fn test_empty_input_sends_nothing() {
        let connection = inbox(MockConnection::logged_in());
        let transcript = connection.transcript();
        let mut session = selected(connection).await;

        let outcome = assert_ok!(
            move_messages(
                &mut session,
                &[],
                &trash(),
                true,
                &BatchLimits::default(),
                &Progress::silent()
            )
            .await
        );

        assert_eq!(MutationOutcome::default(), outcome);
        assert_eq!(2, transcript.commands().len());
    }

    #[tokio::test]
    async fn test_two_full_batches_and_one_more() {
        let mut connection = inbox(MockConnection::logged_in());
        for (batch, expunge) in [(1..=50, true), (51..=100, true), (101..=101, false)] {
            connection = resolves(connection, batch)
                .expect("COPY", &[], "OK")
                .expect("UID STORE", &[], "OK");
            if expunge {
                connection = connection.expect("EXPUNGE", &[], "OK");
            }
        }
        let connection = connection.expect("EXPUNGE", &[], "OK");
        let transcript = connection.transcript();
        let mut session = selected(connection).await;
        let (progress, mut updates) = Progress::channel();

        let outcome = assert_ok!(
            move_messages(
                &mut session,
                &uids(1..=101),
                &trash(),
                true,
                &BatchLimits::default(),
                &progress
            )
            .await
        );

        assert_eq!(101, outcome.attempted());
        assert_eq!(101, outcome.succeeded());
        assert!(!outcome.is_partial());
        assert_eq!(3, transcript.count("COPY"));
        assert_eq!(3, transcript.count("UID STORE"));
        assert_eq!(3, transcript.count("EXPUNGE"));
        assert_contains!(transcript.commands(), &"UID STORE 101 +FLAGS.SILENT (\\Deleted)".to_string());
        drop(progress);
        let mut reported = Vec::new();
        while let Ok(update) = updates.try_recv() {
            assert_eq!(101, update.total);
            reported.push(update.processed);
        }
        assert_eq!(vec![50, 100, 101], reported);
    }

    #[tokio::test]
    async fn test_rejected_batch_copy_falls_back_to_single_copies() {
        let connection = resolves(inbox(MockConnection::logged_in()), [7, 8, 9])
            .expect("COPY 1:3 Trash", &[], "NO too many messages")
            .expect("COPY 1 Trash", &[], "OK")
            .expect("COPY 2 Trash", &[], "OK")
            .expect("COPY 3 Trash", &[], "OK")
            .expect("UID STORE 7:9", &[], "OK")
            .expect("EXPUNGE", &[], "OK");
        let transcript = connection.transcript();
        let mut session = selected(connection).await;

        let outcome = assert_ok!(
            move_messages(
                &mut session,
                &uids([7, 8, 9]),
                &trash(),
                true,
                &BatchLimits::default(),
                &Progress::silent()
            )
            .await
        );

        assert_eq!(3, outcome.succeeded());
        assert_eq!(4, transcript.count("COPY"));
    }

    #[tokio::test]
    async fn test_rejected_single_copy_stops_the_run() {
        let connection = resolves(inbox(MockConnection::logged_in()), [7, 8, 9])
            .expect("COPY 1:3 Trash", &[], "NO too many messages")
            .expect("COPY 1 Trash", &[], "OK")
            .expect("COPY 2 Trash", &[], "NO over quota");
        let transcript = connection.transcript();
        let mut session = selected(connection).await;

        let result = move_messages(
            &mut session,
            &uids([7, 8, 9]),
            &trash(),
            true,
            &BatchLimits::default(),
            &Progress::silent(),
        )
        .await;

        let error = assert_err!(result);
        assert_matches!(
            error,
            Error::Interrupted {
                batch: 1,
                processed: 0,
                total: 3,
                ..
            }
        );
        assert_matches!(
            error.root(),
            Error::Protocol {
                status: Rejection::No,
                ..
            }
        );
        assert_eq!(0, transcript.count("UID STORE"));
        assert_eq!(0, transcript.count("EXPUNGE"));
    }

    #[tokio::test]
    async fn test_failed_expunge_is_deferred() {
        let connection = resolves(inbox(MockConnection::logged_in()), [1, 2])
            .expect("COPY", &[], "OK")
            .expect("UID STORE", &[], "OK")
            .expect("EXPUNGE", &[], "NO expunge unavailable");
        let mut session = selected(connection).await;

        let outcome = assert_ok!(
            move_messages(
                &mut session,
                &uids([1, 2]),
                &trash(),
                true,
                &BatchLimits::default(),
                &Progress::silent()
            )
            .await
        );

        assert_eq!(2, outcome.succeeded());
    }

    #[tokio::test]
    async fn test_archive_only_copies() {
        let connection = resolves(inbox(MockConnection::logged_in()), [4, 5])
            .expect("COPY 1:2 Archive", &[], "OK");
        let transcript = connection.transcript();
        let mut session = selected(connection).await;

        let outcome = assert_ok!(
            move_messages(
                &mut session,
                &uids([4, 5]),
                &MailboxPath::new("Archive"),
                false,
                &BatchLimits::default(),
                &Progress::silent()
            )
            .await
        );

        assert_eq!(2, outcome.succeeded());
        assert_eq!(0, transcript.count("UID STORE"));
        assert_eq!(0, transcript.count("EXPUNGE"));
    }

    #[tokio::test]
    async fn test_mismatch_prevents_copy() {
        let connection = resolves(inbox(MockConnection::logged_in()), 1..=49);
        let transcript = connection.transcript();
        let mut session = selected(connection).await;

        let result = move_messages(
            &mut session,
            &uids(1..=50),
            &trash(),
            true,
            &BatchLimits::default(),
            &Progress::silent(),
        )
        .await;

        assert_matches!(
            assert_err!(result),
            Error::ResolutionMismatch {
                batch: 1,
                requested: 50,
                resolved: 49
            }
        );
        assert_eq!(0, transcript.count("COPY"));
    }

    #[tokio::test]
    async fn test_cancelled_run_touches_nothing() {
        let connection = inbox(MockConnection::logged_in());
        let transcript = connection.transcript();
        let mut session = selected(connection).await;
        let token = CancellationToken::new();
        token.cancel();

        let result = move_messages(
            &mut session,
            &uids([1, 2]),
            &trash(),
            true,
            &BatchLimits::default(),
            &Progress::silent().with_cancellation(token),
        )
        .await;

        assert_matches!(
            assert_err!(result),
            Error::Cancelled {
                processed: 0,
                total: 2
            }
        );
        assert_eq!(2, transcript.commands().len());
    }

    #[tokio::test]
    async fn test_cancellation_mid_batch_finishes_that_batch_only() {
        let token = CancellationToken::new();
        let connection = resolves(inbox(MockConnection::logged_in()), 1..=50)
            .expect("COPY 1:50 Trash", &[], "OK")
            .cancelling(&token)
            .expect("UID STORE 1:50 +FLAGS.SILENT (\\Deleted)", &[], "OK")
            .expect("EXPUNGE", &[], "OK");
        let transcript = connection.transcript();
        let mut session = selected(connection).await;
        let (progress, mut updates) = Progress::channel();

        let result = move_messages(
            &mut session,
            &uids(1..=101),
            &trash(),
            true,
            &BatchLimits::default(),
            &progress.with_cancellation(token),
        )
        .await;

        assert_matches!(
            assert_err!(result),
            Error::Cancelled {
                processed: 50,
                total: 101
            }
        );
        assert_eq!(1, transcript.count("UID FETCH"));
        assert_eq!(1, transcript.count("COPY"));
        assert_eq!(1, transcript.count("UID STORE"));
        assert_eq!(1, transcript.count("EXPUNGE"));
        let update = assert_ok!(updates.try_recv());
        assert_eq!((50, 101), (update.processed, update.total));
        assert_err!(updates.try_recv());
    }

    #[tokio::test]
    async fn test_purge_flags_and_expunges_without_copying() {
        let connection = inbox(MockConnection::logged_in())
            .expect("UID STORE 1:2 +FLAGS.SILENT (\\Deleted)", &[], "OK")
            .expect("EXPUNGE", &["* 2 EXPUNGE", "* 1 EXPUNGE"], "OK")
            .expect("UID STORE 3 +FLAGS.SILENT (\\Deleted)", &[], "OK")
            .expect("EXPUNGE", &["* 1 EXPUNGE"], "OK");
        let transcript = connection.transcript();
        let mut session = selected(connection).await;
        let limits = BatchLimits::new(nz(2), nz(500), nz(2));

        let outcome = assert_ok!(
            purge_messages(&mut session, &uids(1..=3), &limits, &Progress::silent()).await
        );

        assert_eq!(3, outcome.succeeded());
        assert_eq!(0, transcript.count("COPY"));
        assert_eq!(0, transcript.count("UID FETCH"));
        assert_eq!(197, assert_some!(session.selection()).exists());
    }
}
