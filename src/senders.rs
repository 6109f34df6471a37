use std::{collections::HashMap, num::NonZeroUsize};

use derive_getters::Getters;
use log::{debug, info};
use mail_parser::MessageParser;

use crate::{
    batch::BatchLimits,
    error::Result,
    imap::{MailboxPath, SearchQuery, SendCommand, Session},
    progress::Progress,
    unsubscribe::find_unsubscribe_link,
};

#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct SenderRecord {
    display_name: String,
    /// Lowercase.
    address: String,
    count: usize,
    unsubscribe_link: Option<String>,
}

/// Senders ordered by message count, most frequent first.
///
/// When `partial` is set the batch limit stopped the scan early and the counts only cover the
/// first `examined` of `available` messages.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct SenderReport {
    senders: Vec<SenderRecord>,
    examined: usize,
    available: usize,
    partial: bool,
}

#[derive(Default)]
struct SenderTally {
    records: HashMap<String, SenderRecord>,
    examined: usize,
    skipped: usize,
}

impl SenderTally {
    fn observe(&mut self, raw: &[u8]) {
        self.examined += 1;
        let Some((display_name, address)) = sender(raw) else {
            self.skipped += 1;
            return;
        };
        self.records
            .entry(address)
            .and_modify(|record| record.count += 1)
            .or_insert_with_key(|address| SenderRecord {
                display_name,
                address: address.clone(),
                count: 1,
                unsubscribe_link: find_unsubscribe_link(raw),
            });
    }

    fn into_sorted(self) -> Vec<SenderRecord> {
        let mut senders: Vec<_> = self.records.into_values().collect();
        senders.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.address.cmp(&b.address)));
        senders
    }
}

/// Display name and lowercase address of the first `From` mailbox.
fn sender(raw: &[u8]) -> Option<(String, String)> {
    let headers = MessageParser::default().parse_headers(raw)?;
    let from = headers.from()?.first()?;
    let address = from.address()?.trim();
    if address.is_empty() {
        return None;
    }
    Some((
        from.name().unwrap_or_default().to_string(),
        address.to_lowercase(),
    ))
}

/// Counts messages per sender in INBOX without changing any flags.
///
/// Messages are fetched `limits.fetch()` at a time and parsed as they stream in. With
/// `max_batches` only that many batches are read.
pub async fn aggregate_senders<C: SendCommand>(
    session: &mut Session<C>,
    limits: &BatchLimits,
    max_batches: Option<NonZeroUsize>,
    progress: &Progress,
) -> Result<SenderReport> {
    session.examine(&MailboxPath::inbox()).await?;
    let uids = session.uid_search(&SearchQuery::All).await?;
    let available = uids.len();
    let batch_size = limits.fetch().get();
    let batches = available.div_ceil(batch_size);
    let allowed = max_batches.map_or(batches, |max| max.get().min(batches));
    let total = available.min(allowed * batch_size);
    info!("analysing {total} of {available} messages in {allowed} batches");

    let mut tally = SenderTally::default();
    for (index, chunk) in uids.chunks(batch_size).take(allowed).enumerate() {
        progress.checkpoint(tally.examined, total)?;
        session
            .uid_fetch_bodies(chunk, |_, raw| tally.observe(raw))
            .await?;
        debug!(
            "batch {} of {allowed}: {} senders so far",
            index + 1,
            tally.records.len()
        );
        progress.report(tally.examined, total);
    }

    if tally.skipped > 0 {
        info!("{} messages without a usable sender were skipped", tally.skipped);
    }
    let examined = tally.examined;
    Ok(SenderReport {
        senders: tally.into_sorted(),
        examined,
        available,
        partial: allowed < batches,
    })
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use rstest::*;

    use super::*;
    use crate::imap::mock_connection::{MockConnection, fetch_body_line};

    fn message(from: &str) -> String {
        format!("From: {from}\r\nSubject: hello\r\n\r\nbody\r\n")
    }

    fn nz(value: usize) -> NonZeroUsize {
        assert_some!(NonZeroUsize::new(value))
    }

    /// Scripts EXAMINE and SEARCH for `senders.len()` messages with UIDs from 1, followed by one
    /// body fetch per batch of `batch_size`.
    fn inbox_of(senders: &[String], batch_size: usize, batches: usize) -> MockConnection {
        let uids: Vec<String> = (1..=senders.len()).map(|uid| uid.to_string()).collect();
        let search = format!("* SEARCH {}", uids.join(" "));
        let exists = format!("* {} EXISTS", senders.len());
        let mut connection = MockConnection::logged_in()
            .expect("EXAMINE INBOX", &[&exists], "OK [READ-ONLY] done")
            .expect("UID SEARCH ALL", &[&search], "OK");
        for (index, chunk) in senders.chunks(batch_size).take(batches).enumerate() {
            let first = index * batch_size + 1;
            let lines = chunk
                .iter()
                .zip(first..)
                .map(|(from, uid)| {
                    let uid = u32::try_from(uid).expect("uid should fit");
                    fetch_body_line(uid, uid, &message(from))
                })
                .collect();
            connection = connection.expect_raw("UID FETCH", lines, "OK");
        }
        connection
    }

    async fn session(connection: MockConnection) -> Session<MockConnection> {
        assert_ok!(Session::login(connection, "me", "app password").await)
    }

    #[tokio::test]
    async fn test_counts_per_sender_most_frequent_first() {
        let mut senders = Vec::new();
        for index in 0..150 {
            if index % 5 == 4 {
                senders.push("Bee <B@Y.com>".to_string());
            } else {
                senders.push("\"Alpha Sender\" <a@x.com>".to_string());
            }
        }
        let connection = inbox_of(&senders, 500, 1);
        let transcript = connection.transcript();
        let mut session = session(connection).await;

        let report = assert_ok!(
            aggregate_senders(
                &mut session,
                &BatchLimits::default(),
                None,
                &Progress::silent()
            )
            .await
        );

        let counts: Vec<_> = report
            .senders()
            .iter()
            .map(|record| (record.address().as_str(), record.count()))
            .collect();
        assert_eq!(vec![("a@x.com", 120), ("b@y.com", 30)], counts);
        assert_eq!("Alpha Sender", report.senders()[0].display_name());
        assert_eq!(150, report.examined());
        assert!(!report.partial());
        assert_eq!(0, transcript.count("SELECT"));
        assert_eq!(0, transcript.count("UID STORE"));
    }

    #[tokio::test]
    async fn test_messages_without_sender_are_excluded() {
        let senders = vec![
            "ok@example.com".to_string(),
            "undisclosed-recipients:;".to_string(),
            "<>".to_string(),
        ];
        let connection = inbox_of(&senders, 500, 1);
        let mut session = session(connection).await;

        let report = assert_ok!(
            aggregate_senders(
                &mut session,
                &BatchLimits::default(),
                None,
                &Progress::silent()
            )
            .await
        );

        assert_eq!(1, report.senders().len());
        assert_eq!("ok@example.com", report.senders()[0].address());
        assert_eq!(3, report.examined());
    }

    #[tokio::test]
    async fn test_batch_limit_gives_partial_report() {
        let senders: Vec<String> = (0..5).map(|n| format!("s{n}@example.com")).collect();
        let connection = inbox_of(&senders, 2, 2);
        let transcript = connection.transcript();
        let mut session = session(connection).await;
        let limits = BatchLimits::new(nz(50), nz(2), nz(50));
        let (progress, mut updates) = Progress::channel();

        let report = assert_ok!(
            aggregate_senders(&mut session, &limits, Some(nz(2)), &progress).await
        );

        assert!(report.partial());
        assert_eq!(4, report.examined());
        assert_eq!(5, report.available());
        assert_eq!(2, transcript.count("UID FETCH"));
        drop(progress);
        let mut reported = Vec::new();
        while let Ok(update) = updates.try_recv() {
            reported.push((update.processed, update.total));
        }
        assert_eq!(vec![(2, 4), (4, 4)], reported);
    }

    #[tokio::test]
    async fn test_empty_inbox() {
        let connection = MockConnection::logged_in()
            .expect("EXAMINE INBOX", &["* 0 EXISTS"], "OK")
            .expect("UID SEARCH ALL", &["* SEARCH"], "OK");
        let mut session = session(connection).await;

        let report = assert_ok!(
            aggregate_senders(
                &mut session,
                &BatchLimits::default(),
                None,
                &Progress::silent()
            )
            .await
        );

        assert_is_empty!(report.senders());
        assert!(!report.partial());
    }

    #[rstest]
    #[case("Jane Doe <Jane.Doe@Example.com>", Some(("Jane Doe", "jane.doe@example.com")))]
    #[case("plain@example.com", Some(("", "plain@example.com")))]
    #[case("=?utf-8?q?J=C3=BCrgen?= <j@example.de>", Some(("Jürgen", "j@example.de")))]
    #[case("", None)]
    fn test_sender_parsing(#[case] from: &str, #[case] expected: Option<(&str, &str)>) {
        let raw = message(from);

        let parsed = sender(raw.as_bytes());

        assert_eq!(
            expected,
            parsed
                .as_ref()
                .map(|(name, address)| (name.as_str(), address.as_str()))
        );
    }
}
