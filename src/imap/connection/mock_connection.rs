use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use futures::stream;
use tokio_util::sync::CancellationToken;

use super::{ConnectionError, SendCommand};
use crate::imap::{codec::ResponseData, tag_generator::TagGenerator};

enum Completion {
    Status(&'static str),
    Disconnect,
}

struct Exchange {
    expected: String,
    untagged: Vec<Vec<u8>>,
    completion: Completion,
    cancels: Option<CancellationToken>,
}

/// Commands sent through a [`MockConnection`], shared with the test after the connection has been
/// moved into a session.
#[derive(Clone, Default)]
pub struct Transcript {
    commands: Arc<Mutex<Vec<String>>>,
}

impl Transcript {
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().expect("transcript should be lockable").clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.commands()
            .iter()
            .filter(|command| command.starts_with(prefix))
            .count()
    }

    fn push(&self, command: &str) {
        self.commands
            .lock()
            .expect("transcript should be lockable")
            .push(command.to_string());
    }
}

/// Scripted server. Every command must start with the prefix of the next scripted exchange; the
/// scripted lines are replayed through the real response parser followed by a tagged completion.
#[derive(Default)]
pub struct MockConnection {
    script: VecDeque<Exchange>,
    tag_generator: TagGenerator,
    transcript: Transcript,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// A connection whose first exchange is a successful LOGIN.
    pub fn logged_in() -> Self {
        Self::new().expect("LOGIN", &[], "OK")
    }

    pub fn expect(self, prefix: &str, untagged: &[&str], status: &'static str) -> Self {
        let untagged = untagged
            .iter()
            .map(|line| format!("{line}\r\n").into_bytes())
            .collect();
        self.expect_raw(prefix, untagged, status)
    }

    pub fn expect_raw(mut self, prefix: &str, untagged: Vec<Vec<u8>>, status: &'static str) -> Self {
        self.script.push_back(Exchange {
            expected: prefix.to_string(),
            untagged,
            completion: Completion::Status(status),
            cancels: None,
        });
        self
    }

    pub fn expect_disconnect(mut self, prefix: &str) -> Self {
        self.script.push_back(Exchange {
            expected: prefix.to_string(),
            untagged: Vec::new(),
            completion: Completion::Disconnect,
            cancels: None,
        });
        self
    }

    /// Scripted LOGOUT as answered by a well-behaved server.
    pub fn expect_logout(self) -> Self {
        self.expect("LOGOUT", &["* BYE logging out"], "OK")
    }

    pub fn transcript(&self) -> Transcript {
        self.transcript.clone()
    }

    /// Cancels `token` while the last scripted command is in flight.
    pub fn cancelling(mut self, token: &CancellationToken) -> Self {
        let exchange = self
            .script
            .back_mut()
            .expect("a command should be scripted before cancelling");
        exchange.cancels = Some(token.clone());
        self
    }
}

impl SendCommand for MockConnection {
    type Responses<'a> = stream::Iter<std::vec::IntoIter<Result<ResponseData, ConnectionError>>>;

    fn send<'a>(&'a mut self, command: &'a str) -> Self::Responses<'a> {
        let tag = self.tag_generator.next();
        self.transcript.push(command);
        let exchange = self
            .script
            .pop_front()
            .unwrap_or_else(|| panic!("unscripted command {command:?}"));
        assert!(
            command.starts_with(&exchange.expected),
            "expected command starting with {:?}, got {command:?}",
            exchange.expected
        );
        if let Some(token) = &exchange.cancels {
            token.cancel();
        }

        let mut responses: Vec<_> = exchange
            .untagged
            .iter()
            .map(|raw| {
                Ok(ResponseData::try_from(raw.as_slice())
                    .expect("scripted response should be parseable"))
            })
            .collect();
        match exchange.completion {
            Completion::Status(status) => {
                let done = format!("{tag} {status} scripted\r\n");
                responses.push(Ok(ResponseData::try_from(done.as_bytes())
                    .expect("scripted completion should be parseable")));
            }
            Completion::Disconnect => responses.push(Err(ConnectionError::Closed)),
        }

        stream::iter(responses)
    }
}

/// `* <seq> FETCH (UID <uid>)`
pub fn fetch_uid_line(seq: u32, uid: u32) -> String {
    format!("* {seq} FETCH (UID {uid})")
}

/// `* <seq> FETCH (UID <uid> BODY[] {<len>} <body>)` with the body sent as a literal.
pub fn fetch_body_line(seq: u32, uid: u32, body: &str) -> Vec<u8> {
    format!(
        "* {seq} FETCH (UID {uid} BODY[] {{{}}}\r\n{body})\r\n",
        body.len()
    )
    .into_bytes()
}
