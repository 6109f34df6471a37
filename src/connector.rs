use std::fmt::{Debug, Formatter};

use imap_proto::{Response, Status};
use log::{debug, info};

use crate::{
    error::Result,
    imap::{Connection, ConnectionError, ResponseData, SendCommand, Session},
    validate::{ValidationError, unsafe_characters, validate_app_password},
};

pub const DEFAULT_PORT: u16 = 993;

/// Account name and app-specific password, validated on construction.
#[derive(Clone)]
pub struct Credentials {
    user: String,
    password: String,
}

impl Credentials {
    pub fn new(user: &str, password: &str) -> std::result::Result<Self, ValidationError> {
        let user = user.trim();
        if user.is_empty() {
            return Err(ValidationError::Empty("user"));
        }
        let found = unsafe_characters(user, &['\r', '\n', '\0']);
        if !found.is_empty() {
            return Err(ValidationError::UnsafeCharacters {
                field: "user",
                found,
            });
        }
        Ok(Self {
            user: user.to_string(),
            password: validate_app_password(password)?,
        })
    }

    pub fn user(&self) -> &str {
        &self.user
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Opens a fresh authenticated session. Every operation gets its own.
pub trait Connector {
    type Connection: SendCommand;

    fn connect(&self) -> impl Future<Output = Result<Session<Self::Connection>>>;
}

/// Connects to an IMAP server over implicit TLS.
#[derive(Debug, Clone)]
pub struct ImapConnector {
    host: String,
    port: u16,
    credentials: Credentials,
}

impl ImapConnector {
    pub fn new(host: impl Into<String>, port: u16, credentials: Credentials) -> Self {
        Self {
            host: host.into(),
            port,
            credentials,
        }
    }
}

impl Connector for ImapConnector {
    type Connection = Connection;

    async fn connect(&self) -> Result<Session<Connection>> {
        let (connection, greeting) = Connection::connect_to(&self.host, self.port).await?;
        check_greeting(&greeting)?;
        let session = Session::login(
            connection,
            &self.credentials.user,
            &self.credentials.password,
        )
        .await?;
        info!(
            "logged in to {}:{} as {}",
            self.host, self.port, self.credentials.user
        );
        Ok(session)
    }
}

fn check_greeting(greeting: &ResponseData) -> std::result::Result<(), ConnectionError> {
    match greeting.parsed() {
        Response::Data {
            status: Status::Ok | Status::PreAuth,
            ..
        } => Ok(()),
        Response::Data { information, .. } => Err(ConnectionError::Refused(
            information.as_deref().unwrap_or_default().to_string(),
        )),
        other => Err(ConnectionError::Refused(format!(
            "unexpected greeting {other:?}"
        ))),
    }
}

/// Runs `operation` on a fresh session and releases the session afterwards, whether the
/// operation succeeded or not.
pub async fn with_session<C, T>(
    connector: &C,
    operation: impl AsyncFnOnce(&mut Session<C::Connection>) -> Result<T>,
) -> Result<T>
where
    C: Connector,
{
    let mut session = connector.connect().await?;
    let result = operation(&mut session).await;
    if let Err(e) = &result {
        debug!("releasing session after failure: {e}");
    }
    session.release().await;
    result
}
