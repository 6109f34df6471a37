use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use crate::{
    imap::quoting::astring,
    validate::{ValidationError, unsafe_characters},
};

/// Protocol-addressable mailbox name, stored unquoted. Its [`Display`] form is the command
/// argument: quoted whenever the name contains a space or another atom special.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MailboxPath(String);

impl MailboxPath {
    /// Wraps a name as reported by the server.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn inbox() -> Self {
        Self::new("INBOX")
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// The part after the last hierarchy delimiter.
    pub fn last_segment(&self, delimiter: Option<&str>) -> &str {
        match delimiter {
            Some(delimiter) if !delimiter.is_empty() => {
                self.0.rsplit(delimiter).next().unwrap_or(&self.0)
            }
            _ => &self.0,
        }
    }
}

impl Display for MailboxPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&astring(&self.0))
    }
}

/// Parses user input. Surrounding quotes are removed, so an already quoted path is accepted and
/// quoted exactly once on the wire.
impl FromStr for MailboxPath {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let found = unsafe_characters(s, &['\r', '\n', '\0']);
        if !found.is_empty() {
            return Err(ValidationError::UnsafeCharacters {
                field: "folder",
                found,
            });
        }
        let trimmed = s.trim();
        let name = match trimmed
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
        {
            Some(inner) => inner.replace("\\\"", "\"").replace("\\\\", "\\"),
            None => trimmed.to_string(),
        };
        if name.is_empty() {
            return Err(ValidationError::Empty("folder"));
        }
        Ok(Self(name))
    }
}
