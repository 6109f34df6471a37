use std::{
    fmt::{Display, Formatter},
    sync::LazyLock,
};

use jiff::civil::Date;
use regex::Regex;
use thiserror::Error;

const MAX_ADDRESS_LENGTH: usize = 254;
const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 100;

/// Characters that can terminate or restructure an IMAP command when embedded in one.
const UNSAFE_CHARACTERS: [char; 5] = ['"', '\\', '\r', '\n', '\0'];

static ADDRESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("address pattern should compile")
});

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} cannot be empty")]
    Empty(&'static str),
    #[error("email address too long (max {max} characters)")]
    AddressTooLong { max: usize },
    #[error("{field} contains invalid characters: {found}")]
    UnsafeCharacters { field: &'static str, found: String },
    #[error("invalid email address format: {0}")]
    AddressFormat(String),
    #[error("app password must be at least {min} characters long")]
    PasswordTooShort { min: usize },
    #[error("app password must be at most {max} characters long")]
    PasswordTooLong { max: usize },
    #[error("days must be a non-negative integer, got {0}")]
    NegativeDays(i64),
    #[error("{days} days before {today} is outside the supported date range")]
    DateOutOfRange { days: i64, today: Date },
    #[error("action must be either \"delete\" or \"archive\", got {0:?}")]
    UnknownAction(String),
}

/// A sender address that is safe to embed in a search command. Always lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lists the members of `forbidden` present in `input`, rendered for an error message.
pub(crate) fn unsafe_characters(input: &str, forbidden: &[char]) -> String {
    forbidden
        .iter()
        .filter(|c| input.contains(**c))
        .map(|c| {
            if c.is_control() {
                format!("\\x{:02x}", u32::from(*c))
            } else {
                format!("{c:?}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validates an address for use inside an IMAP search and normalizes it to lowercase.
///
/// Input containing `"`, `\`, CR, LF or NUL is rejected before anything else, including when
/// those characters are only surrounding whitespace.
pub fn validate_address(input: &str) -> Result<Address, ValidationError> {
    let found = unsafe_characters(input, &UNSAFE_CHARACTERS);
    if !found.is_empty() {
        return Err(ValidationError::UnsafeCharacters {
            field: "email address",
            found,
        });
    }

    let address = input.trim();
    if address.is_empty() {
        return Err(ValidationError::Empty("email address"));
    }
    if address.chars().count() > MAX_ADDRESS_LENGTH {
        return Err(ValidationError::AddressTooLong {
            max: MAX_ADDRESS_LENGTH,
        });
    }
    if !ADDRESS_PATTERN.is_match(address) {
        return Err(ValidationError::AddressFormat(address.to_string()));
    }

    Ok(Address(address.to_lowercase()))
}

pub fn is_valid_address(input: &str) -> bool {
    validate_address(input).is_ok()
}

/// Checks the length bounds of an app-specific password and returns it trimmed.
pub fn validate_app_password(input: &str) -> Result<String, ValidationError> {
    let password = input.trim();
    if password.is_empty() {
        return Err(ValidationError::Empty("app password"));
    }
    let found = unsafe_characters(password, &['\r', '\n', '\0']);
    if !found.is_empty() {
        return Err(ValidationError::UnsafeCharacters {
            field: "app password",
            found,
        });
    }
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooLong {
            max: MAX_PASSWORD_LENGTH,
        });
    }
    Ok(password.to_string())
}
