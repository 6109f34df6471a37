use anyhow::{Context as _, Result};
use derive_getters::Getters;
use imapsweep::{Credentials, DEFAULT_PORT};
use serde::Deserialize;

pub use crate::config::auth::AuthConfig;

#[derive(Debug, Deserialize, Getters)]
#[serde(deny_unknown_fields)]
pub struct AccountConfig {
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    auth: AuthConfig,
}

impl AccountConfig {
    /// Fetches the password and validates both parts of the login.
    pub fn credentials(&self) -> Result<Credentials> {
        match &self.auth {
            AuthConfig::Plain(plain) => {
                let password = plain.password()?;
                Credentials::new(plain.user(), &password)
                    .with_context(|| format!("invalid credentials for {}", plain.user()))
            }
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
