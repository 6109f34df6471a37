mod account;
mod auth;

use std::{
    collections::BTreeMap,
    env,
    fs::read_to_string,
    path::{Path, PathBuf},
};

use anyhow::{Context as _, Result, bail};
use derive_getters::Getters;
use imapsweep::BatchLimits;
use serde::Deserialize;

pub use account::AccountConfig;

#[derive(Debug, Deserialize, Getters)]
#[serde(deny_unknown_fields)]
pub struct Config {
    accounts: BTreeMap<String, AccountConfig>,
    #[serde(default)]
    batches: BatchLimits,
}

impl Config {
    pub fn load_from_file(file: Option<&Path>) -> Result<Self> {
        let config_file = match file {
            Some(file) => file.to_path_buf(),
            None => default_location()?,
        };
        let config_contents = read_to_string(&config_file)
            .with_context(|| format!("config file {} should be readable", config_file.display()))?;
        toml::from_str(&config_contents)
            .with_context(|| format!("config file {} should be parseable", config_file.display()))
    }

    /// The named account, or the only one when no name is given.
    pub fn account(&self, name: Option<&str>) -> Result<&AccountConfig> {
        match name {
            Some(name) => self.accounts.get(name).with_context(|| {
                format!(
                    "no account {name} configured, known accounts: {}",
                    self.account_names()
                )
            }),
            None if self.accounts.len() == 1 => Ok(self
                .accounts
                .values()
                .next()
                .context("accounts should not be empty")?),
            None => bail!(
                "--account is required, known accounts: {}",
                self.account_names()
            ),
        }
    }

    fn account_names(&self) -> String {
        self.accounts
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn default_location() -> Result<PathBuf> {
    let mut config_dir = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        PathBuf::from(config_home)
    } else {
        let home = env::var("HOME").context("HOME should be set")?;
        let mut config_home = PathBuf::from(home);
        config_home.push(".config");
        config_home
    };
    config_dir.push(env!("CARGO_PKG_NAME"));
    config_dir.push("config.toml");

    Ok(config_dir)
}
