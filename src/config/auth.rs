use std::process::Command;

use anyhow::{Context as _, Result, bail, ensure};
use derive_getters::Getters;
use serde::Deserialize;

#[derive(Debug, Deserialize, Getters)]
#[serde(deny_unknown_fields)]
pub struct PlainAuthConfig {
    user: String,
    #[getter(skip)]
    password_cmd: String,
}

impl PlainAuthConfig {
    /// Runs `password_cmd` and returns the first line it prints.
    pub fn password(&self) -> Result<String> {
        let mut cmd_parts = self.password_cmd.split_whitespace();
        let Some(program) = cmd_parts.next() else {
            bail!("password_cmd should specify a program");
        };
        let output = Command::new(program)
            .args(cmd_parts)
            .output()
            .with_context(|| format!("password_cmd {program} should be executable"))?;
        ensure!(
            output.status.success(),
            "password_cmd {program} failed with {}",
            output.status
        );

        let stdout = String::from_utf8(output.stdout)
            .context("password_cmd should evaluate to a utf-8 password")?;
        let password = stdout.lines().next().unwrap_or_default().trim_end();
        ensure!(
            !password.is_empty(),
            "could not retrieve password from password_cmd"
        );
        Ok(password.to_string())
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum AuthConfig {
    Plain(PlainAuthConfig),
}
