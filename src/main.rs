mod cli;
mod config;
mod logging;

use std::{num::NonZeroUsize, path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use config::Config;
use imapsweep::{MailboxPath, PruneAction};
use log::error;

#[derive(Debug, Parser)]
#[command(version, about = "Bulk maintenance for IMAP mailboxes")]
pub struct Args {
    /// Configuration file [default: $XDG_CONFIG_HOME/imapsweep/config.toml]
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Configured account to work on; may be left out when only one is configured
    #[arg(short, long)]
    account: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List all folders with their message counts
    Folders,
    /// Count the messages in a folder
    Count { folder: MailboxPath },
    /// Show who sent the messages in INBOX
    Senders {
        /// Only analyse this many fetch batches
        #[arg(long)]
        max_batches: Option<NonZeroUsize>,
        /// Number of senders to show
        #[arg(long, default_value_t = 25)]
        limit: usize,
    },
    /// Move all INBOX messages from a sender to the trash folder
    DeleteSender { address: String },
    /// Delete or archive messages older than a number of days
    Prune {
        folder: MailboxPath,
        #[arg(long, allow_negative_numbers = true)]
        days: i64,
        #[arg(long, default_value_t = PruneAction::Delete)]
        action: PruneAction,
    },
    /// Permanently remove everything in the trash folder
    EmptyTrash,
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init();

    let result =
        Config::load_from_file(args.config.as_deref()).and_then(|config| cli::run(&args, &config));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
