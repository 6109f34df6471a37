use anstyle::{AnsiColor, Style};
use imapsweep::{Error, FolderCatalog, FolderDescriptor, MutationOutcome, SenderReport};
use log::warn;

fn header() -> Style {
    Style::new().bold()
}

pub fn folders(folders: &[FolderDescriptor], catalog: &FolderCatalog) {
    let width = folders
        .iter()
        .map(|folder| folder.raw_path().name().chars().count())
        .max()
        .unwrap_or_default()
        .max("FOLDER".len());
    let header = header();
    let role_style = AnsiColor::Cyan.on_default();
    println!("{header}{:<width$}  {:>8}  ROLE{header:#}", "FOLDER", "MESSAGES");
    for (folder, entry) in folders.iter().zip(catalog.entries()) {
        let role = FolderCatalog::classify(entry);
        println!(
            "{:<width$}  {:>8}  {role_style}{role}{role_style:#}",
            folder.raw_path().name(),
            folder.message_count(),
        );
    }
}

pub fn senders(report: &SenderReport, limit: usize) {
    if report.partial() {
        warn!(
            "partial result: analysed {} of {} messages",
            report.examined(),
            report.available()
        );
    }
    let header = header();
    println!("{header}{:>6}  SENDER{header:#}", "COUNT");
    for sender in report.senders().iter().take(limit) {
        let name = if sender.display_name().is_empty() {
            String::new()
        } else {
            format!("{} ", sender.display_name())
        };
        println!("{:>6}  {name}<{}>", sender.count(), sender.address());
        if let Some(link) = sender.unsubscribe_link() {
            println!("        unsubscribe: {link}");
        }
    }
}

/// Prints the outcome of a mutation, including how far a failed run got.
pub fn outcome(verb: &str, result: imapsweep::Result<MutationOutcome>) -> anyhow::Result<()> {
    match result {
        Ok(outcome) => {
            println!("{} of {} messages {verb}", outcome.succeeded(), outcome.attempted());
            if outcome.is_partial() {
                warn!("not every message was processed");
            }
            Ok(())
        }
        Err(Error::Cancelled { processed, total }) => {
            println!("cancelled: {processed} of {total} messages {verb}");
            Ok(())
        }
        Err(e @ Error::Interrupted { processed, total, .. }) => {
            println!("{processed} of {total} messages {verb} before the failure");
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}
