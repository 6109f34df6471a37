mod report;

use anyhow::{Context as _, Result};
use imapsweep::{BatchProgress, Cleaner, Connector, ImapConnector, Progress};
use log::{error, info, warn};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;

use crate::{Args, Command, config::Config};

pub fn run(args: &Args, config: &Config) -> Result<()> {
    let account = config.account(args.account.as_deref())?;
    let connector = ImapConnector::new(account.host(), account.port(), account.credentials()?);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()
        .context("tokio runtime should be buildable")?;

    rt.block_on(async {
        let cancellation = CancellationToken::new();
        tokio::spawn(cancel_on_interrupt(cancellation.clone()));

        let cleaner = Cleaner::connect(connector, *config.batches())
            .await
            .with_context(|| format!("cannot open {}", account.host()))?;
        let (progress, updates) = Progress::channel();
        let progress = progress.with_cancellation(cancellation);

        let (result, ()) = tokio::join!(
            execute(&args.command, &cleaner, progress),
            log_progress(updates)
        );
        result
    })
}

async fn execute<C: Connector>(
    command: &Command,
    cleaner: &Cleaner<C>,
    progress: Progress,
) -> Result<()> {
    match command {
        Command::Folders => {
            let folders = cleaner.list_folders(&progress).await?;
            report::folders(&folders, cleaner.catalog());
            Ok(())
        }
        Command::Count { folder } => {
            let count = cleaner.count_messages(folder).await?;
            println!("{count}");
            Ok(())
        }
        Command::Senders { max_batches, limit } => {
            let report = cleaner.sender_statistics(*max_batches, &progress).await?;
            report::senders(&report, *limit);
            Ok(())
        }
        Command::DeleteSender { address } => report::outcome(
            "moved to trash",
            cleaner.delete_from_sender(address, &progress).await,
        ),
        Command::Prune {
            folder,
            days,
            action,
        } => report::outcome(
            &format!("{action}d"),
            cleaner
                .prune_older_than(folder, *days, *action, &progress)
                .await,
        ),
        Command::EmptyTrash => report::outcome(
            "permanently deleted",
            cleaner.empty_trash(&progress).await,
        ),
    }
}

async fn log_progress(mut updates: UnboundedReceiver<BatchProgress>) {
    while let Some(BatchProgress { processed, total }) = updates.recv().await {
        info!("{processed}/{total}");
    }
}

async fn cancel_on_interrupt(cancellation: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    warn!("interrupted, stopping after the current batch");
    cancellation.cancel();
    if tokio::signal::ctrl_c().await.is_ok() {
        error!("interrupted again, exiting immediately");
        std::process::exit(130);
    }
}
