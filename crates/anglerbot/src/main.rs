//! Runs the bot from the command line.
//!
//! ```text
//! anglerbot --config config.json --accountfile account.json --logsdir logs
//! ```
//!
//! Ctrl-C stops the bot: the current session is torn down and the live
//! connection is closed even if the session loop is busy.

use std::path::PathBuf;

use angler::prelude::*;
use anyhow::Context;
use clap::Parser;
use tokio::sync::broadcast::{self, error::RecvError};

#[derive(Debug, Parser)]
#[command(name = "anglerbot", version, about = "Headless fishing bot")]
struct Args {
    /// Settings file; created with defaults if missing.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Identity cache written by an earlier login.
    #[arg(long, default_value = "account.json")]
    accountfile: PathBuf,

    /// Directory for the rotating log files.
    #[arg(long, default_value = "logs")]
    logsdir: PathBuf,

    /// Don't print lifecycle notices to the console.
    #[arg(long)]
    nogui: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let settings = Settings::load_or_create(&args.config)
        .with_context(|| format!("could not load {}", args.config.display()))?;
    init_logging(&args.logsdir, settings.log_count).context("could not set up logging")?;
    tracing::info!(
        config = %args.config.display(),
        account = %args.accountfile.display(),
        "bot-starting"
    );

    let collaborators = Collaborators::new(
        TcpConnector::new(),
        AccountCacheBackend,
        RealmsClient::new(),
        TcpProber::new(),
    );
    let mut controller = SessionController::new(settings, &args.accountfile, collaborators);

    if !args.nogui {
        tokio::spawn(present(controller.subscribe()));
    }

    let stop = controller.stop_handle();
    let hook = controller.shutdown_hook();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("shutdown-signal-received");
                stop.stop();
                hook.close().await;
            }
            Err(e) => tracing::warn!(error = %e, "shutdown-signal-unavailable"),
        }
    });

    let termination = controller.start().await;
    tracing::info!(%termination, "bot-exiting");
    Ok(())
}

/// Prints notices until the controller goes away.
async fn present(mut notices: broadcast::Receiver<LifecycleNotice>) {
    loop {
        match notices.recv().await {
            Ok(notice) => println!("{notice}"),
            Err(RecvError::Lagged(skipped)) => tracing::debug!(skipped, "notices skipped"),
            Err(RecvError::Closed) => break,
        }
    }
}
