mod app;
mod cli;
mod config;
mod downloader;
mod error;
mod filter;
mod ledger;
mod model;
mod output;
mod prompt;
mod release;
mod verify;

use anyhow::{Context, Result};
use app::App;
use cli::Command;
use config::RecordStore;
use ledger::VersionLedger;
use prompt::Prompter;
use release::GitHubClient;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default = if verbose { "appimage_updater=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = cli::parse_args();
    init_logging(args.verbose);

    let store = RecordStore::new(args.config_dir);
    let ledger = VersionLedger::load(&args.app_folder)?;
    if let Some(reason) = ledger.recovered_from() {
        println!(
            "Warning: {} is malformed ({reason}), starting with an empty ledger",
            ledger.path().display()
        );
    }
    let github = GitHubClient::new(&args.api_url).context("failed to build HTTP client")?;
    let work_dir = std::env::current_dir()?;
    let mut app = App::new(store, ledger, github, work_dir);

    let stdin = std::io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), std::io::stdout());

    match args.command {
        Command::Setup => {
            app.setup(&mut prompter)?;
        }
        Command::List => {
            app.list()?;
        }
        Command::Install { repo } => {
            let repo = app.select_repo(repo, &mut prompter)?;
            app.install_repo(&repo)?;
        }
        Command::Check {
            install,
            format,
            output,
        } => {
            let rows = app.check(install)?;
            if let Some(format) = format {
                output::write_report(&rows, format, &output)?;
            }
        }
        Command::Edit { repo, field, value } => {
            app.edit(&repo, field, value, &mut prompter)?;
        }
        Command::Reconcile => {
            app.reconcile()?;
        }
    }

    Ok(())
}
