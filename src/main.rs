//! Centre - window centring from the macOS menu bar
//!
//! Parses the command line, initialises logging, and either runs the menu
//! bar app or executes a one-shot command.

use centre::{
    cli::{CentreCli, CentreCliExecutor, Commands},
    config::PreferencesStore,
    lifecycle::{self, CentreServices},
    logging::{init_logging, LogConfig},
    Result,
};
use clap::Parser;
use tracing::error;

fn main() {
    let cli = CentreCli::parse();

    if let Err(err) = run(cli) {
        error!("{:#}", err);
        eprintln!("centre: {:#}", err);
        std::process::exit(1);
    }
}

fn run(cli: CentreCli) -> Result<()> {
    let command = cli.command();
    let interactive = command == Commands::Run;

    // The app has no terminal; one-shot commands log to stdout
    let mut log_config = if interactive {
        LogConfig::menu_bar().with_overrides(|key| std::env::var(key).ok())
    } else {
        LogConfig::from_env()
    };
    if cli.verbose {
        log_config = log_config.verbose();
    }
    init_logging(&log_config)?;

    let services = CentreServices::system(PreferencesStore::default(), interactive);

    if interactive {
        return lifecycle::run(services);
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    CentreCliExecutor::new(&services, cli.json).execute(command, &mut out)
}
