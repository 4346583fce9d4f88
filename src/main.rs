use std::process;

use anyhow::Context;
use cc_switch_tui::cli::{Cli, Commands};
use clap::Parser;

fn main() {
    let cli = Cli::parse();

    // The TUI owns the terminal, so only errors are logged unless asked.
    let log_level = if cli.verbose { "debug" } else { "error" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        None | Some(Commands::Interactive) => {
            cc_switch_tui::cli::tui::run(cli.app, cli.view).context("interactive session failed")
        }
        Some(Commands::Completions { shell }) => {
            cc_switch_tui::cli::generate_completions(shell);
            Ok(())
        }
    }
}
