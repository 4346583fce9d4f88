use clap::{Parser, Subcommand};
use clap_complete::Shell;

pub mod tui;

use crate::app_config::{AppType, ViewMode};

#[derive(Parser)]
#[command(
    name = "cc-switch-tui",
    version,
    about = "Interactive provider switcher for Claude Code, Codex & Gemini CLI",
    long_about = "Switch provider profiles, browse backups, apply instruction templates and manage MCP servers for Claude Code, Codex & Gemini CLI.\n\nRun without arguments to enter interactive mode."
)]
pub struct Cli {
    /// Tool to open first
    #[arg(short, long, global = true, value_enum)]
    pub app: Option<AppType>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Provider list layout (defaults to the saved preference)
    #[arg(long, global = true, value_enum)]
    pub view: Option<ViewMode>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Enter interactive mode
    #[command(alias = "ui")]
    Interactive,

    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Generate shell completions
pub fn generate_completions(shell: Shell) {
    use clap::CommandFactory;
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
}
