//! CLI argument parsing via clap.

use clap::{Parser, Subcommand};

/// Terminal and stdio front end for the ceptra assistant.
#[derive(Debug, Parser)]
#[command(
    name = "ceptra",
    version,
    args_conflicts_with_subcommands = true,
    after_help = ceptra::build_info::HELP_BUILD_METADATA
)]
pub struct Args {
    /// Prompt to send. If provided, runs in one-shot mode and exits.
    pub prompt: Option<String>,

    /// Path to config file (default: ./ceptra.toml or ~/.config/ceptra/ceptra.toml).
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<String>,

    /// Override the chat gateway URL.
    #[arg(long = "server-url", global = true)]
    pub server_url: Option<String>,

    /// Project root commands run in (default: current directory).
    #[arg(short = 'w', long = "workspace")]
    pub workspace: Option<String>,

    /// File whose first lines are included in the workspace snapshot.
    #[arg(long = "active-file")]
    pub active_file: Option<String>,

    /// Speak the JSON-lines surface protocol on stdin/stdout.
    #[arg(long = "stdio", conflicts_with = "prompt")]
    pub stdio: bool,

    /// Disable color output.
    #[arg(long = "no-color")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Sign in and store the credential for later sessions.
    Login {
        /// Account email; prompted for when omitted.
        #[arg(long)]
        email: Option<String>,
    },
    /// Forget the stored credential.
    Logout,
    /// Write the default ~/.config/ceptra/ceptra.toml.
    Init {
        /// Back up and overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
}
