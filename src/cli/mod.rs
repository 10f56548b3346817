//! Command-line interface.
//!
//! - `vault-chat` / `vault-chat chat`: terminal REPL
//! - `vault-chat -m "..."`: answer one message and exit
//! - `vault-chat serve`: browser dashboard

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "vault-chat")]
#[command(about = "Ask questions about your Akeyless secrets, answered by Gemini")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Single message mode - send one message and exit
    #[arg(short, long, global = true)]
    pub message: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Chat in the terminal (default if no subcommand given)
    Chat,

    /// Serve the browser dashboard
    Serve {
        /// Address to bind (overrides DASHBOARD_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides DASHBOARD_PORT)
        #[arg(long)]
        port: Option<u16>,
    },
}

impl Cli {
    /// Whether to run the terminal REPL (default behavior or explicit `chat`).
    pub fn should_run_repl(&self) -> bool {
        self.message.is_some() || matches!(self.command, None | Some(Command::Chat))
    }
}
