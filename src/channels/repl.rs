//! Line-based REPL over stdin/stdout.
//!
//! stdin is read on a dedicated thread that hands lines to the async side
//! over a channel and waits for the answer to be printed before showing the
//! next prompt, so one utterance is always finished before the next is read.

use std::io::{self, BufRead, Write};
use std::sync::mpsc as std_mpsc;

use tokio::sync::mpsc;

use crate::agent::Agent;
use crate::error::ChannelError;

const PROMPT: &str = "You: ";

/// Commands that end the session, compared case-insensitively.
const EXIT_COMMANDS: [&str; 3] = ["quit", "exit", "bye"];

/// What a single input line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplInput {
    Skip,
    Exit,
    Message(String),
}

impl ReplInput {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            Self::Skip
        } else if is_exit_command(line) {
            Self::Exit
        } else {
            Self::Message(line.to_string())
        }
    }
}

/// Whether `line` is one of `quit`, `exit`, `bye` in any letter case.
pub fn is_exit_command(line: &str) -> bool {
    let line = line.trim();
    EXIT_COMMANDS.iter().any(|cmd| line.eq_ignore_ascii_case(cmd))
}

/// Simple REPL channel using stdin/stdout.
pub struct ReplChannel {
    /// Optional single message to send (for -m flag).
    single_message: Option<String>,
}

impl ReplChannel {
    /// Create a new interactive REPL channel.
    pub fn new() -> Self {
        Self {
            single_message: None,
        }
    }

    /// Create a REPL channel that sends a single message and exits.
    pub fn with_message(message: String) -> Self {
        Self {
            single_message: Some(message),
        }
    }

    /// Run until the user exits or stdin closes.
    pub async fn run(self, agent: &mut Agent) -> Result<(), ChannelError> {
        if let Some(msg) = self.single_message {
            let answer = agent.chat(&msg).await;
            println!("{answer}");
            return Ok(());
        }

        print_banner();

        let (mut lines, ready) = spawn_reader(io::BufReader::new(io::stdin()), true);
        while let Some(line) = lines.recv().await {
            eprintln!("\nProcessing your request...");
            let answer = agent.chat(&line).await;
            println!("\nAgent: {answer}\n");
            if ready.send(()).is_err() {
                break;
            }
        }

        Ok(())
    }
}

impl Default for ReplChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Start the input thread.
///
/// Returns the stream of messages and the acknowledgement sender the
/// consumer must signal after handling each message. The stream ends on
/// EOF, a read error, or an exit command.
fn spawn_reader<R>(mut input: R, interactive: bool) -> (mpsc::Receiver<String>, std_mpsc::Sender<()>)
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);
    let (ready_tx, ready_rx) = std_mpsc::channel::<()>();

    std::thread::spawn(move || {
        let mut stdout = io::stdout();
        loop {
            if interactive {
                print!("{PROMPT}");
                let _ = stdout.flush();
            }

            let mut line = String::new();
            match input.read_line(&mut line) {
                Ok(0) => break, // EOF
                Ok(_) => match ReplInput::parse(&line) {
                    ReplInput::Skip => continue,
                    ReplInput::Exit => {
                        if interactive {
                            println!("\nGoodbye!");
                        }
                        break;
                    }
                    ReplInput::Message(msg) => {
                        if tx.blocking_send(msg).is_err() {
                            break;
                        }
                        if ready_rx.recv().is_err() {
                            break;
                        }
                    }
                },
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read from stdin");
                    break;
                }
            }
        }
    });

    (rx, ready_tx)
}

fn print_banner() {
    let rule = "=".repeat(60);
    println!("{rule}");
    println!("  Akeyless AI Agent - Powered by Gemini");
    println!("{rule}");
    println!();
    println!("You can now ask questions about your secrets. Examples:");
    println!("  - 'List all my secrets'");
    println!("  - 'Get the secret secrets/MysecondSecret'");
    println!("  - 'How many secrets do I have?'");
    println!("  - 'Show me MyFirstSecret'");
    println!();
    println!("Type 'quit' or 'exit' to stop.");
    println!();
}
