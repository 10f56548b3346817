//! User-facing channels: the terminal REPL and the browser dashboard.

mod repl;
pub mod web;

pub use repl::{ReplChannel, ReplInput, is_exit_command};
pub use web::Dashboard;
