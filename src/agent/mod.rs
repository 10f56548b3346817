//! Conversational agent: the tool-dispatch loop between the model and the vault.

mod dispatcher;

pub use dispatcher::{Agent, SYSTEM_INSTRUCTION};
