//! vault-chat: ask questions about Akeyless secrets in plain language.
//!
//! Gemini function calling drives a small set of read-only vault tools.
//! The same agent is available from a terminal REPL and a browser dashboard.

pub mod agent;
pub mod channels;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod observability;
pub mod tools;
pub mod vault;
