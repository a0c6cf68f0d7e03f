//! Conversation handling: command parsing, chat turns, and the message
//! loop tying them to the channels.

pub mod chat;
pub mod commands;
pub mod companion;

pub use chat::ChatOrchestrator;
pub use commands::{Command, CommandParser};
pub use companion::Companion;
