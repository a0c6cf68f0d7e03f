//! Companion bot: onboarding, per-user profiles, and chat with a bounded
//! running memory.

pub mod bot;
pub mod channels;
pub mod config;
pub mod error;
pub mod llm;
pub mod memory;
pub mod onboarding;
pub mod safety;
pub mod store;
