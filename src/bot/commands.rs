//! Parses incoming text into bot commands.

/// What an incoming message asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start`: begin (or redo) onboarding.
    Start,
    /// `/aboutme`: show the stored profile.
    AboutMe,
    /// `/forget`: clear running memory.
    Forget,
    /// `/help`: list commands.
    Help,
    /// Some other slash command.
    Unknown(String),
    /// Plain text.
    Text(String),
}

/// Parses user input into [`Command`]s.
pub struct CommandParser;

impl CommandParser {
    /// Parse message content into a Command.
    ///
    /// Only the first word is inspected, so `/start now` is still `/start`.
    /// Telegram's `@BotName` suffix is ignored.
    pub fn parse(content: &str) -> Command {
        let trimmed = content.trim();
        if !trimmed.starts_with('/') {
            return Command::Text(trimmed.to_string());
        }

        let first = trimmed.split_whitespace().next().unwrap_or(trimmed);
        let name = first
            .split_once('@')
            .map(|(cmd, _)| cmd)
            .unwrap_or(first)
            .to_lowercase();

        match name.as_str() {
            "/start" => Command::Start,
            "/aboutme" => Command::AboutMe,
            "/forget" => Command::Forget,
            "/help" | "/?" => Command::Help,
            _ => Command::Unknown(name),
        }
    }
}
