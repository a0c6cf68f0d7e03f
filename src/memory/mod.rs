//! Bounded running memory.
//!
//! Each finished chat turn is appended to the profile's memory string. When
//! the result overflows the configured limit the whole transcript is
//! condensed by the [`Summarizer`] and hard-capped.

pub mod summarizer;
pub mod trimmer;

pub use summarizer::Summarizer;
pub use trimmer::MemoryTrimmer;

/// Cut `text` to at most `max_chars` chars, on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Length in chars, the unit every memory limit is expressed in.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Render one exchange the way it is stored in memory.
pub fn format_turn(speaker: &str, text: &str, bot_name: &str, reply: &str) -> String {
    format!("{speaker}: {text}\n{bot_name}: {reply}")
}
