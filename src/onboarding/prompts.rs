//! User-facing onboarding replies and the chat system prompt.

use super::model::{Preferences, Profile};

/// Persona used when no override is configured. `{bot_name}` and
/// `{user_name}` are substituted at prompt build time.
pub const DEFAULT_PERSONA: &str = "\
You are {bot_name}, a warm and attentive companion for {user_name}.
You talk like a close friend: relaxed, caring, a little playful when the moment allows.
You remember what {user_name} has shared and bring it up naturally.
You celebrate good news, sit with bad news, and never lecture.
You keep things tasteful and never produce explicit or graphic content.";

/// Closing instructions appended to every system prompt.
const REPLY_GUIDELINES: &str = "\
When responding:
- Be warm and attentive.
- Use the user's name now and then.
- Mirror the user's mood: gentle when they are down, playful when they are playful.
- Respect the user's boundaries.
- Aim for 200 to 400 characters.";

/// Fill in the bot's name. `{user_name}` is left for [`build_system_prompt`].
pub fn render_persona(template: &str, bot_name: &str) -> String {
    template.replace("{bot_name}", bot_name)
}

/// Build the system prompt for a chat turn.
///
/// `persona` may still carry a `{user_name}` placeholder; it is filled in
/// with `name`.
pub fn build_system_prompt(
    name: &str,
    preferences: &Preferences,
    memory: &str,
    persona: &str,
) -> String {
    let mut sections = vec![persona.replace("{user_name}", name).trim().to_string()];

    if !preferences.is_empty() {
        let lines: Vec<String> = preferences
            .iter()
            .map(|(key, value)| format!("- {key}: {value}"))
            .collect();
        sections.push(format!("User preferences:\n{}", lines.join("\n")));
    }

    if !memory.trim().is_empty() {
        sections.push(format!("Memory (earlier conversation notes):\n{memory}"));
    }

    sections.push(REPLY_GUIDELINES.to_string());
    sections.join("\n\n")
}

/// Wrap raw user text for the model.
pub fn build_user_message(text: &str) -> String {
    format!("User: {text}")
}

// ── Onboarding replies ──────────────────────────────────────────────

pub fn greeting(bot_name: &str) -> String {
    format!(
        "Hi, I'm {bot_name}! Before we start chatting I'd love to get to know you a little.\n\n\
         What should I call you?"
    )
}

pub fn welcome_back(name: &str, bot_name: &str) -> String {
    format!("Welcome back, {name}! {bot_name} missed you. What's on your mind?")
}

pub fn ask_tone(name: &str) -> String {
    format!(
        "Nice to meet you, {name}! How would you like me to talk with you? \
         (for example: playful, calm, supportive, witty)"
    )
}

pub fn ask_hobbies() -> String {
    "Got it. What do you enjoy doing? List a few hobbies separated by commas.".to_string()
}

pub fn ask_boundaries() -> String {
    "Is there anything you'd rather I avoid talking about? Reply \"none\" if not.".to_string()
}

/// Summary shown before the final yes/no.
pub fn confirmation_summary(name: &str, preferences: &Preferences) -> String {
    let tone = preferences.tone().unwrap_or("");
    let hobbies = preferences.hobbies().join(", ");
    let boundaries = match preferences.boundaries() {
        Some(b) if !b.is_empty() => b,
        _ => "None",
    };
    format!(
        "Here's what I have:\n\
         Name: {name}\n\
         Tone: {tone}\n\
         Hobbies: {hobbies}\n\
         Boundaries: {boundaries}\n\n\
         Does that look right? (yes/no)"
    )
}

pub fn onboarding_done(name: &str) -> String {
    format!("Perfect, {name}! We're all set. Talk to me about anything.")
}

pub fn restart_onboarding() -> String {
    "No problem, let's go again. What should I call you?".to_string()
}

pub fn please_start() -> String {
    "Hi! Please send /start so we can get to know each other first.".to_string()
}

// ── Command replies ─────────────────────────────────────────────────

/// How much memory `/aboutme` shows.
pub const ABOUT_ME_MEMORY_PREVIEW: usize = 800;

pub fn about_me(profile: &Profile) -> String {
    let name = profile.name.as_deref().unwrap_or("(not set)");
    let prefs = if profile.preferences.is_empty() {
        "(none)".to_string()
    } else {
        profile
            .preferences
            .iter()
            .map(|(key, value)| format!("- {key}: {value}"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let memory: String = profile.memory.chars().take(ABOUT_ME_MEMORY_PREVIEW).collect();
    format!("Name: {name}\nPreferences:\n{prefs}\nMemory:\n{memory}...")
}

pub fn about_me_missing() -> String {
    "Please /start first.".to_string()
}

pub fn memory_cleared() -> String {
    "Done. I've cleared my memory of our conversations.".to_string()
}

pub fn help(bot_name: &str) -> String {
    format!(
        "I'm {bot_name}, your companion.\n\n\
         /start - set up or redo your profile\n\
         /aboutme - see what I know about you\n\
         /forget - clear my memory of our chats\n\
         /help - show this message"
    )
}

pub fn apology() -> String {
    "Sorry, I couldn't come up with a reply just now. Could you try again in a moment?".to_string()
}
