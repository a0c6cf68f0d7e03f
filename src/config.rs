//! Configuration types.
//!
//! Everything is read once at startup by [`BotConfig::from_env`] and handed
//! to the components that need it.

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};

/// Memory never grows past this many characters.
pub const DEFAULT_MAX_MEMORY_CHARS: usize = 3000;

/// Text shorter than this is not worth summarizing.
pub const DEFAULT_MIN_SUMMARIZE_CHARS: usize = 50;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

pub const DEFAULT_BOT_NAME: &str = "LISA";

/// Running-memory limits shared by the summarizer and trimmer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryConfig {
    pub max_memory_chars: usize,
    pub min_summarize_chars: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_memory_chars: DEFAULT_MAX_MEMORY_CHARS,
            min_summarize_chars: DEFAULT_MIN_SUMMARIZE_CHARS,
        }
    }
}

/// Telegram Bot API settings.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Usernames or numeric ids; `*` allows everyone.
    pub allowed_users: Vec<String>,
}

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Name the bot signs its turns with in memory.
    pub bot_name: String,
    /// Persona override for the chat system prompt.
    pub persona: Option<String>,
    pub memory: MemoryConfig,
    /// Chat model.
    pub llm: LlmConfig,
    /// Model used for memory summaries.
    pub summary_model: String,
    pub db_path: PathBuf,
    /// Port for the health / profile HTTP server.
    pub http_port: u16,
    pub telegram: Option<TelegramConfig>,
    /// Read messages from stdin as well.
    pub cli_enabled: bool,
}

impl BotConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("GEMINI_API_KEY")
            .ok_or_else(|| ConfigError::MissingEnvVar("GEMINI_API_KEY".to_string()))?;

        let model = get("COMPANION_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let summary_model =
            get("COMPANION_SUMMARY_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let max_memory_chars = parse_or(
            "COMPANION_MAX_MEMORY_CHARS",
            get("COMPANION_MAX_MEMORY_CHARS"),
            DEFAULT_MAX_MEMORY_CHARS,
        )?;
        if max_memory_chars == 0 {
            return Err(ConfigError::InvalidValue {
                key: "COMPANION_MAX_MEMORY_CHARS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        let http_port = parse_or("COMPANION_HTTP_PORT", get("COMPANION_HTTP_PORT"), 8080u16)?;

        let telegram = get("TELEGRAM_BOT_TOKEN").map(|bot_token| TelegramConfig {
            bot_token,
            allowed_users: get("TELEGRAM_ALLOWED_USERS")
                .unwrap_or_else(|| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        });

        let cli_enabled = get("COMPANION_CLI")
            .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            bot_name: get("COMPANION_BOT_NAME").unwrap_or_else(|| DEFAULT_BOT_NAME.to_string()),
            persona: get("COMPANION_PERSONA"),
            memory: MemoryConfig {
                max_memory_chars,
                ..MemoryConfig::default()
            },
            llm: LlmConfig {
                backend: LlmBackend::Gemini,
                api_key: secrecy::SecretString::from(api_key),
                model,
            },
            summary_model,
            db_path: get("COMPANION_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data/companion.db")),
            http_port,
            telegram,
            cli_enabled,
        })
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match raw {
        Some(v) => v.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{v:?}: {e}"),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<BotConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BotConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_with_only_api_key() {
        let config = load(&[("GEMINI_API_KEY", "k")]).unwrap();
        assert_eq!(config.bot_name, "LISA");
        assert_eq!(config.memory, MemoryConfig::default());
        assert_eq!(config.memory.max_memory_chars, 3000);
        assert_eq!(config.memory.min_summarize_chars, 50);
        assert_eq!(config.llm.model, DEFAULT_MODEL);
        assert_eq!(config.summary_model, DEFAULT_MODEL);
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.db_path, PathBuf::from("./data/companion.db"));
        assert!(config.telegram.is_none());
        assert!(!config.cli_enabled);
        assert!(config.persona.is_none());
    }

    #[test]
    fn missing_api_key() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "GEMINI_API_KEY"));
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let err = load(&[("GEMINI_API_KEY", "  ")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn telegram_allowlist_parsing() {
        let config = load(&[
            ("GEMINI_API_KEY", "k"),
            ("TELEGRAM_BOT_TOKEN", "123:ABC"),
            ("TELEGRAM_ALLOWED_USERS", "alice, 42 ,,bob"),
        ])
        .unwrap();
        let tg = config.telegram.unwrap();
        assert_eq!(tg.bot_token, "123:ABC");
        assert_eq!(tg.allowed_users, vec!["alice", "42", "bob"]);
    }

    #[test]
    fn telegram_allowlist_defaults_to_everyone() {
        let config = load(&[("GEMINI_API_KEY", "k"), ("TELEGRAM_BOT_TOKEN", "t")]).unwrap();
        assert_eq!(config.telegram.unwrap().allowed_users, vec!["*"]);
    }

    #[test]
    fn overrides() {
        let config = load(&[
            ("GEMINI_API_KEY", "k"),
            ("COMPANION_MODEL", "gemini-2.0-pro"),
            ("COMPANION_SUMMARY_MODEL", "gemini-2.0-flash-lite"),
            ("COMPANION_MAX_MEMORY_CHARS", "1200"),
            ("COMPANION_HTTP_PORT", "9000"),
            ("COMPANION_BOT_NAME", "Mia"),
            ("COMPANION_PERSONA", "Mia is kind."),
            ("COMPANION_DB_PATH", "/tmp/x.db"),
            ("COMPANION_CLI", "true"),
        ])
        .unwrap();
        assert_eq!(config.llm.model, "gemini-2.0-pro");
        assert_eq!(config.summary_model, "gemini-2.0-flash-lite");
        assert_eq!(config.memory.max_memory_chars, 1200);
        assert_eq!(config.http_port, 9000);
        assert_eq!(config.bot_name, "Mia");
        assert_eq!(config.persona.as_deref(), Some("Mia is kind."));
        assert_eq!(config.db_path, PathBuf::from("/tmp/x.db"));
        assert!(config.cli_enabled);
    }

    #[test]
    fn invalid_number_is_reported() {
        let err = load(&[("GEMINI_API_KEY", "k"), ("COMPANION_HTTP_PORT", "eighty")]).unwrap_err();
        match err {
            ConfigError::InvalidValue { key, .. } => assert_eq!(key, "COMPANION_HTTP_PORT"),
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn zero_memory_limit_rejected() {
        let err = load(&[
            ("GEMINI_API_KEY", "k"),
            ("COMPANION_MAX_MEMORY_CHARS", "0"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
