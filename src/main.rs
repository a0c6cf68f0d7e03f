use std::sync::Arc;

use anyhow::Context;

use companion_bot::bot::{ChatOrchestrator, Companion};
use companion_bot::channels::{ChannelManager, CliChannel, TelegramChannel};
use companion_bot::config::BotConfig;
use companion_bot::llm::create_provider;
use companion_bot::memory::{MemoryTrimmer, Summarizer};
use companion_bot::onboarding::prompts::{DEFAULT_PERSONA, render_persona};
use companion_bot::onboarding::{OnboardingManager, ProfileRouteState, profile_routes};
use companion_bot::safety::Sanitizer;
use companion_bot::store::{Database, LibSqlBackend, ProfileStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env().context("Invalid configuration")?;

    eprintln!("💬 {} v{}", config.bot_name, env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   Summary model: {}", config.summary_model);
    eprintln!("   Memory limit: {} chars", config.memory.max_memory_chars);

    // ── LLM ─────────────────────────────────────────────────────────────
    let chat_llm = create_provider(&config.llm)?;
    let summary_llm = create_provider(&config.llm.with_model(&config.summary_model))?;

    // ── Database ────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?,
    );
    let profiles = ProfileStore::new(db);
    eprintln!("   Database: {}", config.db_path.display());

    // ── Conversation ────────────────────────────────────────────────────
    let summarizer = Summarizer::new(summary_llm, Arc::new(Sanitizer::new()), config.memory);
    let persona = render_persona(
        config.persona.as_deref().unwrap_or(DEFAULT_PERSONA),
        &config.bot_name,
    );
    let chat = ChatOrchestrator::new(
        chat_llm,
        profiles.clone(),
        MemoryTrimmer::new(summarizer),
        persona,
        &config.bot_name,
    );
    let onboarding = OnboardingManager::new(profiles.clone(), &config.bot_name);

    // ── HTTP (health + profile lookup) ──────────────────────────────────
    let app = profile_routes(ProfileRouteState {
        profiles: profiles.clone(),
    });
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.http_port))
        .await
        .with_context(|| format!("Failed to bind HTTP port {}", config.http_port))?;
    eprintln!("   HTTP: http://0.0.0.0:{}/", config.http_port);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("HTTP server stopped: {e}");
        }
    });

    // ── Channels ────────────────────────────────────────────────────────
    let mut channels = ChannelManager::new();

    if let Some(telegram) = &config.telegram {
        eprintln!(
            "   Telegram: enabled (allowed: {})",
            if telegram.allowed_users.iter().any(|u| u == "*") {
                "everyone".to_string()
            } else {
                telegram.allowed_users.join(", ")
            }
        );
        channels.add(Box::new(TelegramChannel::new(
            telegram.bot_token.clone(),
            telegram.allowed_users.clone(),
        )));
    }

    // Without Telegram the terminal is the only way in.
    if config.cli_enabled || config.telegram.is_none() {
        channels.add(Box::new(CliChannel::new()));
    }

    for (name, result) in channels.health_check_all().await {
        if let Err(e) = result {
            tracing::warn!(channel = %name, "Channel health check failed: {e}");
            eprintln!("   Warning: {name} is not reachable: {e}");
        }
    }

    eprintln!("   Channels: {}\n", channels.names().join(", "));

    let companion = Arc::new(Companion::new(
        Arc::new(channels),
        profiles,
        onboarding,
        chat,
        &config.bot_name,
    ));
    companion.run().await?;

    Ok(())
}
