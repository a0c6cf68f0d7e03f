//! The bot's main loop: pulls messages off every channel and routes each
//! one to onboarding, a command, or the chat orchestrator.

use std::sync::Arc;

use futures::StreamExt;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use super::chat::ChatOrchestrator;
use super::commands::{Command, CommandParser};
use crate::channels::{ChannelManager, IncomingMessage, OutgoingResponse, StatusUpdate};
use crate::error::Error;
use crate::onboarding::{OnboardingManager, OnboardingStep, ProfileField, prompts};
use crate::store::ProfileStore;

/// Everything needed to answer a message.
pub struct Companion {
    channels: Arc<ChannelManager>,
    profiles: ProfileStore,
    onboarding: OnboardingManager,
    chat: ChatOrchestrator,
    bot_name: String,
}

impl Companion {
    pub fn new(
        channels: Arc<ChannelManager>,
        profiles: ProfileStore,
        onboarding: OnboardingManager,
        chat: ChatOrchestrator,
        bot_name: impl Into<String>,
    ) -> Self {
        Self {
            channels,
            profiles,
            onboarding,
            chat,
            bot_name: bot_name.into(),
        }
    }

    /// Run until Ctrl+C or until every channel stream ends.
    ///
    /// Each message is handled on its own task, so a slow model call for one
    /// user never holds up another. Handlers still running when the loop
    /// stops are awaited before the channels shut down.
    pub async fn run(self: Arc<Self>) -> Result<(), Error> {
        let mut message_stream = self.channels.start_all().await?;
        let mut in_flight = JoinSet::new();

        info!("{} ready and listening", self.bot_name);

        loop {
            let message = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl+C received, shutting down...");
                    break;
                }
                Some(done) = in_flight.join_next(), if !in_flight.is_empty() => {
                    report_handler(done);
                    continue;
                }
                msg = message_stream.next() => {
                    match msg {
                        Some(m) => m,
                        None => {
                            info!("All channel streams ended, shutting down...");
                            break;
                        }
                    }
                }
            };

            let this = Arc::clone(&self);
            in_flight.spawn(async move {
                this.handle_message(&message).await;
            });
        }

        if !in_flight.is_empty() {
            info!(pending = in_flight.len(), "Waiting for in-flight messages");
        }
        while let Some(done) = in_flight.join_next().await {
            report_handler(done);
        }

        self.channels.shutdown_all().await?;
        Ok(())
    }

    /// Answer one message. Never fails; problems are logged.
    pub async fn handle_message(&self, msg: &IncomingMessage) {
        let user_id = msg.user_id.as_str();
        debug!(user_id = %user_id, channel = %msg.channel, "Message received");

        match CommandParser::parse(&msg.content) {
            Command::Start => {
                let reply = self.onboarding.start(user_id).await;
                self.send(msg, reply).await;
            }
            Command::Help => self.send(msg, prompts::help(&self.bot_name)).await,
            Command::AboutMe => {
                let reply = match self.profiles.get(user_id).await {
                    Some(profile) => prompts::about_me(&profile),
                    None => prompts::about_me_missing(),
                };
                self.send(msg, reply).await;
            }
            Command::Forget => {
                self.profiles
                    .update_field(user_id, ProfileField::Memory(String::new()))
                    .await;
                info!(user_id = %user_id, "Memory cleared");
                self.send(msg, prompts::memory_cleared()).await;
            }
            Command::Unknown(name) => {
                debug!(command = %name, "Unknown command");
                self.send(msg, prompts::help(&self.bot_name)).await;
            }
            Command::Text(text) if text.is_empty() => {}
            Command::Text(text) => self.handle_text(msg, &text).await,
        }
    }

    async fn handle_text(&self, msg: &IncomingMessage, text: &str) {
        let profile = match self.profiles.get(&msg.user_id).await {
            Some(p) if p.onboarding_step != OnboardingStep::NotStarted => p,
            _ => {
                self.send(msg, prompts::please_start()).await;
                return;
            }
        };

        if !profile.is_onboarded() {
            if let Some(reply) = self.onboarding.handle_answer(&profile, text).await {
                self.send(msg, reply).await;
            }
            return;
        }

        if let Err(e) = self.channels.send_status(msg, StatusUpdate::Typing).await {
            debug!("Typing indicator failed: {e}");
        }

        match self.chat.reply(&profile, text).await {
            Some(reply) => {
                self.send(msg, reply.clone()).await;
                self.chat.remember(&profile, text, &reply).await;
            }
            None => self.send(msg, prompts::apology()).await,
        }
    }

    async fn send(&self, msg: &IncomingMessage, text: String) {
        if let Err(e) = self
            .channels
            .respond(msg, OutgoingResponse::text(text))
            .await
        {
            warn!(user_id = %msg.user_id, channel = %msg.channel, "Failed to send reply: {e}");
        }
    }
}

fn report_handler(result: Result<(), JoinError>) {
    if let Err(e) = result {
        error!("Message handler failed: {e}");
    }
}
