//! ChannelManager: runs every configured channel and routes replies back
//! to the one a message came from.

use futures::stream::{self, StreamExt};

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse, StatusUpdate};
use crate::error::ChannelError;

/// Owns the active channels.
#[derive(Default)]
pub struct ChannelManager {
    channels: Vec<Box<dyn Channel>>,
}

impl ChannelManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, channel: Box<dyn Channel>) {
        tracing::debug!(channel = channel.name(), "Channel registered");
        self.channels.push(channel);
    }

    pub fn names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    fn get(&self, name: &str) -> Result<&dyn Channel, ChannelError> {
        self.channels
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.as_ref())
            .ok_or_else(|| ChannelError::UnknownChannel {
                name: name.to_string(),
            })
    }

    /// Start every channel and merge their streams.
    ///
    /// A channel that fails to start is logged and skipped. Fails only when
    /// no channel could be started.
    pub async fn start_all(&self) -> Result<MessageStream, ChannelError> {
        let mut streams = Vec::new();
        let mut last_error = None;

        for channel in &self.channels {
            match channel.start().await {
                Ok(s) => {
                    tracing::info!(channel = channel.name(), "Channel started");
                    streams.push(s);
                }
                Err(e) => {
                    tracing::error!(channel = channel.name(), "Channel failed to start: {e}");
                    last_error = Some(e);
                }
            }
        }

        if streams.is_empty() {
            return Err(last_error.unwrap_or_else(|| ChannelError::StartupFailed {
                name: "all".into(),
                reason: "no channels configured".into(),
            }));
        }

        Ok(Box::pin(stream::select_all(streams)))
    }

    /// Reply on the channel `msg` arrived on.
    pub async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        self.get(&msg.channel)?.respond(msg, response).await
    }

    /// Forward a status update to the channel `msg` arrived on.
    pub async fn send_status(
        &self,
        msg: &IncomingMessage,
        status: StatusUpdate,
    ) -> Result<(), ChannelError> {
        self.get(&msg.channel)?
            .send_status(status, &msg.metadata)
            .await
    }

    /// Health of every channel, by name.
    pub async fn health_check_all(&self) -> Vec<(String, Result<(), ChannelError>)> {
        let checks = self.channels.iter().map(|c| async move {
            (c.name().to_string(), c.health_check().await)
        });
        futures::future::join_all(checks).await
    }

    pub async fn shutdown_all(&self) -> Result<(), ChannelError> {
        for channel in &self.channels {
            if let Err(e) = channel.shutdown().await {
                tracing::warn!(channel = channel.name(), "Channel shutdown failed: {e}");
            }
        }
        Ok(())
    }
}
