//! CLI channel: talk to the bot from a terminal.
//!
//! Every line is sent as the same local user, so onboarding and memory
//! carry over between runs that share a database. `/quit` or EOF ends
//! the stream.

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse, StatusUpdate};
use crate::error::ChannelError;

const CHANNEL_NAME: &str = "cli";
const PROMPT: &str = "> ";

pub struct CliChannel {
    user_id: String,
}

#[derive(Debug)]
enum Line {
    Message(IncomingMessage),
    Blank,
    Quit,
}

impl CliChannel {
    pub fn new() -> Self {
        Self::with_user_id("local-user")
    }

    pub fn with_user_id(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

fn classify(user_id: &str, raw: &str) -> Line {
    match raw.trim() {
        "" => Line::Blank,
        "/quit" | "/exit" => Line::Quit,
        text => Line::Message(IncomingMessage::new(CHANNEL_NAME, user_id, text)),
    }
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        CHANNEL_NAME
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let lines = BufReader::new(tokio::io::stdin()).lines();
        eprint!("{PROMPT}");

        let stream = stream::unfold(
            (lines, self.user_id.clone()),
            |(mut lines, user_id)| async move {
                loop {
                    match lines.next_line().await {
                        Ok(Some(raw)) => match classify(&user_id, &raw) {
                            Line::Message(msg) => return Some((msg, (lines, user_id))),
                            Line::Blank => eprint!("{PROMPT}"),
                            Line::Quit => return None,
                        },
                        Ok(None) => return None,
                        Err(e) => {
                            tracing::error!("Error reading stdin: {e}");
                            return None;
                        }
                    }
                }
            },
        );

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        _msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        println!("\n{}\n", response.content);
        eprint!("{PROMPT}");
        Ok(())
    }

    async fn send_status(
        &self,
        status: StatusUpdate,
        _metadata: &serde_json::Value,
    ) -> Result<(), ChannelError> {
        match status {
            StatusUpdate::Typing => eprintln!("..."),
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
