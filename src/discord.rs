// Discord gateway glue: feeds channel messages to the dispatcher and posts replies.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serenity::all::{
    Context, CreateAllowedMentions, CreateMessage, EventHandler, GatewayIntents, Message, Ready,
};
use serenity::async_trait;
use serenity::Client;
use tracing::{debug, error, info, warn};

use crate::commands::Dispatcher;
use crate::error::BootstrapError;
use crate::format::{self, DISCORD_MAX_MESSAGE_LENGTH};

/// Gateway intents the bot needs: guild and DM messages with their content.
pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
}

pub struct Handler {
    dispatcher: Arc<Dispatcher>,
}

impl Handler {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

/// Message timestamp as UTC, falling back to now if it is out of range.
fn message_time(msg: &Message) -> DateTime<Utc> {
    DateTime::from_timestamp(msg.timestamp.unix_timestamp(), 0).unwrap_or_else(Utc::now)
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        let Some(reply) = self.dispatcher.handle(&msg.content, message_time(&msg)).await else {
            return;
        };

        let chunks = format::split_message(&reply, DISCORD_MAX_MESSAGE_LENGTH);
        let sent = send_chunks(chunks, |chunk| {
            // Replies echo user input; never let it ping anyone.
            let message = CreateMessage::new()
                .content(chunk)
                .allowed_mentions(CreateAllowedMentions::new());
            msg.channel_id.send_message(&ctx.http, message)
        })
        .await;

        match sent {
            Ok(()) => debug!(channel = %msg.channel_id, author = %msg.author.name, "Reply sent"),
            Err(e) => error!(channel = %msg.channel_id, "Failed to send reply: {e}"),
        }
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            user = %ready.user.name,
            guilds = ready.guilds.len(),
            prefix = %self.dispatcher.prefix(),
            "Connected to Discord"
        );
        match ctx.http.get_guilds(None, None).await {
            Ok(guilds) => {
                let names: Vec<String> = guilds.into_iter().map(|g| g.name).collect();
                info!("Servers I am connected to:\n{}", guild_listing(&names));
            }
            Err(e) => warn!("Failed to list guilds: {e}"),
        }
    }
}

/// Send chunks in order, stopping at the first failure.
async fn send_chunks<F, Fut, T, E>(chunks: Vec<String>, mut send: F) -> Result<(), E>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    for chunk in chunks {
        send(chunk).await?;
    }
    Ok(())
}

/// Numbered guild list, one per line.
fn guild_listing(names: &[String]) -> String {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{}. {name}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Connect to the gateway and process events until the connection ends.
pub async fn run_bot(token: &str, dispatcher: Arc<Dispatcher>) -> Result<(), BootstrapError> {
    let mut client = Client::builder(token, intents())
        .event_handler(Handler::new(dispatcher))
        .await?;
    client.start().await?;
    Ok(())
}
