use std::sync::Arc;

use poise::serenity_prelude as serenity;
use serenity::async_trait;
use serenity::{FullEvent, Http, Message};
use tracing::{debug, error, info};

use crate::commands::music::play::PlayInvocation;
use crate::commands::music::utils::music_manager::MusicManager;
use crate::{Data, Error};

/// Where replies and status messages for one command invocation go.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatChannel: Send + Sync {
    /// Reply to the triggering message.
    async fn reply(&self, content: &str) -> Result<(), Error>;
    /// Post a plain message to the triggering message's channel.
    async fn say(&self, content: &str) -> Result<(), Error>;
}

/// [`ChatChannel`] backed by the Discord HTTP API.
pub struct MessageChannel {
    http: Arc<Http>,
    message: Message,
}

impl MessageChannel {
    pub fn new(http: Arc<Http>, message: Message) -> Self {
        Self { http, message }
    }
}

#[async_trait]
impl ChatChannel for MessageChannel {
    async fn reply(&self, content: &str) -> Result<(), Error> {
        self.message.reply(self.http.clone(), content).await?;
        Ok(())
    }

    async fn say(&self, content: &str) -> Result<(), Error> {
        self.message.channel_id.say(self.http.clone(), content).await?;
        Ok(())
    }
}

/// Dispatches gateway events by kind.
pub async fn event_handler(
    ctx: &serenity::Context,
    event: &FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        FullEvent::Ready { data_about_bot, .. } => {
            info!("Logged in as {}", data_about_bot.user.tag());
        }
        FullEvent::Message { new_message } => {
            on_message(ctx, new_message, data).await;
        }
        _ => {}
    }
    Ok(())
}

async fn on_message(ctx: &serenity::Context, message: &Message, data: &Data) {
    if !data.play.is_trigger(&message.content, message.author.bot) {
        return;
    }

    let voice_channel = message.guild_id.and_then(|guild_id| {
        MusicManager::get_user_voice_channel(ctx, guild_id, message.author.id)
            .inspect_err(|e| debug!("No voice channel for {}: {}", message.author.id, e))
            .ok()
    });

    let invocation = PlayInvocation {
        content: message.content.clone(),
        author_is_bot: message.author.bot,
        guild_id: message.guild_id,
        voice_channel,
    };
    let chat: Arc<dyn ChatChannel> =
        Arc::new(MessageChannel::new(ctx.http.clone(), message.clone()));

    let outcome = data.play.handle(&invocation, chat).await;
    debug!("Message {} handled: {:?}", message.id, outcome);
}

pub async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {:?}", error);
        }
        poise::FrameworkError::EventHandler { error, event, .. } => {
            error!(
                "Error while handling event {}: {:?}",
                event.snake_case_name(),
                error
            );
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}
