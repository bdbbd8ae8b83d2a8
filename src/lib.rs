//! A Discord bot that plays songs from a lookup service into voice channels.

use std::sync::Arc;

use ::serenity::all::ClientBuilder;
use poise::serenity_prelude as serenity;
use songbird::{SerenityInit, Songbird};
use tracing::info;

pub mod commands;
pub mod config;
pub mod events;
pub mod utils;

use commands::music::play::PlayHandler;
use commands::music::utils::music_manager::{MusicManager, VoiceBackend};
use config::BotConfig;

pub type Error = Box<dyn std::error::Error + Send + Sync>;

// User data, which is stored and accessible in all event handlers
pub struct Data {
    pub play: PlayHandler,
}

/// Gateway intents needed to read `!play` messages and see voice states.
pub fn intents() -> serenity::GatewayIntents {
    serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_VOICE_STATES
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT
}

/// The running bot: one serenity client with songbird attached.
pub struct Bot {
    client: serenity::Client,
}

impl Bot {
    pub async fn new(config: BotConfig) -> Result<Self, Error> {
        info!("Starting with {:?}", config);

        let songbird = Songbird::serenity();
        let voice: Arc<dyn VoiceBackend> = Arc::new(MusicManager::new(songbird.clone()));
        let data = Data {
            play: PlayHandler::new(&config, voice),
        };

        let framework = poise::Framework::builder()
            .options(poise::FrameworkOptions {
                event_handler: |ctx, event, framework, data| {
                    Box::pin(events::event_handler(ctx, event, framework, data))
                },
                on_error: |error| Box::pin(events::on_error(error)),
                ..Default::default()
            })
            .setup(move |_ctx, ready, _framework| {
                Box::pin(async move {
                    info!("{} is ready", ready.user.name);
                    Ok(data)
                })
            })
            .build();

        let client = ClientBuilder::new(&config.token, intents())
            .framework(framework)
            .register_songbird_with(songbird)
            .await?;

        Ok(Self { client })
    }

    /// Run until the gateway connection ends or Ctrl-C is received.
    pub async fn run(mut self) -> Result<(), Error> {
        let shard_manager = self.client.shard_manager.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl-C, shutting down.");
                shard_manager.shutdown_all().await;
            }
        });

        self.client.start().await.map_err(Into::into)
    }
}
