use std::sync::Arc;

use reqwest::StatusCode;
use serenity::async_trait;
use serenity::client::Context;
use serenity::model::id::{ChannelId, GuildId, UserId};
use serenity::prelude::Mutex as SerenityMutex;
use songbird::input::Input;
use songbird::{Call, Event, Songbird, TrackEvent};
use thiserror::Error;
use tracing::{debug, info};

use super::event_handlers::StatusNotifier;

/// Errors that can occur during music operations
#[derive(Error, Debug)]
pub enum MusicError {
    #[error("Not in a guild")]
    NotInGuild,

    #[error("User is not in a voice channel")]
    UserNotInVoiceChannel,

    #[error("Song {song_id} not found (lookup returned {status})")]
    SongNotFound { song_id: String, status: StatusCode },

    #[error("Pull from storage failed with status {0}")]
    StorageFetch(StatusCode),

    #[error("Storage returned an empty audio body")]
    EmptyAudio,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unable to parse lookup response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Lookup returned an invalid audio URL: {0}")]
    InvalidAudioUrl(#[from] url::ParseError),

    #[error("Lookup base URL cannot carry a path: {0}")]
    InvalidLookupUrl(String),

    #[error("Audio decoding failed: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to join voice channel: {0}")]
    JoinError(String),

    #[error("Playback control failed: {0}")]
    Playback(String),
}

/// Result type for music operations
pub type MusicResult<T> = Result<T, MusicError>;

/// The voice side of a playback: joining a channel and playing an input into it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VoiceBackend: Send + Sync {
    /// Join `channel_id`, start playing `input` and report status changes to `notifier`.
    async fn start_session(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        input: Input,
        notifier: StatusNotifier,
    ) -> MusicResult<()>;
}

/// Manages the Songbird voice connections
pub struct MusicManager {
    songbird: Arc<Songbird>,
}

impl MusicManager {
    pub fn new(songbird: Arc<Songbird>) -> Self {
        Self { songbird }
    }

    /// Join a voice channel with self-deafen and self-mute both off
    pub async fn join_channel(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> MusicResult<Arc<SerenityMutex<Call>>> {
        let call = self
            .songbird
            .join(guild_id, channel_id)
            .await
            .map_err(|e| MusicError::JoinError(e.to_string()))?;

        {
            let mut handler = call.lock().await;
            handler
                .deafen(false)
                .await
                .map_err(|e| MusicError::JoinError(e.to_string()))?;
            handler
                .mute(false)
                .await
                .map_err(|e| MusicError::JoinError(e.to_string()))?;
        }

        Ok(call)
    }

    /// Get the voice channel ID that the user is currently in
    pub fn get_user_voice_channel(
        ctx: &Context,
        guild_id: GuildId,
        user_id: UserId,
    ) -> MusicResult<ChannelId> {
        // Get the guild
        let guild = ctx.cache.guild(guild_id).ok_or(MusicError::NotInGuild)?;

        // Get the voice state of the user
        let voice_state = guild
            .voice_states
            .get(&user_id)
            .ok_or(MusicError::UserNotInVoiceChannel)?;

        voice_state
            .channel_id
            .ok_or(MusicError::UserNotInVoiceChannel)
    }
}

#[async_trait]
impl VoiceBackend for MusicManager {
    async fn start_session(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        input: Input,
        notifier: StatusNotifier,
    ) -> MusicResult<()> {
        let call = self.join_channel(guild_id, channel_id).await?;
        info!("Joined voice channel {} in guild {}", channel_id, guild_id);

        let mut handler = call.lock().await;
        let track_handle = handler.play_input(input);
        debug!("Track {} started in guild {}", track_handle.uuid(), guild_id);

        for event in [TrackEvent::Playable, TrackEvent::Error, TrackEvent::End] {
            track_handle
                .add_event(Event::Track(event), notifier.clone())
                .map_err(|e| MusicError::Playback(e.to_string()))?;
        }

        Ok(())
    }
}
