use std::sync::Arc;

use poise::serenity_prelude::{ChannelId, GuildId};
use reqwest::Client;
use tracing::{debug, error, info, warn};

use crate::commands::music::utils::{
    audio_sources::AudioDecoder,
    event_handlers::StatusNotifier,
    music_manager::{MusicResult, VoiceBackend},
    session_registry::SessionRegistry,
};
use crate::config::{BotConfig, ConcurrencyPolicy};
use crate::events::ChatChannel;
use crate::utils::song_lookup::SongLookup;

pub const JOIN_VOICE_MESSAGE: &str = "Join a voice channel first!";
pub const PLAY_FAILED_MESSAGE: &str = "Couldn’t play that song.";
pub const BUSY_MESSAGE: &str = "Something is already playing here.";

/// A chat message, reduced to what the play command looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayInvocation {
    pub content: String,
    pub author_is_bot: bool,
    pub guild_id: Option<GuildId>,
    /// The author's current voice channel in `guild_id`, if any.
    pub voice_channel: Option<ChannelId>,
}

/// Result of matching a message against the trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayCommand<'a> {
    NotACommand,
    MissingSongId,
    Play(&'a str),
}

/// Which branch an invocation ended in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    Ignored,
    UsageHint,
    NotInVoice,
    Busy,
    Failed(String),
    Started,
}

/// Match `content` against `trigger`.
///
/// Any message that merely starts with the trigger counts; the song id is the
/// second whitespace-separated token.
pub fn parse_play<'a>(content: &'a str, author_is_bot: bool, trigger: &str) -> PlayCommand<'a> {
    if author_is_bot || !content.starts_with(trigger) {
        return PlayCommand::NotACommand;
    }

    match content.split_whitespace().nth(1) {
        Some(song_id) => PlayCommand::Play(song_id),
        None => PlayCommand::MissingSongId,
    }
}

pub fn usage_message(trigger: &str) -> String {
    format!("Please provide a song ID, e.g. `{} 1`", trigger)
}

/// Runs `!play <songId>`: lookup, fetch, decode, join, play.
pub struct PlayHandler {
    trigger: String,
    policy: ConcurrencyPolicy,
    lookup: SongLookup,
    decoder: AudioDecoder,
    voice: Arc<dyn VoiceBackend>,
    sessions: Arc<SessionRegistry>,
}

impl PlayHandler {
    pub fn new(config: &BotConfig, voice: Arc<dyn VoiceBackend>) -> Self {
        Self {
            trigger: config.trigger.clone(),
            policy: config.concurrency,
            lookup: SongLookup::new(Client::new(), config.lookup_base_url.clone()),
            decoder: AudioDecoder::new(config.audio_mode, config.ffmpeg_path.clone()),
            voice,
            sessions: Arc::new(SessionRegistry::new()),
        }
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub fn is_trigger(&self, content: &str, author_is_bot: bool) -> bool {
        parse_play(content, author_is_bot, &self.trigger) != PlayCommand::NotACommand
    }

    pub async fn handle(
        &self,
        invocation: &PlayInvocation,
        chat: Arc<dyn ChatChannel>,
    ) -> PlayOutcome {
        let song_id = match parse_play(&invocation.content, invocation.author_is_bot, &self.trigger)
        {
            PlayCommand::NotACommand => return PlayOutcome::Ignored,
            PlayCommand::MissingSongId => {
                reply(chat.as_ref(), &usage_message(&self.trigger)).await;
                return PlayOutcome::UsageHint;
            }
            PlayCommand::Play(song_id) => song_id,
        };

        let (guild_id, channel_id) = match (invocation.guild_id, invocation.voice_channel) {
            (Some(guild_id), Some(channel_id)) => (guild_id, channel_id),
            _ => {
                reply(chat.as_ref(), JOIN_VOICE_MESSAGE).await;
                return PlayOutcome::NotInVoice;
            }
        };

        if !self.sessions.try_begin(guild_id, self.policy) {
            info!("Refusing song {} in busy guild {}", song_id, guild_id);
            reply(chat.as_ref(), BUSY_MESSAGE).await;
            return PlayOutcome::Busy;
        }

        info!(
            "Playing song {} in channel {} of guild {}",
            song_id, channel_id, guild_id
        );
        // The notifier owns the slot from here; release it only through the notifier.
        let notifier = StatusNotifier::new(chat.clone(), song_id, guild_id, self.sessions.clone());
        match self.play(song_id, guild_id, channel_id, notifier.clone()).await {
            Ok(()) => PlayOutcome::Started,
            Err(e) => {
                error!("Couldn't play song {}: {}", song_id, e);
                notifier.release();
                reply(chat.as_ref(), PLAY_FAILED_MESSAGE).await;
                PlayOutcome::Failed(e.to_string())
            }
        }
    }

    async fn play(
        &self,
        song_id: &str,
        guild_id: GuildId,
        channel_id: ChannelId,
        notifier: StatusNotifier,
    ) -> MusicResult<()> {
        let found = self.lookup.lookup(song_id).await?;
        let audio = self.lookup.fetch_audio(&found).await?;
        let input = self.decoder.to_input(audio).await?;
        debug!("Built {:?} input for song {}", self.decoder.mode(), song_id);

        self.voice
            .start_session(guild_id, channel_id, input, notifier)
            .await
    }
}

async fn reply(chat: &dyn ChatChannel, content: &str) {
    if let Err(e) = chat.reply(content).await {
        warn!("Failed to send reply: {}", e);
    }
}
