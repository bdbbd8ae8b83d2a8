//! Recording fakes for the chat and voice seams.

use std::sync::Mutex;

use audioslave::Error;
use audioslave::commands::music::utils::event_handlers::{PlaybackStatus, StatusNotifier};
use audioslave::commands::music::utils::music_manager::{MusicError, MusicResult, VoiceBackend};
use audioslave::events::ChatChannel;
use poise::serenity_prelude::{ChannelId, GuildId};
use serenity::async_trait;
use songbird::input::Input;

/// A message the bot sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Reply(String),
    Say(String),
}

impl Sent {
    pub fn text(&self) -> &str {
        match self {
            Sent::Reply(text) | Sent::Say(text) => text,
        }
    }
}

/// Chat channel that remembers everything sent to it.
#[derive(Default)]
pub struct RecordingChat {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatChannel for RecordingChat {
    async fn reply(&self, content: &str) -> Result<(), Error> {
        self.sent.lock().unwrap().push(Sent::Reply(content.to_string()));
        Ok(())
    }

    async fn say(&self, content: &str) -> Result<(), Error> {
        self.sent.lock().unwrap().push(Sent::Say(content.to_string()));
        Ok(())
    }
}

/// A session the fake voice backend was asked to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedSession {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub song_id: String,
}

/// Voice backend that records sessions and optionally reports a status straight away.
#[derive(Default)]
pub struct RecordingVoice {
    sessions: Mutex<Vec<StartedSession>>,
    report: Option<PlaybackStatus>,
    fail: bool,
}

impl RecordingVoice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `status` to every notifier as soon as its session starts.
    pub fn reporting(status: PlaybackStatus) -> Self {
        Self {
            report: Some(status),
            ..Self::default()
        }
    }

    /// Report `status`, then fail the start as if a later setup step broke.
    pub fn failing_after(status: PlaybackStatus) -> Self {
        Self {
            report: Some(status),
            fail: true,
            ..Self::default()
        }
    }

    pub fn sessions(&self) -> Vec<StartedSession> {
        self.sessions.lock().unwrap().clone()
    }
}

#[async_trait]
impl VoiceBackend for RecordingVoice {
    async fn start_session(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        _input: Input,
        notifier: StatusNotifier,
    ) -> MusicResult<()> {
        self.sessions.lock().unwrap().push(StartedSession {
            guild_id,
            channel_id,
            song_id: notifier.song_id().to_string(),
        });

        if let Some(status) = self.report.clone() {
            notifier.notify(status).await;
        }
        if self.fail {
            return Err(MusicError::Playback("event subscription refused".to_string()));
        }
        Ok(())
    }
}
