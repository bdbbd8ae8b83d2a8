use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use poise::serenity_prelude as serenity;
use serenity::GuildId;
use serenity::async_trait;
use songbird::tracks::PlayMode;
use tracing::{error, info, warn};

use super::session_registry::SessionRegistry;
use crate::events::ChatChannel;

pub const PLAYBACK_ERROR_MESSAGE: &str = "Error while playing audio.";

/// Status transitions of a single playback, as observed from the voice driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackStatus {
    Playing,
    Errored(String),
    Ended,
}

impl PlaybackStatus {
    fn from_play_mode(mode: &PlayMode) -> Option<Self> {
        match mode {
            PlayMode::Play => Some(Self::Playing),
            PlayMode::Errored(e) => Some(Self::Errored(format!("{:?}", e))),
            PlayMode::End | PlayMode::Stop => Some(Self::Ended),
            _ => None,
        }
    }
}

/// Announces "now playing" and playback errors for one song, and releases the
/// guild's session slot once the track is over.
#[derive(Clone)]
pub struct StatusNotifier {
    chat: Arc<dyn ChatChannel>,
    song_id: String,
    guild_id: GuildId,
    sessions: Arc<SessionRegistry>,
    released: Arc<AtomicBool>,
}

impl StatusNotifier {
    pub fn new(
        chat: Arc<dyn ChatChannel>,
        song_id: impl Into<String>,
        guild_id: GuildId,
        sessions: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            chat,
            song_id: song_id.into(),
            guild_id,
            sessions,
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn song_id(&self) -> &str {
        &self.song_id
    }

    pub async fn notify(&self, status: PlaybackStatus) {
        match status {
            PlaybackStatus::Playing => {
                info!("Now playing song {} in guild {}", self.song_id, self.guild_id);
                self.say(&now_playing_message(&self.song_id)).await;
            }
            PlaybackStatus::Errored(reason) => {
                error!(
                    "Playback of song {} failed in guild {}: {}",
                    self.song_id, self.guild_id, reason
                );
                self.release();
                self.say(PLAYBACK_ERROR_MESSAGE).await;
            }
            PlaybackStatus::Ended => {
                info!("Song {} ended in guild {}", self.song_id, self.guild_id);
                self.release();
            }
        }
    }

    /// Give the guild's session slot back, at most once per notifier.
    pub(crate) fn release(&self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            self.sessions.end(self.guild_id);
        }
    }

    async fn say(&self, content: &str) {
        if let Err(e) = self.chat.say(content).await {
            warn!("Failed to send status message: {}", e);
        }
    }
}

pub fn now_playing_message(song_id: &str) -> String {
    format!("🎶 Now playing: Song {}", song_id)
}

#[async_trait]
impl songbird::EventHandler for StatusNotifier {
    async fn act(&self, ctx: &songbird::EventContext<'_>) -> Option<songbird::Event> {
        if let songbird::EventContext::Track(tracks) = ctx {
            for (state, _handle) in *tracks {
                if let Some(status) = PlaybackStatus::from_play_mode(&state.playing) {
                    self.notify(status).await;
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConcurrencyPolicy;
    use crate::events::MockChatChannel;
    use pretty_assertions::assert_eq;

    fn notifier(chat: MockChatChannel, sessions: Arc<SessionRegistry>) -> StatusNotifier {
        StatusNotifier::new(Arc::new(chat), "1", GuildId::new(5), sessions)
    }

    #[tokio::test]
    async fn playing_posts_the_song_id() {
        let mut chat = MockChatChannel::new();
        chat.expect_say()
            .withf(|content| content.contains("Song 1"))
            .times(1)
            .returning(|_| Ok(()));
        chat.expect_reply().never();

        notifier(chat, Arc::new(SessionRegistry::new()))
            .notify(PlaybackStatus::Playing)
            .await;
    }

    #[tokio::test]
    async fn error_posts_a_generic_message_and_releases_the_slot() {
        let sessions = Arc::new(SessionRegistry::new());
        assert!(sessions.try_begin(GuildId::new(5), ConcurrencyPolicy::Reject));

        let mut chat = MockChatChannel::new();
        chat.expect_say()
            .withf(|content| content == PLAYBACK_ERROR_MESSAGE)
            .times(1)
            .returning(|_| Ok(()));

        notifier(chat, sessions.clone())
            .notify(PlaybackStatus::Errored("decoder exploded".into()))
            .await;

        assert_eq!(sessions.active(GuildId::new(5)), 0);
    }

    #[tokio::test]
    async fn error_then_end_releases_only_once() {
        let sessions = Arc::new(SessionRegistry::new());
        let guild = GuildId::new(5);
        assert!(sessions.try_begin(guild, ConcurrencyPolicy::Allow));
        assert!(sessions.try_begin(guild, ConcurrencyPolicy::Allow));

        let mut chat = MockChatChannel::new();
        chat.expect_say().times(1).returning(|_| Ok(()));

        let notifier = notifier(chat, sessions.clone());
        notifier.notify(PlaybackStatus::Errored("x".into())).await;
        notifier.notify(PlaybackStatus::Ended).await;

        assert_eq!(sessions.active(guild), 1);
    }

    #[tokio::test]
    async fn failed_status_message_is_swallowed() {
        let mut chat = MockChatChannel::new();
        chat.expect_say()
            .times(1)
            .returning(|_| Err("missing permissions".into()));

        notifier(chat, Arc::new(SessionRegistry::new()))
            .notify(PlaybackStatus::Playing)
            .await;
    }

    #[test]
    fn play_modes_map_to_statuses() {
        assert_eq!(
            PlaybackStatus::from_play_mode(&PlayMode::Play),
            Some(PlaybackStatus::Playing)
        );
        assert_eq!(
            PlaybackStatus::from_play_mode(&PlayMode::End),
            Some(PlaybackStatus::Ended)
        );
        assert_eq!(PlaybackStatus::from_play_mode(&PlayMode::Pause), None);
    }
}
