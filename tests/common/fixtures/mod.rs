//! Test fixtures: ids, message builders and canned lookup/storage servers.

use audioslave::commands::music::play::PlayInvocation;
use audioslave::config::BotConfig;
use poise::serenity_prelude::{ChannelId, GuildId};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SAMPLE_GUILD_ID: u64 = 123456789;
pub const SAMPLE_VOICE_CHANNEL_ID: u64 = 987654321;

/// A few bytes with an MP3 frame sync; the fakes never decode them.
pub const SAMPLE_AUDIO: &[u8] = &[0xFF, 0xFB, 0x90, 0x64, 0x00, 0x00];

pub fn config_for(server: &MockServer) -> BotConfig {
    BotConfig::new("test-token", Url::parse(&server.uri()).unwrap())
}

/// `content` sent by a member sitting in the sample voice channel.
pub fn message_in_voice(content: &str) -> PlayInvocation {
    PlayInvocation {
        content: content.to_string(),
        author_is_bot: false,
        guild_id: Some(GuildId::new(SAMPLE_GUILD_ID)),
        voice_channel: Some(ChannelId::new(SAMPLE_VOICE_CHANNEL_ID)),
    }
}

/// `content` sent by a member who is not in any voice channel.
pub fn message_outside_voice(content: &str) -> PlayInvocation {
    PlayInvocation {
        voice_channel: None,
        ..message_in_voice(content)
    }
}

/// Serve `song_id` from the lookup API, pointing at `/storage/{song_id}.mp3` on the same server.
pub async fn mount_song(server: &MockServer, song_id: &str) {
    let audio_path = format!("/storage/{}.mp3", song_id);

    Mock::given(method("GET"))
        .and(path(format!("/music/{}", song_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "url": format!("{}{}", server.uri(), audio_path),
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(audio_path))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "audio/mpeg")
                .set_body_bytes(SAMPLE_AUDIO),
        )
        .mount(server)
        .await;
}

/// Make the lookup API answer `status` for `song_id`.
pub async fn mount_lookup_status(server: &MockServer, song_id: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/music/{}", song_id)))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}
