//! Per-guild count of live playback sessions.

use dashmap::DashMap;
use poise::serenity_prelude::GuildId;
use tracing::debug;

use crate::config::ConcurrencyPolicy;

#[derive(Debug, Default)]
pub struct SessionRegistry {
    active: DashMap<GuildId, usize>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a session slot for `guild_id`.
    ///
    /// Under [`ConcurrencyPolicy::Reject`] this fails while another session is live.
    /// The check and the reservation happen under the same shard lock, so two
    /// concurrent callers cannot both succeed.
    pub fn try_begin(&self, guild_id: GuildId, policy: ConcurrencyPolicy) -> bool {
        let mut count = self.active.entry(guild_id).or_insert(0);
        if policy == ConcurrencyPolicy::Reject && *count > 0 {
            debug!("Guild {} already has {} live session(s)", guild_id, *count);
            return false;
        }
        *count += 1;
        true
    }

    /// Release a slot previously taken with [`SessionRegistry::try_begin`].
    pub fn end(&self, guild_id: GuildId) {
        let now_empty = match self.active.get_mut(&guild_id) {
            Some(mut count) => {
                *count = count.saturating_sub(1);
                *count == 0
            }
            None => false,
        };

        if now_empty {
            self.active.remove_if(&guild_id, |_, count| *count == 0);
        }
    }

    pub fn active(&self, guild_id: GuildId) -> usize {
        self.active.get(&guild_id).map(|count| *count).unwrap_or(0)
    }
}
