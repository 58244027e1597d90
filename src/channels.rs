//! Per-guild channel configuration.
//!
//! Each guild can designate three channels: a copy target for relayed
//! attachments, a chat-AI channel, and an image-generation channel. Entries
//! are created lazily on the first configuration command and live for the
//! lifetime of the process.

use dashmap::DashMap;

/// Channel assignments for a single guild
#[derive(Debug, Default, Clone, Copy)]
struct GuildChannels {
    copy: Option<u64>,
    ai: Option<u64>,
    img: Option<u64>,
}

/// Process-wide store mapping guild ids to their channel assignments
///
/// Channel ids are not validated here; a stale or wrong id simply fails at
/// send time on the Discord side.
pub struct ChannelStore {
    guilds: DashMap<u64, GuildChannels>,
}

impl ChannelStore {
    pub fn new() -> Self {
        ChannelStore {
            guilds: DashMap::new(),
        }
    }

    pub fn set_copy_channel(&self, guild_id: u64, channel_id: u64) {
        self.guilds.entry(guild_id).or_default().copy = Some(channel_id);
    }

    pub fn set_ai_channel(&self, guild_id: u64, channel_id: u64) {
        self.guilds.entry(guild_id).or_default().ai = Some(channel_id);
    }

    pub fn set_img_channel(&self, guild_id: u64, channel_id: u64) {
        self.guilds.entry(guild_id).or_default().img = Some(channel_id);
    }

    pub fn copy_channel(&self, guild_id: u64) -> Option<u64> {
        self.guilds.get(&guild_id).and_then(|g| g.copy)
    }

    pub fn ai_channel(&self, guild_id: u64) -> Option<u64> {
        self.guilds.get(&guild_id).and_then(|g| g.ai)
    }

    pub fn img_channel(&self, guild_id: u64) -> Option<u64> {
        self.guilds.get(&guild_id).and_then(|g| g.img)
    }
}

impl Default for ChannelStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_guild_has_no_channels() {
        let store = ChannelStore::new();
        assert_eq!(store.copy_channel(42), None);
        assert_eq!(store.ai_channel(42), None);
        assert_eq!(store.img_channel(42), None);
    }

    #[test]
    fn test_set_and_get_each_field() {
        let store = ChannelStore::new();
        store.set_copy_channel(42, 100);
        store.set_ai_channel(42, 200);
        store.set_img_channel(42, 300);

        assert_eq!(store.copy_channel(42), Some(100));
        assert_eq!(store.ai_channel(42), Some(200));
        assert_eq!(store.img_channel(42), Some(300));
    }

    #[test]
    fn test_fields_are_independent() {
        let store = ChannelStore::new();
        store.set_ai_channel(42, 200);

        assert_eq!(store.ai_channel(42), Some(200));
        assert_eq!(store.copy_channel(42), None);
        assert_eq!(store.img_channel(42), None);
    }

    #[test]
    fn test_overwrite_is_idempotent() {
        let store = ChannelStore::new();
        store.set_ai_channel(42, 200);
        store.set_ai_channel(42, 201);
        store.set_ai_channel(42, 201);

        assert_eq!(store.ai_channel(42), Some(201));
    }

    #[test]
    fn test_guilds_are_isolated() {
        let store = ChannelStore::new();
        store.set_copy_channel(1, 10);
        store.set_copy_channel(2, 20);

        assert_eq!(store.copy_channel(1), Some(10));
        assert_eq!(store.copy_channel(2), Some(20));
    }
}
