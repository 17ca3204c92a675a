use hashbrown::hash_map::DefaultHashBuilder;
use ripcord_model::{Activity, Channel, Guild, GuildMember, Message, Snowflake, User, VoiceState};
use ripcord_util::IntHasher;

use crate::Record;

impl Record for User {
    type Key = Snowflake;
    type Hasher = IntHasher;

    fn key(&self) -> Self::Key {
        self.id
    }

    fn with_key(key: Self::Key) -> Self {
        Self {
            id: key,
            ..Default::default()
        }
    }
}

impl Record for Channel {
    type Key = Snowflake;
    type Hasher = IntHasher;

    fn key(&self) -> Self::Key {
        self.id
    }

    fn with_key(key: Self::Key) -> Self {
        Self {
            id: key,
            ..Default::default()
        }
    }
}

impl Record for Guild {
    type Key = Snowflake;
    type Hasher = IntHasher;

    fn key(&self) -> Self::Key {
        self.id
    }

    fn with_key(key: Self::Key) -> Self {
        Self {
            id: key,
            ..Default::default()
        }
    }
}

impl Record for Message {
    type Key = Snowflake;
    type Hasher = IntHasher;

    fn key(&self) -> Self::Key {
        self.id
    }

    fn with_key(key: Self::Key) -> Self {
        Self {
            id: key,
            ..Default::default()
        }
    }
}

/// Per-guild member state, keyed by `(guild, user)`.
///
/// Mixes the member payload with the presence fields that arrive separately.
#[derive(Debug, Clone, Default)]
pub struct MemberEntry {
    pub guild_id: Snowflake,
    pub user_id: Snowflake,
    pub joined_at: String,
    pub nick: Option<String>,
    pub roles: Vec<Snowflake>,
    pub status: String,
    pub game: Option<Activity>,
    pub deaf: bool,
    pub mute: bool,
}

impl MemberEntry {
    pub fn new(guild_id: Snowflake, member: &GuildMember) -> Self {
        Self {
            guild_id,
            user_id: member.user.id,
            joined_at: member.joined_at.clone(),
            nick: member.nick.clone(),
            roles: member.roles.clone(),
            status: String::new(),
            game: None,
            deaf: member.deaf,
            mute: member.mute,
        }
    }
}

impl Record for MemberEntry {
    type Key = (Snowflake, Snowflake);
    type Hasher = DefaultHashBuilder;

    fn key(&self) -> Self::Key {
        (self.guild_id, self.user_id)
    }

    fn with_key((guild_id, user_id): Self::Key) -> Self {
        Self {
            guild_id,
            user_id,
            ..Default::default()
        }
    }
}

/// Last observed typing timestamp, keyed by `(channel, user)`.
#[derive(Debug, Clone, Default)]
pub struct TypingEntry {
    pub channel_id: Snowflake,
    pub user_id: Snowflake,
    pub last_typing: u64,
}

impl Record for TypingEntry {
    type Key = (Snowflake, Snowflake);
    type Hasher = DefaultHashBuilder;

    fn key(&self) -> Self::Key {
        (self.channel_id, self.user_id)
    }

    fn with_key((channel_id, user_id): Self::Key) -> Self {
        Self {
            channel_id,
            user_id,
            last_typing: 0,
        }
    }
}

/// A voice state keyed by its `(guild, channel, user)` projection.
#[derive(Debug, Clone, Default)]
pub struct VoiceEntry {
    pub state: VoiceState,
}

impl Record for VoiceEntry {
    type Key = (Snowflake, Snowflake, Snowflake);
    type Hasher = DefaultHashBuilder;

    fn key(&self) -> Self::Key {
        self.state.cache_key()
    }

    fn with_key((guild_id, channel_id, user_id): Self::Key) -> Self {
        Self {
            state: VoiceState {
                guild_id: guild_id.is_some().then_some(guild_id),
                channel_id: channel_id.is_some().then_some(channel_id),
                user_id,
                ..Default::default()
            },
        }
    }
}
