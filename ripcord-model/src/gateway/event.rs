use serde::Deserialize;
use serde_json::Value;

use crate::{
    Channel, Emoji, Guild, GuildMember, Message, Presence, Role, Snowflake, User, VoiceState,
};

/// A named dispatch, decoded from the `t` and `d` fields of an opcode 0
/// frame.
///
/// Kinds the library does not model are preserved as [`Event::Unknown`] so
/// callers can log them.
#[derive(Debug)]
pub enum Event {
    Ready(Box<Ready>),
    Resumed,
    ChannelCreate(Channel),
    ChannelUpdate(Channel),
    ChannelDelete(Channel),
    GuildCreate(Box<Guild>),
    GuildUpdate(Box<Guild>),
    GuildDelete(GuildUnavailable),
    GuildEmojisUpdate(GuildEmojisUpdate),
    MemberAdd(Box<MemberAdd>),
    MemberRemove(MemberRemove),
    MemberUpdate(MemberUpdate),
    MemberChunk(MemberChunk),
    RoleCreate(GuildRoleChange),
    RoleUpdate(GuildRoleChange),
    RoleDelete(GuildRoleDelete),
    MessageCreate(Box<Message>),
    MessageUpdate(Box<Message>),
    MessageDelete(MessageDelete),
    MessageDeleteBulk(MessageDeleteBulk),
    ReactionAdd(ReactionChange),
    ReactionRemove(ReactionChange),
    ReactionRemoveAll(ReactionRemoveAll),
    PresenceUpdate(Box<Presence>),
    TypingStart(TypingStart),
    UserUpdate(User),
    VoiceStateUpdate(VoiceState),
    Unknown(Box<str>),
}

impl Event {
    pub fn from_parts(kind: &str, d: Value) -> Result<Self, serde_json::Error> {
        let event = match kind {
            "READY" => Self::Ready(serde_json::from_value(d)?),
            "RESUMED" => Self::Resumed,
            "CHANNEL_CREATE" => Self::ChannelCreate(serde_json::from_value(d)?),
            "CHANNEL_UPDATE" => Self::ChannelUpdate(serde_json::from_value(d)?),
            "CHANNEL_DELETE" => Self::ChannelDelete(serde_json::from_value(d)?),
            "GUILD_CREATE" => Self::GuildCreate(serde_json::from_value(d)?),
            "GUILD_UPDATE" => Self::GuildUpdate(serde_json::from_value(d)?),
            "GUILD_DELETE" => Self::GuildDelete(serde_json::from_value(d)?),
            "GUILD_EMOJIS_UPDATE" => Self::GuildEmojisUpdate(serde_json::from_value(d)?),
            "GUILD_MEMBER_ADD" => Self::MemberAdd(serde_json::from_value(d)?),
            "GUILD_MEMBER_REMOVE" => Self::MemberRemove(serde_json::from_value(d)?),
            "GUILD_MEMBER_UPDATE" => Self::MemberUpdate(serde_json::from_value(d)?),
            "GUILD_MEMBERS_CHUNK" => Self::MemberChunk(serde_json::from_value(d)?),
            "GUILD_ROLE_CREATE" => Self::RoleCreate(serde_json::from_value(d)?),
            "GUILD_ROLE_UPDATE" => Self::RoleUpdate(serde_json::from_value(d)?),
            "GUILD_ROLE_DELETE" => Self::RoleDelete(serde_json::from_value(d)?),
            "MESSAGE_CREATE" => Self::MessageCreate(serde_json::from_value(d)?),
            "MESSAGE_UPDATE" => Self::MessageUpdate(serde_json::from_value(d)?),
            "MESSAGE_DELETE" => Self::MessageDelete(serde_json::from_value(d)?),
            "MESSAGE_DELETE_BULK" => Self::MessageDeleteBulk(serde_json::from_value(d)?),
            "MESSAGE_REACTION_ADD" => Self::ReactionAdd(serde_json::from_value(d)?),
            "MESSAGE_REACTION_REMOVE" => Self::ReactionRemove(serde_json::from_value(d)?),
            "MESSAGE_REACTION_REMOVE_ALL" => Self::ReactionRemoveAll(serde_json::from_value(d)?),
            "PRESENCE_UPDATE" => Self::PresenceUpdate(serde_json::from_value(d)?),
            "TYPING_START" => Self::TypingStart(serde_json::from_value(d)?),
            "USER_UPDATE" => Self::UserUpdate(serde_json::from_value(d)?),
            "VOICE_STATE_UPDATE" => Self::VoiceStateUpdate(serde_json::from_value(d)?),
            _ => Self::Unknown(kind.into()),
        };

        Ok(event)
    }

    /// The dispatch name, for logging.
    pub fn kind(&self) -> &str {
        match self {
            Self::Ready(_) => "READY",
            Self::Resumed => "RESUMED",
            Self::ChannelCreate(_) => "CHANNEL_CREATE",
            Self::ChannelUpdate(_) => "CHANNEL_UPDATE",
            Self::ChannelDelete(_) => "CHANNEL_DELETE",
            Self::GuildCreate(_) => "GUILD_CREATE",
            Self::GuildUpdate(_) => "GUILD_UPDATE",
            Self::GuildDelete(_) => "GUILD_DELETE",
            Self::GuildEmojisUpdate(_) => "GUILD_EMOJIS_UPDATE",
            Self::MemberAdd(_) => "GUILD_MEMBER_ADD",
            Self::MemberRemove(_) => "GUILD_MEMBER_REMOVE",
            Self::MemberUpdate(_) => "GUILD_MEMBER_UPDATE",
            Self::MemberChunk(_) => "GUILD_MEMBERS_CHUNK",
            Self::RoleCreate(_) => "GUILD_ROLE_CREATE",
            Self::RoleUpdate(_) => "GUILD_ROLE_UPDATE",
            Self::RoleDelete(_) => "GUILD_ROLE_DELETE",
            Self::MessageCreate(_) => "MESSAGE_CREATE",
            Self::MessageUpdate(_) => "MESSAGE_UPDATE",
            Self::MessageDelete(_) => "MESSAGE_DELETE",
            Self::MessageDeleteBulk(_) => "MESSAGE_DELETE_BULK",
            Self::ReactionAdd(_) => "MESSAGE_REACTION_ADD",
            Self::ReactionRemove(_) => "MESSAGE_REACTION_REMOVE",
            Self::ReactionRemoveAll(_) => "MESSAGE_REACTION_REMOVE_ALL",
            Self::PresenceUpdate(_) => "PRESENCE_UPDATE",
            Self::TypingStart(_) => "TYPING_START",
            Self::UserUpdate(_) => "USER_UPDATE",
            Self::VoiceStateUpdate(_) => "VOICE_STATE_UPDATE",
            Self::Unknown(kind) => kind,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Ready {
    pub v: u8,
    pub user: User,
    pub private_channels: Vec<Channel>,
    pub guilds: Vec<Guild>,
    pub session_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GuildUnavailable {
    pub id: Snowflake,
    pub unavailable: bool,
}

#[derive(Debug, Deserialize)]
pub struct GuildEmojisUpdate {
    pub guild_id: Snowflake,
    #[serde(default)]
    pub emojis: Vec<Emoji>,
}

#[derive(Debug, Deserialize)]
pub struct MemberAdd {
    pub guild_id: Snowflake,
    #[serde(flatten)]
    pub member: GuildMember,
}

#[derive(Debug, Deserialize)]
pub struct MemberRemove {
    pub guild_id: Snowflake,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct MemberUpdate {
    pub guild_id: Snowflake,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
    pub user: User,
    #[serde(default)]
    pub nick: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MemberChunk {
    pub guild_id: Snowflake,
    #[serde(default)]
    pub members: Vec<GuildMember>,
}

#[derive(Debug, Deserialize)]
pub struct GuildRoleChange {
    pub guild_id: Snowflake,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct GuildRoleDelete {
    pub guild_id: Snowflake,
    pub role_id: Snowflake,
}

#[derive(Debug, Deserialize)]
pub struct MessageDelete {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

#[derive(Debug, Deserialize)]
pub struct MessageDeleteBulk {
    pub ids: Vec<Snowflake>,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

#[derive(Debug, Deserialize)]
pub struct ReactionChange {
    pub user_id: Snowflake,
    pub channel_id: Snowflake,
    pub message_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub emoji: Emoji,
}

#[derive(Debug, Deserialize)]
pub struct ReactionRemoveAll {
    pub channel_id: Snowflake,
    pub message_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

#[derive(Debug, Deserialize)]
pub struct TypingStart {
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub user_id: Snowflake,
    pub timestamp: u64,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::Event;

    #[test]
    fn dispatch_by_kind() {
        let d = json!({
            "id": "3",
            "channel_id": "7",
            "content": "hello",
            "author": { "id": "11", "username": "someone" },
        });

        match Event::from_parts("MESSAGE_CREATE", d).unwrap() {
            Event::MessageCreate(msg) => {
                assert_eq!(msg.id.get(), 3);
                assert_eq!(msg.channel_id.get(), 7);
                assert_eq!(msg.author.username, "someone");
                assert!(msg.reactions.is_empty());
            }
            event => panic!("wrong event: {event:?}"),
        }
    }

    #[test]
    fn unknown_kind_is_preserved() {
        let event = Event::from_parts("WEBHOOKS_UPDATE", serde_json::Value::Null).unwrap();
        assert!(matches!(event, Event::Unknown(ref kind) if &**kind == "WEBHOOKS_UPDATE"));
        assert_eq!(event.kind(), "WEBHOOKS_UPDATE");
    }

    #[test]
    fn member_add_flattens_member() {
        let d = json!({
            "guild_id": "5",
            "user": { "id": "9", "username": "m" },
            "roles": ["1", "2"],
            "joined_at": "2019-01-01T00:00:00Z",
        });

        match Event::from_parts("GUILD_MEMBER_ADD", d).unwrap() {
            Event::MemberAdd(add) => {
                assert_eq!(add.guild_id.get(), 5);
                assert_eq!(add.member.user.id.get(), 9);
                assert_eq!(add.member.roles.len(), 2);
            }
            event => panic!("wrong event: {event:?}"),
        }
    }
}
