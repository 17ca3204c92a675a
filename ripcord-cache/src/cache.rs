use parking_lot::Mutex;
use ripcord_model::{
    gateway::{Event, Ready},
    Reaction, Snowflake, User,
};

use crate::{
    entry::{MemberEntry, TypingEntry, VoiceEntry},
    store::Store,
    CacheError,
};

/// Default bound of the message store, standing in for the original soft
/// memory ceiling.
pub const DEFAULT_MESSAGE_LIMIT: usize = 16_384;

/// What READY reported about this session.
#[derive(Debug, Clone, Default)]
pub struct ReadySnapshot {
    pub version: u8,
    pub user: User,
    pub session_id: Box<str>,
    pub guild_ids: Vec<Snowflake>,
    pub private_channel_ids: Vec<Snowflake>,
}

#[derive(Debug, Copy, Clone, Default)]
pub struct CacheStats {
    pub users: usize,
    pub channels: usize,
    pub guilds: usize,
    pub messages: usize,
    pub members: usize,
    pub voice_states: usize,
}

/// The in-memory entity stores, fed by gateway dispatches and read by
/// handlers and commands.
pub struct Cache {
    pub users: Store<User>,
    pub channels: Store<ripcord_model::Channel>,
    pub guilds: Store<ripcord_model::Guild>,
    pub messages: Store<ripcord_model::Message>,
    pub members: Store<MemberEntry>,
    pub typing: Store<TypingEntry>,
    pub voice_states: Store<VoiceEntry>,
    ready: Mutex<Option<ReadySnapshot>>,
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache {
    pub fn new() -> Self {
        Self::with_message_limit(DEFAULT_MESSAGE_LIMIT)
    }

    pub fn with_message_limit(limit: usize) -> Self {
        Self {
            users: Store::new("users"),
            channels: Store::new("channels"),
            guilds: Store::new("guilds"),
            messages: Store::bounded("messages", limit),
            members: Store::new("members"),
            typing: Store::new("typing"),
            voice_states: Store::new("voice_states"),
            ready: Mutex::new(None),
        }
    }

    /// The READY snapshot, if a session has been established.
    pub fn ready(&self) -> Option<ReadySnapshot> {
        self.ready.lock().clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.ready.lock().as_ref().map(|ready| ready.user.clone())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            users: self.users.len(),
            channels: self.channels.len(),
            guilds: self.guilds.len(),
            messages: self.messages.len(),
            members: self.members.len(),
            voice_states: self.voice_states.len(),
        }
    }

    /// Applies a dispatch to the stores.
    ///
    /// Runs in the receive path before any user handler sees the event, so
    /// handlers always observe the post-event cache.
    pub fn update(&self, event: &Event) {
        match event {
            Event::Ready(ready) => self.apply_ready(ready),
            Event::Resumed => {}
            Event::ChannelCreate(channel) => {
                if self.channels.put(channel.clone()).is_err() {
                    debug!(id = %channel.id, "channel already cached, patching");
                    let _ = self.channels.patch(channel.clone());
                }
            }
            Event::ChannelUpdate(channel) => {
                if self.channels.patch(channel.clone()).is_err() {
                    debug!(id = %channel.id, "channel update for unknown channel");
                }
            }
            Event::ChannelDelete(channel) => {
                if !self.channels.remove(channel.id) {
                    debug!(id = %channel.id, "channel delete for unknown channel");
                }
            }
            Event::GuildCreate(guild) => self.apply_guild_create(guild),
            Event::GuildUpdate(guild) => {
                if self.guilds.patch((**guild).clone()).is_err() {
                    debug!(id = %guild.id, "guild update for unknown guild");
                }
            }
            Event::GuildDelete(del) => {
                let marked = self
                    .guilds
                    .update(del.id, |guild| guild.unavailable = true)
                    .is_ok();

                if !marked {
                    debug!(id = %del.id, "guild delete for unknown guild");
                }
            }
            Event::GuildEmojisUpdate(update) => {
                let _ = self.guilds.update(update.guild_id, |guild| {
                    guild.emojis = update.emojis.clone();
                });
            }
            Event::MemberAdd(add) => self.apply_member_add(add.guild_id, &add.member),
            Event::MemberRemove(remove) => {
                if !self.members.remove((remove.guild_id, remove.user.id)) {
                    debug!(
                        guild = %remove.guild_id,
                        user = %remove.user.id,
                        "member remove for unknown member",
                    );
                }
            }
            Event::MemberUpdate(update) => {
                let _ = self
                    .members
                    .update((update.guild_id, update.user.id), |entry| {
                        entry.roles = update.roles.clone();
                        entry.nick = update.nick.clone();
                    });
            }
            Event::MemberChunk(chunk) => {
                for member in &chunk.members {
                    self.apply_member_add(chunk.guild_id, member);
                }
            }
            Event::RoleCreate(change) => {
                let _ = self.guilds.update(change.guild_id, |guild| {
                    guild.roles.push(change.role.clone());
                });
            }
            Event::RoleUpdate(change) => {
                let _ = self.guilds.update(change.guild_id, |guild| {
                    match guild.roles.iter_mut().find(|role| role.id == change.role.id) {
                        Some(role) => *role = change.role.clone(),
                        None => guild.roles.push(change.role.clone()),
                    }
                });
            }
            Event::RoleDelete(del) => {
                let _ = self.guilds.update(del.guild_id, |guild| {
                    guild.roles.retain(|role| role.id != del.role_id);
                });
            }
            Event::MessageCreate(message) => {
                if self.messages.put((**message).clone()).is_err() {
                    warn!(id = %message.id, "message already cached");
                }
            }
            Event::MessageUpdate(message) => {
                if self.messages.patch((**message).clone()).is_err() {
                    debug!(id = %message.id, "message update for uncached message");
                }
            }
            Event::MessageDelete(del) => {
                if !self.messages.remove(del.id) {
                    debug!(id = %del.id, "message delete for uncached message");
                }
            }
            Event::MessageDeleteBulk(del) => {
                let missing = self.messages.remove_all(&del.ids);

                if !missing.is_empty() {
                    debug!(
                        total = del.ids.len(),
                        missing = missing.len(),
                        "bulk delete included uncached messages",
                    );
                }
            }
            Event::ReactionAdd(change) => {
                let result = self.messages.update(change.message_id, |message| {
                    match message
                        .reactions
                        .iter_mut()
                        .find(|reaction| reaction.emoji.same_as(&change.emoji))
                    {
                        Some(reaction) => {
                            reaction.count += 1;
                            reaction.users.push(change.user_id);
                        }
                        None => message.reactions.push(Reaction {
                            count: 1,
                            me: false,
                            emoji: change.emoji.clone(),
                            users: vec![change.user_id],
                        }),
                    }
                });

                if result == Err(CacheError::NotFound) {
                    debug!(id = %change.message_id, "reaction add for uncached message");
                }
            }
            Event::ReactionRemove(change) => {
                let _ = self.messages.update(change.message_id, |message| {
                    if let Some(reaction) = message
                        .reactions
                        .iter_mut()
                        .find(|reaction| reaction.emoji.same_as(&change.emoji))
                    {
                        reaction.count = reaction.count.saturating_sub(1);
                        reaction.users.retain(|&user| user != change.user_id);
                    }
                });
            }
            Event::ReactionRemoveAll(change) => {
                let _ = self
                    .messages
                    .update(change.message_id, |message| message.reactions.clear());
            }
            Event::PresenceUpdate(presence) => {
                let Some(guild_id) = presence.guild_id else {
                    trace!(user = %presence.user.id, "presence update without guild");
                    return;
                };

                self.members.upsert((guild_id, presence.user.id), |entry| {
                    entry.status = presence.status.clone();
                    entry.game = presence.game.clone();

                    if !presence.roles.is_empty() {
                        entry.roles = presence.roles.clone();
                    }
                });
            }
            Event::TypingStart(typing) => {
                self.typing
                    .upsert((typing.channel_id, typing.user_id), |entry| {
                        entry.last_typing = typing.timestamp;
                    });
            }
            Event::UserUpdate(user) => self.users.patch_or_put(user.clone()),
            Event::VoiceStateUpdate(state) => {
                self.voice_states.upsert(state.cache_key(), |entry| {
                    entry.state = state.clone();
                });
            }
            Event::Unknown(kind) => debug!(%kind, "ignoring unmapped dispatch"),
        }
    }

    fn apply_ready(&self, ready: &Ready) {
        let snapshot = ReadySnapshot {
            version: ready.v,
            user: ready.user.clone(),
            session_id: ready.session_id.as_str().into(),
            guild_ids: ready.guilds.iter().map(|guild| guild.id).collect(),
            private_channel_ids: ready
                .private_channels
                .iter()
                .map(|channel| channel.id)
                .collect(),
        };

        *self.ready.lock() = Some(snapshot);
    }

    fn apply_guild_create(&self, guild: &ripcord_model::Guild) {
        if self.guilds.put(guild.clone()).is_err() {
            // the READY stub or an earlier pass is already there
            let _ = self.guilds.patch(guild.clone());
        }

        for channel in &guild.channels {
            let mut channel = channel.clone();
            channel.guild_id = Some(guild.id);

            if self.channels.put(channel.clone()).is_err() {
                let _ = self.channels.patch(channel);
            }
        }

        for member in &guild.members {
            self.apply_member_add(guild.id, member);
        }
    }

    fn apply_member_add(&self, guild_id: Snowflake, member: &ripcord_model::GuildMember) {
        if self
            .members
            .put(MemberEntry::new(guild_id, member))
            .is_err()
        {
            let _ = self
                .members
                .update((guild_id, member.user.id), |entry| {
                    entry.joined_at = member.joined_at.clone();
                    entry.nick = member.nick.clone();
                    entry.roles = member.roles.clone();
                    entry.deaf = member.deaf;
                    entry.mute = member.mute;
                });
        }

        self.users.patch_or_put(member.user.clone());
    }
}

#[cfg(test)]
mod tests {
    use ripcord_model::{gateway::Event, Snowflake};
    use serde_json::json;

    use super::Cache;

    fn event(kind: &str, d: serde_json::Value) -> Event {
        Event::from_parts(kind, d).unwrap()
    }

    #[test]
    fn message_lifecycle() {
        let cache = Cache::new();

        cache.update(&event(
            "MESSAGE_CREATE",
            json!({
                "id": "10",
                "channel_id": "20",
                "content": "hi",
                "author": { "id": "30", "username": "author" },
            }),
        ));

        assert_eq!(cache.messages.len(), 1);

        cache.update(&event(
            "MESSAGE_REACTION_ADD",
            json!({
                "user_id": "30",
                "channel_id": "20",
                "message_id": "10",
                "emoji": { "id": null, "name": "👍" },
            }),
        ));

        let message = cache.messages.get(Snowflake::new(10)).unwrap();
        assert_eq!(message.reactions.len(), 1);
        assert_eq!(message.reactions[0].count, 1);
        assert_eq!(message.reactions[0].users, vec![Snowflake::new(30)]);

        cache.update(&event(
            "MESSAGE_REACTION_REMOVE",
            json!({
                "user_id": "30",
                "channel_id": "20",
                "message_id": "10",
                "emoji": { "id": null, "name": "👍" },
            }),
        ));

        let message = cache.messages.get(Snowflake::new(10)).unwrap();
        assert_eq!(message.reactions[0].count, 0);
        assert!(message.reactions[0].users.is_empty());

        cache.update(&event(
            "MESSAGE_DELETE",
            json!({ "id": "10", "channel_id": "20" }),
        ));

        assert!(cache.messages.is_empty());
    }

    #[test]
    fn guild_create_spreads_into_stores() {
        let cache = Cache::new();

        cache.update(&event(
            "GUILD_CREATE",
            json!({
                "id": "1",
                "name": "guild",
                "owner_id": "2",
                "channels": [
                    { "id": "3", "type": 0, "name": "general" },
                ],
                "members": [
                    {
                        "user": { "id": "4", "username": "m" },
                        "joined_at": "2019-01-01T00:00:00Z",
                        "roles": ["5"],
                    },
                ],
            }),
        ));

        assert!(cache.guilds.has(Snowflake::new(1)));

        let channel = cache.channels.get(Snowflake::new(3)).unwrap();
        assert_eq!(channel.guild_id, Some(Snowflake::new(1)));

        let member = cache
            .members
            .get((Snowflake::new(1), Snowflake::new(4)))
            .unwrap();
        assert_eq!(member.roles, vec![Snowflake::new(5)]);
        assert!(cache.users.has(Snowflake::new(4)));
    }

    #[test]
    fn guild_delete_marks_unavailable() {
        let cache = Cache::new();

        cache.update(&event(
            "GUILD_CREATE",
            json!({ "id": "1", "name": "guild", "owner_id": "2" }),
        ));
        cache.update(&event("GUILD_DELETE", json!({ "id": "1", "unavailable": true })));

        assert!(cache.guilds.get(Snowflake::new(1)).unwrap().unavailable);
    }

    #[test]
    fn role_handlers_edit_in_place() {
        let cache = Cache::new();

        cache.update(&event(
            "GUILD_CREATE",
            json!({ "id": "1", "name": "guild", "owner_id": "2" }),
        ));

        cache.update(&event(
            "GUILD_ROLE_CREATE",
            json!({ "guild_id": "1", "role": { "id": "7", "name": "mods" } }),
        ));

        cache.update(&event(
            "GUILD_ROLE_UPDATE",
            json!({ "guild_id": "1", "role": { "id": "7", "name": "admins" } }),
        ));

        let guild = cache.guilds.get(Snowflake::new(1)).unwrap();
        assert_eq!(guild.roles.len(), 1);
        assert_eq!(guild.roles[0].name, "admins");

        cache.update(&event(
            "GUILD_ROLE_DELETE",
            json!({ "guild_id": "1", "role_id": "7" }),
        ));

        assert!(cache.guilds.get(Snowflake::new(1)).unwrap().roles.is_empty());
    }

    #[test]
    fn presence_and_typing_synthesize_entries() {
        let cache = Cache::new();

        cache.update(&event(
            "PRESENCE_UPDATE",
            json!({
                "user": { "id": "4" },
                "guild_id": "1",
                "status": "online",
                "game": { "name": "chess", "type": 0 },
            }),
        ));

        let member = cache
            .members
            .get((Snowflake::new(1), Snowflake::new(4)))
            .unwrap();
        assert_eq!(member.status, "online");
        assert_eq!(member.game.as_ref().map(|g| g.name.as_str()), Some("chess"));

        cache.update(&event(
            "TYPING_START",
            json!({ "channel_id": "9", "user_id": "4", "timestamp": 1557000000 }),
        ));

        let typing = cache
            .typing
            .get((Snowflake::new(9), Snowflake::new(4)))
            .unwrap();
        assert_eq!(typing.last_typing, 1_557_000_000);
    }

    #[test]
    fn ready_snapshot() {
        let cache = Cache::new();

        cache.update(&event(
            "READY",
            json!({
                "v": 6,
                "user": { "id": "99", "username": "bot" },
                "session_id": "abc",
                "guilds": [{ "id": "1", "unavailable": true }],
                "private_channels": [{ "id": "2", "type": 1 }],
            }),
        ));

        let ready = cache.ready().unwrap();
        assert_eq!(ready.version, 6);
        assert_eq!(&*ready.session_id, "abc");
        assert_eq!(ready.guild_ids, vec![Snowflake::new(1)]);
        assert_eq!(ready.private_channel_ids, vec![Snowflake::new(2)]);
        assert_eq!(cache.current_user().unwrap().id.get(), 99);
    }
}
