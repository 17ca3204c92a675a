pub mod gateway;

mod channel;
mod guild;
mod id;
mod invite;
mod member;
mod message;
mod user;
mod voice;

pub use self::{
    channel::{Channel, PermissionOverwrite},
    guild::{Ban, Emoji, Guild, GuildEmbed, Integration, IntegrationAccount, Role, VoiceRegion},
    id::Snowflake,
    invite::Invite,
    member::{Activity, GuildMember, Presence},
    message::{
        Attachment, Embed, EmbedAuthor, EmbedField, EmbedFooter, EmbedMedia, Message, Reaction,
    },
    user::User,
    voice::VoiceState,
};
