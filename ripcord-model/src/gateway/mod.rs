mod close;
mod command;
mod event;

pub use self::{
    close::{close_code_description, ClosePolicy},
    command::{
        Command, ConnectionProperties, Identify, RequestGuildMembers, Resume, StatusUpdate,
        VoiceStateCommand,
    },
    event::{
        Event, GuildEmojisUpdate, GuildRoleChange, GuildRoleDelete, GuildUnavailable, MemberAdd,
        MemberChunk, MemberRemove, MemberUpdate, MessageDelete, MessageDeleteBulk, ReactionChange,
        ReactionRemoveAll, Ready, TypingStart,
    },
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Gateway opcodes.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum Opcode {
    Dispatch = 0,
    Heartbeat = 1,
    Identify = 2,
    StatusUpdate = 3,
    VoiceStateUpdate = 4,
    VoiceServerPing = 5,
    Resume = 6,
    Reconnect = 7,
    RequestGuildMembers = 8,
    InvalidSession = 9,
    Hello = 10,
    HeartbeatAck = 11,
}

impl Opcode {
    pub fn from_u8(op: u8) -> Option<Self> {
        let op = match op {
            0 => Self::Dispatch,
            1 => Self::Heartbeat,
            2 => Self::Identify,
            3 => Self::StatusUpdate,
            4 => Self::VoiceStateUpdate,
            5 => Self::VoiceServerPing,
            6 => Self::Resume,
            7 => Self::Reconnect,
            8 => Self::RequestGuildMembers,
            9 => Self::InvalidSession,
            10 => Self::Hello,
            11 => Self::HeartbeatAck,
            _ => return None,
        };

        Some(op)
    }
}

/// The `{op, d, s, t}` envelope every gateway frame travels in.
///
/// `d` stays an unparsed tree until the opcode and event kind pick the
/// payload type.
#[derive(Debug, Deserialize, Serialize)]
pub struct Frame {
    pub op: u8,
    #[serde(default)]
    pub d: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Hello {
    pub heartbeat_interval: u64,
}
