use serde::Serialize;

use crate::{Activity, Snowflake};

/// An outbound frame: opcode plus payload.
#[derive(Debug, Serialize)]
pub struct Command<T> {
    pub op: u8,
    pub d: T,
}

impl<T> Command<T> {
    pub fn new(op: super::Opcode, d: T) -> Self {
        Self { op: op as u8, d }
    }
}

#[derive(Debug, Serialize)]
pub struct Identify {
    pub token: String,
    pub properties: ConnectionProperties,
    pub compress: bool,
    pub large_threshold: u32,
    pub shard: [u32; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<StatusUpdate>,
}

#[derive(Debug, Serialize)]
pub struct ConnectionProperties {
    #[serde(rename = "$os")]
    pub os: String,
    #[serde(rename = "$browser")]
    pub browser: String,
    #[serde(rename = "$device")]
    pub device: String,
}

impl Default for ConnectionProperties {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_owned(),
            browser: concat!("ripcord ", env!("CARGO_PKG_VERSION")).to_owned(),
            device: std::env::consts::ARCH.to_owned(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Resume {
    pub token: String,
    pub session_id: String,
    pub seq: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusUpdate {
    pub since: Option<u64>,
    pub game: Option<Activity>,
    pub status: String,
    pub afk: bool,
}

impl StatusUpdate {
    pub fn online() -> Self {
        Self {
            status: "online".to_owned(),
            ..Default::default()
        }
    }

    pub fn playing(name: impl Into<String>) -> Self {
        Self {
            game: Some(Activity {
                name: name.into(),
                ..Default::default()
            }),
            ..Self::online()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RequestGuildMembers {
    pub guild_id: Snowflake,
    pub query: String,
    pub limit: u32,
}

/// Outbound voice state change; `channel_id: None` leaves voice.
#[derive(Debug, Serialize)]
pub struct VoiceStateCommand {
    pub guild_id: Snowflake,
    pub channel_id: Option<Snowflake>,
    pub self_mute: bool,
    pub self_deaf: bool,
}
