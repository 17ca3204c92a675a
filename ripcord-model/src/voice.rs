use serde::{Deserialize, Serialize};

use crate::Snowflake;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct VoiceState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<Snowflake>,
    pub user_id: Snowflake,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub session_id: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deaf: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub mute: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub self_deaf: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub self_mute: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub suppress: bool,
}

impl VoiceState {
    /// The `(guild, channel, user)` triple voice states are cached under.
    pub fn cache_key(&self) -> (Snowflake, Snowflake, Snowflake) {
        (
            self.guild_id.unwrap_or_default(),
            self.channel_id.unwrap_or_default(),
            self.user_id,
        )
    }
}
