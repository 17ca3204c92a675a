use serde::{Deserialize, Serialize};

use crate::{Snowflake, User};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GuildMember {
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<Snowflake>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub joined_at: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deaf: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub mute: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Presence {
    pub user: User,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<Snowflake>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game: Option<Activity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub status: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Activity {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}
