use serde::{Deserialize, Serialize};

use crate::Snowflake;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct User {
    pub id: Snowflake,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub discriminator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub bot: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub mfa_enabled: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl User {
    /// `username#discriminator`
    pub fn tag(&self) -> String {
        format!("{}#{}", self.username, self.discriminator)
    }
}
