use std::sync::Arc;

use ripcord_model::{
    Ban, Channel, Guild, GuildEmbed, GuildMember, Integration, Invite, Role, Snowflake,
    VoiceRegion,
};
use serde_json::Value;

use super::encode_path_segment;
use crate::{Request, Rest, RestError};

/// A handle on `/guilds/<id>`.
pub struct GuildApi {
    rest: Arc<Rest>,
    id: Snowflake,
    prefix: String,
}

#[derive(Debug, Default)]
pub struct BanOptions {
    pub reason: Option<String>,
    pub delete_message_days: Option<u8>,
}

impl GuildApi {
    pub fn new(rest: Arc<Rest>, id: Snowflake) -> Self {
        Self {
            rest,
            id,
            prefix: format!("/guilds/{id}"),
        }
    }

    pub fn id(&self) -> Snowflake {
        self.id
    }

    fn members_bucket(&self) -> String {
        format!("{}/members", self.prefix)
    }

    fn bans_bucket(&self) -> String {
        format!("{}/bans", self.prefix)
    }

    pub async fn get(&self) -> Result<Guild, RestError> {
        self.rest.request(Request::get(&self.prefix)).await
    }

    pub async fn modify(&self, changes: &Value) -> Result<Guild, RestError> {
        self.rest
            .request(Request::patch(&self.prefix).json(changes)?)
            .await
    }

    pub async fn channels(&self) -> Result<Vec<Channel>, RestError> {
        self.rest
            .request(Request::get(format!("{}/channels", self.prefix)))
            .await
    }

    pub async fn create_channel(&self, channel: &Value) -> Result<Channel, RestError> {
        self.rest
            .request(Request::post(format!("{}/channels", self.prefix)).json(channel)?)
            .await
    }

    pub async fn member(&self, user: Snowflake) -> Result<GuildMember, RestError> {
        self.rest
            .request(
                Request::get(format!("{}/members/{user}", self.prefix))
                    .bucket(self.members_bucket()),
            )
            .await
    }

    /// Pages through `/members`; `after` is the highest user id already
    /// seen.
    pub async fn members(
        &self,
        limit: u16,
        after: Option<Snowflake>,
    ) -> Result<Vec<GuildMember>, RestError> {
        let mut route = format!("{}/members?limit={limit}", self.prefix);

        if let Some(after) = after {
            route.push_str(&format!("&after={after}"));
        }

        self.rest
            .request(Request::get(route).bucket(self.members_bucket()))
            .await
    }

    pub async fn kick(&self, user: Snowflake, reason: Option<&str>) -> Result<(), RestError> {
        let mut request =
            Request::delete(format!("{}/members/{user}", self.prefix)).bucket(self.members_bucket());

        if let Some(reason) = reason {
            request = request.reason(reason);
        }

        self.rest.request_unit(request).await
    }

    /// Renames this user in the guild; the reply carries the accepted nick.
    pub async fn change_nickname(&self, nick: &str) -> Result<String, RestError> {
        let body = serde_json::json!({ "nick": nick });

        let reply: Value = self
            .rest
            .request(
                Request::patch(format!("{}/members/@me/nick", self.prefix))
                    .bucket(self.members_bucket())
                    .json(&body)?,
            )
            .await?;

        let accepted = reply
            .get("nick")
            .and_then(Value::as_str)
            .or_else(|| reply.as_str())
            .unwrap_or(nick);

        Ok(accepted.to_owned())
    }

    pub async fn add_role(&self, user: Snowflake, role: Snowflake) -> Result<(), RestError> {
        self.rest
            .request_unit(
                Request::put(format!("{}/members/{user}/roles/{role}", self.prefix))
                    .bucket(self.members_bucket()),
            )
            .await
    }

    pub async fn remove_role(&self, user: Snowflake, role: Snowflake) -> Result<(), RestError> {
        self.rest
            .request_unit(
                Request::delete(format!("{}/members/{user}/roles/{role}", self.prefix))
                    .bucket(self.members_bucket()),
            )
            .await
    }

    pub async fn bans(&self) -> Result<Vec<Ban>, RestError> {
        self.rest
            .request(Request::get(format!("{}/bans", self.prefix)).bucket(self.bans_bucket()))
            .await
    }

    /// Bans with only the provided query parameters attached.
    pub async fn ban(&self, user: Snowflake, options: &BanOptions) -> Result<(), RestError> {
        let mut route = format!("{}/bans/{user}", self.prefix);
        let mut sep = '?';

        if let Some(days) = options.delete_message_days {
            route.push_str(&format!("{sep}delete-message-days={days}"));
            sep = '&';
        }

        if let Some(reason) = &options.reason {
            route.push_str(&format!("{sep}reason={}", encode_path_segment(reason)));
        }

        self.rest
            .request_unit(Request::put(route).bucket(self.bans_bucket()))
            .await
    }

    pub async fn unban(&self, user: Snowflake) -> Result<(), RestError> {
        self.rest
            .request_unit(
                Request::delete(format!("{}/bans/{user}", self.prefix)).bucket(self.bans_bucket()),
            )
            .await
    }

    pub async fn roles(&self) -> Result<Vec<Role>, RestError> {
        self.rest
            .request(Request::get(format!("{}/roles", self.prefix)))
            .await
    }

    pub async fn create_role(&self, role: &Value) -> Result<Role, RestError> {
        self.rest
            .request(Request::post(format!("{}/roles", self.prefix)).json(role)?)
            .await
    }

    pub async fn delete_role(&self, role: Snowflake) -> Result<(), RestError> {
        self.rest
            .request_unit(Request::delete(format!("{}/roles/{role}", self.prefix)))
            .await
    }

    pub async fn invites(&self) -> Result<Vec<Invite>, RestError> {
        self.rest
            .request(Request::get(format!("{}/invites", self.prefix)))
            .await
    }

    pub async fn integrations(&self) -> Result<Vec<Integration>, RestError> {
        self.rest
            .request(Request::get(format!("{}/integrations", self.prefix)))
            .await
    }

    pub async fn embed(&self) -> Result<GuildEmbed, RestError> {
        self.rest
            .request(Request::get(format!("{}/embed", self.prefix)))
            .await
    }

    pub async fn regions(&self) -> Result<Vec<VoiceRegion>, RestError> {
        self.rest
            .request(Request::get(format!("{}/regions", self.prefix)))
            .await
    }

    pub async fn prune_count(&self, days: u8) -> Result<u32, RestError> {
        let reply: Value = self
            .rest
            .request(Request::get(format!("{}/prune?days={days}", self.prefix)))
            .await?;

        Ok(reply.get("pruned").and_then(Value::as_u64).unwrap_or(0) as u32)
    }
}
