use std::sync::Arc;

use ripcord_model::{Channel, Embed, Emoji, Invite, Message, Snowflake};
use serde::Serialize;
use serde_json::Value;

use super::encode_path_segment;
use crate::{Request, Rest, RestError};

/// A handle on `/channels/<id>`.
///
/// Message routes share one bucket per channel, reaction routes a dedicated
/// one; everything else is accounted on the channel itself.
pub struct ChannelApi {
    rest: Arc<Rest>,
    id: Snowflake,
    prefix: String,
}

#[derive(Debug, Default, Serialize)]
pub struct CreateMessage {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub content: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub tts: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed: Option<Embed>,
}

impl CreateMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug)]
pub struct GetMessages {
    pub limit: u8,
    pub around: Option<Snowflake>,
    pub before: Option<Snowflake>,
    pub after: Option<Snowflake>,
}

impl Default for GetMessages {
    fn default() -> Self {
        Self {
            limit: 50,
            around: None,
            before: None,
            after: None,
        }
    }
}

impl GetMessages {
    pub fn limit(limit: u8) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }

    pub fn around(mut self, id: Snowflake) -> Self {
        self.around = Some(id);

        self
    }

    pub fn before(mut self, id: Snowflake) -> Self {
        self.before = Some(id);

        self
    }

    pub fn after(mut self, id: Snowflake) -> Self {
        self.after = Some(id);

        self
    }
}

/// Body of `POST /invites`; default fields stay out of the payload.
#[derive(Debug, Default, Serialize)]
pub struct CreateInvite {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_uses: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporary: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
}

impl ChannelApi {
    pub fn new(rest: Arc<Rest>, id: Snowflake) -> Self {
        Self {
            rest,
            id,
            prefix: format!("/channels/{id}"),
        }
    }

    pub fn id(&self) -> Snowflake {
        self.id
    }

    fn messages_bucket(&self) -> String {
        format!("{}/messages", self.prefix)
    }

    fn reactions_bucket(&self) -> String {
        format!("{}/messages/reactions", self.prefix)
    }

    pub async fn get(&self) -> Result<Channel, RestError> {
        self.rest.request(Request::get(&self.prefix)).await
    }

    pub async fn modify(&self, changes: &Value) -> Result<Channel, RestError> {
        self.rest
            .request(Request::patch(&self.prefix).json(changes)?)
            .await
    }

    pub async fn delete(&self) -> Result<Channel, RestError> {
        self.rest.request(Request::delete(&self.prefix)).await
    }

    /// Up to `limit` (1 to 100) messages around at most one anchor.
    pub async fn messages(&self, query: GetMessages) -> Result<Vec<Message>, RestError> {
        if !(1..=100).contains(&query.limit) {
            return Err(RestError::InvalidInput("limit must be within 1..=100"));
        }

        let anchors = [query.around, query.before, query.after];

        if anchors.iter().flatten().count() > 1 {
            return Err(RestError::InvalidInput(
                "at most one of around/before/after may be set",
            ));
        }

        let mut route = format!("{}/messages?limit={}", self.prefix, query.limit);

        for (name, anchor) in [
            ("around", query.around),
            ("before", query.before),
            ("after", query.after),
        ] {
            if let Some(id) = anchor {
                route.push_str(&format!("&{name}={id}"));
            }
        }

        self.rest
            .request(Request::get(route).bucket(self.messages_bucket()))
            .await
    }

    pub async fn message(&self, id: Snowflake) -> Result<Message, RestError> {
        self.rest
            .request(Request::get(format!("{}/messages/{id}", self.prefix)).bucket(self.messages_bucket()))
            .await
    }

    pub async fn send_message(&self, message: &CreateMessage) -> Result<Message, RestError> {
        self.rest
            .request(
                Request::post(format!("{}/messages", self.prefix))
                    .bucket(self.messages_bucket())
                    .json(message)?,
            )
            .await
    }

    /// Plain text shorthand for [`Self::send_message`].
    pub async fn say(&self, content: impl Into<String>) -> Result<Message, RestError> {
        self.send_message(&CreateMessage::text(content)).await
    }

    pub async fn edit_message(
        &self,
        id: Snowflake,
        content: impl Into<String>,
    ) -> Result<Message, RestError> {
        let body = serde_json::json!({ "content": content.into() });

        self.rest
            .request(
                Request::patch(format!("{}/messages/{id}", self.prefix))
                    .bucket(self.messages_bucket())
                    .json(&body)?,
            )
            .await
    }

    pub async fn delete_message(&self, id: Snowflake) -> Result<(), RestError> {
        self.rest
            .request_unit(
                Request::delete(format!("{}/messages/{id}", self.prefix))
                    .bucket(self.messages_bucket()),
            )
            .await
    }

    /// Removes 1 to 100 messages; a single id routes to the single-message
    /// endpoint.
    pub async fn delete_messages(&self, ids: &[Snowflake]) -> Result<(), RestError> {
        match ids {
            [] => Err(RestError::InvalidInput("no message ids given")),
            [id] => self.delete_message(*id).await,
            ids if ids.len() <= 100 => {
                let body = serde_json::json!({ "messages": ids });

                self.rest
                    .request_unit(
                        Request::post(format!("{}/messages/bulk-delete", self.prefix))
                            .bucket(self.messages_bucket())
                            .json(&body)?,
                    )
                    .await
            }
            _ => Err(RestError::InvalidInput("at most 100 messages per bulk delete")),
        }
    }

    pub async fn create_reaction(
        &self,
        message: Snowflake,
        emoji: &Emoji,
    ) -> Result<(), RestError> {
        let route = format!(
            "{}/messages/{message}/reactions/{}/@me",
            self.prefix,
            encode_path_segment(&emoji.api_name()),
        );

        self.rest
            .request_unit(Request::put(route).bucket(self.reactions_bucket()))
            .await
    }

    pub async fn delete_own_reaction(
        &self,
        message: Snowflake,
        emoji: &Emoji,
    ) -> Result<(), RestError> {
        let route = format!(
            "{}/messages/{message}/reactions/{}/@me",
            self.prefix,
            encode_path_segment(&emoji.api_name()),
        );

        self.rest
            .request_unit(Request::delete(route).bucket(self.reactions_bucket()))
            .await
    }

    pub async fn delete_user_reaction(
        &self,
        message: Snowflake,
        emoji: &Emoji,
        user: Snowflake,
    ) -> Result<(), RestError> {
        let route = format!(
            "{}/messages/{message}/reactions/{}/{user}",
            self.prefix,
            encode_path_segment(&emoji.api_name()),
        );

        self.rest
            .request_unit(Request::delete(route).bucket(self.reactions_bucket()))
            .await
    }

    pub async fn delete_all_reactions(&self, message: Snowflake) -> Result<(), RestError> {
        self.rest
            .request_unit(
                Request::delete(format!("{}/messages/{message}/reactions", self.prefix))
                    .bucket(self.reactions_bucket()),
            )
            .await
    }

    pub async fn trigger_typing(&self) -> Result<(), RestError> {
        self.rest
            .request_unit(Request::post(format!("{}/typing", self.prefix)))
            .await
    }

    pub async fn pins(&self) -> Result<Vec<Message>, RestError> {
        self.rest
            .request(Request::get(format!("{}/pins", self.prefix)))
            .await
    }

    pub async fn pin_message(&self, id: Snowflake) -> Result<(), RestError> {
        self.rest
            .request_unit(Request::put(format!("{}/pins/{id}", self.prefix)))
            .await
    }

    pub async fn unpin_message(&self, id: Snowflake) -> Result<(), RestError> {
        self.rest
            .request_unit(Request::delete(format!("{}/pins/{id}", self.prefix)))
            .await
    }

    pub async fn invites(&self) -> Result<Vec<Invite>, RestError> {
        self.rest
            .request(Request::get(format!("{}/invites", self.prefix)))
            .await
    }

    pub async fn create_invite(&self, invite: &CreateInvite) -> Result<Invite, RestError> {
        self.rest
            .request(Request::post(format!("{}/invites", self.prefix)).json(invite)?)
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ripcord_model::Snowflake;

    use super::{ChannelApi, GetMessages};
    use crate::{Rest, RestError};

    fn api() -> ChannelApi {
        // never contacted: validation fails before any request is issued
        let rest = Arc::new(Rest::with_endpoint("token", "http://127.0.0.1:9/api/v6"));

        ChannelApi::new(rest, Snowflake::new(1))
    }

    #[tokio::test]
    async fn message_query_validation() {
        let api = api();

        assert!(matches!(
            api.messages(GetMessages::limit(0)).await,
            Err(RestError::InvalidInput(_)),
        ));

        assert!(matches!(
            api.messages(GetMessages::limit(101)).await,
            Err(RestError::InvalidInput(_)),
        ));

        let query = GetMessages::limit(50)
            .around(Snowflake::new(2))
            .before(Snowflake::new(3));

        assert!(matches!(
            api.messages(query).await,
            Err(RestError::InvalidInput(_)),
        ));
    }

    #[tokio::test]
    async fn bulk_delete_validation() {
        let api = api();

        assert!(matches!(
            api.delete_messages(&[]).await,
            Err(RestError::InvalidInput(_)),
        ));

        let too_many: Vec<_> = (0..101).map(Snowflake::new).collect();

        assert!(matches!(
            api.delete_messages(&too_many).await,
            Err(RestError::InvalidInput(_)),
        ));
    }
}
