use std::sync::Arc;

use ripcord_cache::Cache;
use ripcord_gateway::{Dispatch, Encoding, Gateway, GatewayConfig, GatewayError};
use ripcord_http::{ChannelApi, GuildApi, Rest};
use ripcord_model::{
    gateway::{Event, RequestGuildMembers, StatusUpdate, VoiceStateCommand},
    Snowflake,
};

use crate::EventHandler;

/// Binds the REST engine, the gateway engine, and the cache, and hands out
/// per-resource handles.
pub struct Client {
    rest: Arc<Rest>,
    cache: Arc<Cache>,
    gateway: Arc<Gateway>,
}

impl Client {
    pub fn builder(token: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(token)
    }

    /// Runs the gateway until [`Self::disconnect`] or a fatal close.
    pub async fn run(&self) -> Result<(), GatewayError> {
        Arc::clone(&self.gateway).run().await
    }

    pub async fn disconnect(&self) {
        self.gateway.disconnect().await;
    }

    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    pub fn rest(&self) -> &Arc<Rest> {
        &self.rest
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    /// A handle on `/channels/<id>`.
    pub fn channel(&self, id: Snowflake) -> ChannelApi {
        ChannelApi::new(Arc::clone(&self.rest), id)
    }

    /// A handle on `/guilds/<id>`.
    pub fn guild(&self, id: Snowflake) -> GuildApi {
        GuildApi::new(Arc::clone(&self.rest), id)
    }

    pub async fn update_status(&self, status: StatusUpdate) -> Result<(), GatewayError> {
        self.gateway.update_status(status).await
    }

    pub async fn update_voice_state(
        &self,
        command: VoiceStateCommand,
    ) -> Result<(), GatewayError> {
        self.gateway.update_voice_state(command).await
    }

    pub async fn request_guild_members(
        &self,
        request: RequestGuildMembers,
    ) -> Result<(), GatewayError> {
        self.gateway.request_guild_members(request).await
    }
}

/// Applies each dispatch to the cache inline, then hands it to the user
/// handler on a fresh task.
struct CacheFirst {
    cache: Arc<Cache>,
    handler: Arc<dyn EventHandler>,
}

impl Dispatch for CacheFirst {
    fn dispatch(&self, event: Event) {
        self.cache.update(&event);

        let handler = Arc::clone(&self.handler);

        tokio::spawn(async move {
            handler.event(event).await;
        });
    }
}

pub struct ClientBuilder {
    token: String,
    encoding: Encoding,
    rest_endpoint: Option<String>,
    gateway_url: Option<String>,
    shard: [u32; 2],
    presence: Option<StatusUpdate>,
    message_cache_limit: usize,
}

impl ClientBuilder {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            encoding: Encoding::default(),
            rest_endpoint: None,
            gateway_url: None,
            shard: [0, 1],
            presence: None,
            message_cache_limit: ripcord_cache::DEFAULT_MESSAGE_LIMIT,
        }
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;

        self
    }

    /// Overrides the REST endpoint, e.g. for a loopback server.
    pub fn rest_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.rest_endpoint = Some(endpoint.into());

        self
    }

    /// Overrides the socket URL, skipping the REST lookup.
    pub fn gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = Some(url.into());

        self
    }

    pub fn shard(mut self, id: u32, count: u32) -> Self {
        self.shard = [id, count];

        self
    }

    pub fn presence(mut self, presence: StatusUpdate) -> Self {
        self.presence = Some(presence);

        self
    }

    pub fn message_cache_limit(mut self, limit: usize) -> Self {
        self.message_cache_limit = limit;

        self
    }

    pub fn build(self, handler: Arc<dyn EventHandler>) -> Client {
        let token = self
            .token
            .strip_prefix("Bot ")
            .unwrap_or(&self.token)
            .to_owned();

        let rest = Arc::new(match &self.rest_endpoint {
            Some(endpoint) => Rest::with_endpoint(token.clone(), endpoint),
            None => Rest::new(token.clone()),
        });

        let cache = Arc::new(Cache::with_message_limit(self.message_cache_limit));

        let mut config = GatewayConfig::new(token)
            .encoding(self.encoding)
            .shard(self.shard[0], self.shard[1]);

        if let Some(url) = self.gateway_url {
            config = config.gateway_url(url);
        }

        if let Some(presence) = self.presence {
            config = config.presence(presence);
        }

        let dispatch = Arc::new(CacheFirst {
            cache: Arc::clone(&cache),
            handler,
        });

        let gateway = Arc::new(Gateway::new(config, Arc::clone(&rest), dispatch));

        Client {
            rest,
            cache,
            gateway,
        }
    }
}
