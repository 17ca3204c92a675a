//! Async client library for the chat platform's real-time protocol: a
//! gateway socket engine feeding an in-memory entity cache, and a bucketed,
//! rate-limited REST client, bound together by [`Client`].
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use ripcord::{Client, EventHandler};
//! use ripcord::model::gateway::Event;
//!
//! struct Handler;
//!
//! #[ripcord::async_trait]
//! impl EventHandler for Handler {
//!     async fn event(&self, event: Event) {
//!         if let Event::MessageCreate(message) = event {
//!             println!("{}: {}", message.author.username, message.content);
//!         }
//!     }
//! }
//!
//! # async fn run() -> Result<(), ripcord::GatewayError> {
//! let client = Client::builder("Bot token").build(Arc::new(Handler));
//! client.run().await
//! # }
//! ```

mod client;
mod handler;

pub use async_trait::async_trait;
pub use ripcord_cache::{Cache, CacheError, CacheStats, ReadySnapshot};
pub use ripcord_gateway::{Encoding, GatewayConfig, GatewayError};
pub use ripcord_http::{
    BanOptions, ChannelApi, CreateInvite, CreateMessage, GetMessages, GuildApi, PayloadFormat,
    Request, Rest, RestError,
};
pub use ripcord_etf as etf;
pub use ripcord_model as model;
pub use ripcord_util::template;

pub use self::{
    client::{Client, ClientBuilder},
    handler::EventHandler,
};
