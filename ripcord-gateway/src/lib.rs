#[macro_use]
extern crate tracing;

mod config;
mod error;
mod limiter;
mod shard;

pub use self::{
    config::{Encoding, GatewayConfig},
    error::GatewayError,
    limiter::{Cooldown, SlidingWindow},
    shard::{Dispatch, Gateway},
};
