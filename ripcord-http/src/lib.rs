#[macro_use]
extern crate eyre;

#[macro_use]
extern crate tracing;

mod api;
mod client;
mod error;
mod request;

pub use self::{
    api::{BanOptions, ChannelApi, CreateInvite, CreateMessage, GetMessages, GuildApi},
    client::Rest,
    error::RestError,
    request::{PayloadFormat, Request},
};
