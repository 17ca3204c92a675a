#[macro_use]
extern crate tracing;

mod cache;
mod entry;
mod merge;
mod store;

pub use self::{
    cache::{Cache, CacheStats, ReadySnapshot, DEFAULT_MESSAGE_LIMIT},
    entry::{MemberEntry, TypingEntry, VoiceEntry},
    merge::Merge,
    store::{CacheError, Record, Store},
};
