//! External term format, the tag-prefixed binary encoding the gateway speaks
//! when ETF is negotiated.
//!
//! Three layers:
//! - [`Writer`]: term-level primitives with a resizable or fixed-capacity
//!   buffer, for hand-rolled payloads.
//! - serde: [`to_bytes`] / [`from_bytes`] drive the same derives that already
//!   cover the JSON wire form.
//! - [`Term`]: a parsed tree that defers value interpretation, for logging
//!   and picking single fields out of a frame.

mod de;
mod error;
mod ser;
mod term;
mod writer;

pub(crate) mod tag;

pub use self::{
    de::{from_bytes, Deserializer},
    error::EtfError,
    ser::{to_bytes, to_bytes_fixed, Serializer},
    term::Term,
    writer::Writer,
};

/// Leading byte of every encoded term.
pub const VERSION: u8 = 131;
