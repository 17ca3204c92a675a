mod hasher;

pub mod template;

pub use self::hasher::{IntHash, IntHasher};
