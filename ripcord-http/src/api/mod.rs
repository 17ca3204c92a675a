mod channel;
mod guild;

pub use self::{
    channel::{ChannelApi, CreateInvite, CreateMessage, GetMessages},
    guild::{BanOptions, GuildApi},
};

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

fn encode_path_segment(segment: &str) -> String {
    utf8_percent_encode(segment, NON_ALPHANUMERIC).to_string()
}
