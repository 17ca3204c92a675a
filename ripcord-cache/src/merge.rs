use ripcord_model::{Channel, Guild, Message, User};

/// Field-wise merge of a partial record into a cached one.
///
/// The copy rules: an optional field only lands when it is set, a list only
/// when it is non-empty, a textual field only when it is non-blank, an
/// embedded record only when it carries an id; plain scalars land
/// unconditionally.
pub trait Merge {
    fn merge(&mut self, src: Self);
}

macro_rules! merge_field {
    ( $dst:ident, $src:ident, $field:ident opt ) => {
        if $src.$field.is_some() {
            $dst.$field = $src.$field;
        }
    };
    ( $dst:ident, $src:ident, $field:ident vec ) => {
        if !$src.$field.is_empty() {
            $dst.$field = $src.$field;
        }
    };
    ( $dst:ident, $src:ident, $field:ident text ) => {
        if !$src.$field.is_empty() {
            $dst.$field = $src.$field;
        }
    };
    ( $dst:ident, $src:ident, $field:ident keyed ) => {
        if $src.$field.id.is_some() {
            $dst.$field = $src.$field;
        }
    };
    // a bare snowflake, where zero marks absence
    ( $dst:ident, $src:ident, $field:ident id ) => {
        if $src.$field.is_some() {
            $dst.$field = $src.$field;
        }
    };
    ( $dst:ident, $src:ident, $field:ident always ) => {
        $dst.$field = $src.$field;
    };
}

macro_rules! impl_merge {
    ( $ty:ty { $( $field:ident $kind:ident, )* } ) => {
        impl Merge for $ty {
            fn merge(&mut self, src: Self) {
                $( merge_field!(self, src, $field $kind); )*
            }
        }
    };
}

impl_merge!(User {
    id id,
    username text,
    discriminator text,
    avatar opt,
    bot always,
    mfa_enabled always,
    verified always,
    email opt,
});

impl_merge!(Channel {
    id id,
    kind always,
    guild_id opt,
    position always,
    permission_overwrites vec,
    name text,
    topic opt,
    nsfw always,
    last_message_id opt,
    bitrate always,
    user_limit always,
    rate_limit_per_user always,
    recipients vec,
    icon opt,
    owner_id opt,
    application_id opt,
    parent_id opt,
});

impl_merge!(Guild {
    id id,
    name text,
    icon opt,
    splash opt,
    owner_id id,
    region text,
    afk_channel_id opt,
    afk_timeout always,
    verification_level always,
    default_message_notifications always,
    explicit_content_filter always,
    roles vec,
    emojis vec,
    features vec,
    mfa_level always,
    application_id opt,
    joined_at opt,
    large always,
    unavailable always,
    member_count always,
    voice_states vec,
    members vec,
    channels vec,
    presences vec,
});

impl_merge!(Message {
    id id,
    channel_id id,
    guild_id opt,
    author keyed,
    content text,
    timestamp text,
    edited_timestamp opt,
    tts always,
    mention_everyone always,
    mentions vec,
    mention_roles vec,
    attachments vec,
    embeds vec,
    reactions vec,
    pinned always,
    webhook_id opt,
    kind always,
});
