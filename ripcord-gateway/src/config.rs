use ripcord_model::gateway::StatusUpdate;

/// Which wire form the gateway negotiates at connect time.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum Encoding {
    #[default]
    Json,
    Etf,
}

impl Encoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Etf => "etf",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub token: String,
    pub encoding: Encoding,
    /// Skips the REST lookup of the socket URL when set.
    pub gateway_url: Option<String>,
    /// `[shard_id, shard_count]` for the identify payload.
    pub shard: [u32; 2],
    pub large_threshold: u32,
    pub presence: Option<StatusUpdate>,
}

impl GatewayConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            encoding: Encoding::default(),
            gateway_url: None,
            shard: [0, 1],
            large_threshold: 250,
            presence: None,
        }
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;

        self
    }

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
}
