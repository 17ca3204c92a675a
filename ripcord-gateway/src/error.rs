use eyre::Report;
use ripcord_http::RestError;
use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("protocol violation: {0}")]
    Protocol(Box<str>),
    #[error("outbound frame of {size} bytes exceeds the 4096 byte cap")]
    PacketTooLarge { size: usize },
    #[error("gateway closed with code {code}: {reason}")]
    Closed { code: u16, reason: Box<str> },
    #[error("transport error")]
    Transport(#[from] WsError),
    #[error(transparent)]
    Rest(#[from] RestError),
    #[error(transparent)]
    Report(#[from] Report),
}
