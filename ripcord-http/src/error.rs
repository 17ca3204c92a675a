use eyre::Report;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RestError {
    #[error("route and bucket must begin with '/'")]
    InvalidRoute,
    #[error("redirected outside the api base")]
    BadRedirect,
    #[error("status code {status}: {body}")]
    Status { status: u16, body: String },
    #[error("no response after {0} attempts")]
    RetryExhausted(u32),
    #[error("request timed out")]
    Timeout,
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("failed to decode response body")]
    Decode(#[source] Report),
    #[error(transparent)]
    Report(#[from] Report),
}
