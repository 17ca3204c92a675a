use std::{collections::HashMap, sync::Arc};

use bytes::Bytes;
use eyre::WrapErr;
use http::{
    header::{AUTHORIZATION, CONTENT_TYPE, LOCATION, USER_AGENT},
    HeaderMap, StatusCode,
};
use hyper::{
    client::{connect::dns::GaiResolver, Client as HyperClient, HttpConnector},
    Body, Request as HyperRequest,
};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use time::OffsetDateTime;
use tokio::{
    sync::Mutex as AsyncMutex,
    time::{sleep, sleep_until, timeout, Duration, Instant},
};

use crate::{PayloadFormat, Request, RestError};

pub(crate) type InnerClient = HyperClient<HttpsConnector<HttpConnector<GaiResolver>>, Body>;

const DEFAULT_ENDPOINT: &str = "https://discordapp.com/api/v6";

const USER_AGENT_VALUE: &str = concat!(
    "DiscordBot (",
    env!("CARGO_PKG_REPOSITORY"),
    ", ",
    env!("CARGO_PKG_VERSION"),
    ")"
);

const MAX_ATTEMPTS: u32 = 5;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(12);

/// The REST engine.
///
/// Tracks one rate-limit bucket per route family from the reply headers plus
/// the process-wide global limit, retries transient failures and 429s, and
/// follows same-base redirects. Concurrent calls on the same bucket
/// serialize.
pub struct Rest {
    http: InnerClient,
    token: Box<str>,
    endpoint: Box<str>,
    origin: Box<str>,
    base_path: Box<str>,
    buckets: Mutex<HashMap<Box<str>, Bucket>>,
    locks: Mutex<HashMap<Box<str>, Arc<AsyncMutex<()>>>>,
    global: Mutex<GlobalLimit>,
}

struct Bucket {
    limit: u64,
    remaining: u64,
    /// Unix seconds.
    reset_at: i64,
}

struct GlobalLimit {
    limited: bool,
    reset_at: Instant,
}

impl Rest {
    pub fn new(token: impl Into<Box<str>>) -> Self {
        Self::with_endpoint(token, DEFAULT_ENDPOINT)
    }

    /// An alternate endpoint, e.g. a loopback server in tests.
    pub fn with_endpoint(token: impl Into<Box<str>>, endpoint: &str) -> Self {
        let connector = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();

        let (origin, base_path) = split_endpoint(endpoint);

        Self {
            http: HyperClient::builder().build(connector),
            token: token.into(),
            endpoint: endpoint.into(),
            origin,
            base_path,
            buckets: Mutex::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
            global: Mutex::new(GlobalLimit {
                limited: false,
                reset_at: Instant::now(),
            }),
        }
    }

    pub async fn request<T: DeserializeOwned>(&self, request: Request) -> Result<T, RestError> {
        let format = request.format;
        let bytes = self.execute(request).await?;

        decode(format, &bytes)
    }

    /// For calls whose success is `204 No Content`.
    pub async fn request_unit(&self, request: Request) -> Result<(), RestError> {
        self.execute(request).await.map(|_| ())
    }

    /// `GET /gateway`, the socket URL to connect to.
    pub async fn get_gateway(&self) -> Result<String, RestError> {
        #[derive(serde::Deserialize)]
        struct GatewayInfo {
            url: String,
        }

        let info: GatewayInfo = self.request(Request::get("/gateway")).await?;

        Ok(info.url)
    }

    async fn execute(&self, request: Request) -> Result<Bytes, RestError> {
        if !request.route.starts_with('/') {
            return Err(RestError::InvalidRoute);
        }

        let bucket: Box<str> = match request.bucket.as_deref() {
            None | Some("") => request.route.as_str().into(),
            Some(bucket) if bucket.starts_with('/') => bucket.into(),
            Some(_) => return Err(RestError::InvalidRoute),
        };

        // callers on the same bucket serialize for the whole call
        let lock = {
            let mut locks = self.locks.lock();

            Arc::clone(locks.entry(bucket.clone()).or_default())
        };
        let _serialized = lock.lock().await;

        self.acquire(&bucket).await;

        let mut url = format!("{}{}", self.endpoint, request.route);
        let mut timed_out = false;

        for attempt in 1..=MAX_ATTEMPTS {
            trace!(%url, attempt, "issuing request");

            let outgoing = self.build(&request, &url)?;

            let response = match timeout(REQUEST_TIMEOUT, self.http.request(outgoing)).await {
                Ok(Ok(response)) => response,
                Ok(Err(err)) => {
                    warn!(?err, %url, "transport error, retrying");
                    timed_out = false;

                    continue;
                }
                Err(_) => {
                    warn!(%url, "request watchdog fired, retrying");
                    timed_out = true;

                    continue;
                }
            };

            timed_out = false;
            let status = response.status();

            if status.is_redirection() {
                url = self.resolve_redirect(&url, response.headers())?;
                debug!(%url, "following redirect");

                continue;
            }

            if self.update_bucket(&bucket, status, response.headers()).await {
                continue;
            }

            if status.is_success() {
                if status == StatusCode::NO_CONTENT {
                    return Ok(Bytes::new());
                }

                return hyper::body::to_bytes(response.into_body())
                    .await
                    .wrap_err("failed to read response body")
                    .map_err(RestError::Report);
            }

            let body = hyper::body::to_bytes(response.into_body())
                .await
                .unwrap_or_default();

            return Err(RestError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        if timed_out {
            Err(RestError::Timeout)
        } else {
            Err(RestError::RetryExhausted(MAX_ATTEMPTS))
        }
    }

    /// Global gate first, then the per-bucket count.
    async fn acquire(&self, bucket: &str) {
        loop {
            let wait_until = {
                let mut global = self.global.lock();

                if !global.limited {
                    None
                } else if global.reset_at <= Instant::now() {
                    global.limited = false;

                    None
                } else {
                    Some(global.reset_at)
                }
            };

            match wait_until {
                Some(until) => sleep_until(until).await,
                None => break,
            }
        }

        loop {
            let wait = {
                let mut buckets = self.buckets.lock();

                match buckets.get_mut(bucket) {
                    Some(state) => {
                        if state.reset_at <= unix_now() {
                            state.remaining = state.limit.max(1);
                        }

                        if state.remaining > 0 {
                            state.remaining -= 1;

                            None
                        } else {
                            Some(state.reset_at - unix_now())
                        }
                    }
                    None => None,
                }
            };

            match wait {
                Some(secs) => {
                    if secs > 0 {
                        debug!(bucket, secs, "bucket exhausted, waiting");
                        sleep(Duration::from_secs(secs as u64)).await;
                    }
                }
                None => break,
            }
        }
    }

    /// Digests rate-limit headers; `true` means the caller must retry.
    async fn update_bucket(&self, bucket: &str, status: StatusCode, headers: &HeaderMap) -> bool {
        if header_str(headers, "X-RateLimit-Global") == Some("true") {
            let retry_after = header_int(headers, "Retry-After").unwrap_or(1000).max(0) as u64;
            let reset_at = Instant::now() + Duration::from_millis(retry_after);

            {
                let mut global = self.global.lock();
                global.limited = true;
                global.reset_at = reset_at;
            }

            warn!(retry_after, "globally rate limited");
            sleep_until(reset_at).await;

            return true;
        }

        let limits = (
            header_int(headers, "X-RateLimit-Limit"),
            header_int(headers, "X-RateLimit-Remaining"),
            header_int(headers, "X-RateLimit-Reset"),
        );

        if let (Some(limit), Some(remaining), Some(reset_at)) = limits {
            self.buckets.lock().insert(
                bucket.into(),
                Bucket {
                    limit: limit.max(0) as u64,
                    remaining: remaining.max(0) as u64,
                    reset_at,
                },
            );

            if status == StatusCode::TOO_MANY_REQUESTS {
                let wait = reset_at - unix_now();

                if wait > 0 {
                    warn!(bucket, wait, "bucket rate limited");
                    sleep(Duration::from_secs(wait as u64)).await;
                }

                return true;
            }

            return false;
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!(bucket, "rate limited without headers");
            sleep(Duration::from_secs(1)).await;

            return true;
        }

        false
    }

    fn build(&self, request: &Request, url: &str) -> Result<HyperRequest<Body>, RestError> {
        let mut builder = HyperRequest::builder()
            .method(request.method.clone())
            .uri(url)
            .header(USER_AGENT, USER_AGENT_VALUE)
            .header(AUTHORIZATION, format!("Bot {}", self.token));

        if let Some(reason) = &request.audit_reason {
            builder = builder.header("X-Audit-Log-Reason", reason.as_str());
        }

        let body = match &request.body {
            Some(bytes) => {
                builder = builder.header(CONTENT_TYPE, "application/json");

                Body::from(bytes.clone())
            }
            None => Body::empty(),
        };

        builder
            .body(body)
            .wrap_err("failed to build request")
            .map_err(RestError::Report)
    }

    /// Absolute locations must share the endpoint origin, server-relative
    /// ones the api base path; document-relative ones resolve against the
    /// current url. Everything else is rejected.
    fn resolve_redirect(&self, current: &str, headers: &HeaderMap) -> Result<String, RestError> {
        let location = headers
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(RestError::BadRedirect)?;

        if location.contains("://") {
            return match location.strip_prefix(self.origin.as_ref()) {
                Some(rest) if rest.is_empty() || rest.starts_with('/') => Ok(location.to_owned()),
                _ => Err(RestError::BadRedirect),
            };
        }

        if location.starts_with('/') {
            if location.starts_with(self.base_path.as_ref()) {
                return Ok(format!("{}{location}", self.origin));
            }

            return Err(RestError::BadRedirect);
        }

        match current.rfind('/') {
            Some(idx) => Ok(format!("{}/{location}", &current[..idx])),
            None => Err(RestError::BadRedirect),
        }
    }
}

fn decode<T: DeserializeOwned>(format: PayloadFormat, bytes: &[u8]) -> Result<T, RestError> {
    match format {
        PayloadFormat::Json => serde_json::from_slice(bytes)
            .map_err(|err| RestError::Decode(eyre!("invalid json response: {err}"))),
        PayloadFormat::Etf => ripcord_etf::from_bytes(bytes)
            .map_err(|err| RestError::Decode(eyre!("invalid etf response: {err}"))),
    }
}

fn unix_now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn header_int(headers: &HeaderMap, name: &str) -> Option<i64> {
    header_str(headers, name).and_then(|value| value.parse().ok())
}

fn split_endpoint(endpoint: &str) -> (Box<str>, Box<str>) {
    let after_scheme = endpoint.find("://").map_or(0, |idx| idx + 3);

    match endpoint[after_scheme..].find('/') {
        Some(idx) => {
            let split = after_scheme + idx;

            (endpoint[..split].into(), endpoint[split..].into())
        }
        None => (endpoint.into(), "".into()),
    }
}

#[cfg(test)]
mod tests {
    use http::{header::LOCATION, HeaderMap, HeaderValue};

    use super::{split_endpoint, Rest};
    use crate::RestError;

    fn redirect_to(rest: &Rest, location: &str) -> Result<String, RestError> {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, HeaderValue::from_str(location).unwrap());

        rest.resolve_redirect("https://discordapp.com/api/v6/users/1", &headers)
    }

    #[test]
    fn endpoint_split() {
        let (origin, base) = split_endpoint("https://discordapp.com/api/v6");
        assert_eq!(&*origin, "https://discordapp.com");
        assert_eq!(&*base, "/api/v6");

        let (origin, base) = split_endpoint("http://127.0.0.1:8080/api/v6");
        assert_eq!(&*origin, "http://127.0.0.1:8080");
        assert_eq!(&*base, "/api/v6");
    }

    #[test]
    fn redirect_policy() {
        let rest = Rest::new("token");

        assert_eq!(
            redirect_to(&rest, "https://discordapp.com/api/v6/users/2").unwrap(),
            "https://discordapp.com/api/v6/users/2",
        );

        assert!(matches!(
            redirect_to(&rest, "https://elsewhere.example/api/v6/users/2"),
            Err(RestError::BadRedirect),
        ));

        // prefix-confusable host
        assert!(matches!(
            redirect_to(&rest, "https://discordapp.com.evil.example/x"),
            Err(RestError::BadRedirect),
        ));

        assert_eq!(
            redirect_to(&rest, "/api/v6/users/2").unwrap(),
            "https://discordapp.com/api/v6/users/2",
        );

        assert!(matches!(
            redirect_to(&rest, "/elsewhere"),
            Err(RestError::BadRedirect),
        ));

        assert_eq!(
            redirect_to(&rest, "2/profile").unwrap(),
            "https://discordapp.com/api/v6/users/2/profile",
        );
    }
}
