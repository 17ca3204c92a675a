use bytes::Bytes;
use http::Method;
use serde::Serialize;

use crate::RestError;

/// Which wire form the response body takes.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum PayloadFormat {
    #[default]
    Json,
    Etf,
}

/// A REST call description.
///
/// `bucket` defaults to the route; give related routes a shared bucket when
/// the server accounts them together.
#[derive(Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) route: String,
    pub(crate) bucket: Option<String>,
    pub(crate) body: Option<Bytes>,
    pub(crate) audit_reason: Option<String>,
    pub(crate) format: PayloadFormat,
}

impl Request {
    pub fn new(method: Method, route: impl Into<String>) -> Self {
        Self {
            method,
            route: route.into(),
            bucket: None,
            body: None,
            audit_reason: None,
            format: PayloadFormat::Json,
        }
    }

    pub fn get(route: impl Into<String>) -> Self {
        Self::new(Method::GET, route)
    }

    pub fn post(route: impl Into<String>) -> Self {
        Self::new(Method::POST, route)
    }

    pub fn put(route: impl Into<String>) -> Self {
        Self::new(Method::PUT, route)
    }

    pub fn patch(route: impl Into<String>) -> Self {
        Self::new(Method::PATCH, route)
    }

    pub fn delete(route: impl Into<String>) -> Self {
        Self::new(Method::DELETE, route)
    }

    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());

        self
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, RestError> {
        let bytes = serde_json::to_vec(body)
            .map_err(|err| RestError::Report(eyre!("failed to serialize request body: {err}")))?;

        self.body = Some(Bytes::from(bytes));

        Ok(self)
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.audit_reason = Some(reason.into());

        self
    }

    pub fn format(mut self, format: PayloadFormat) -> Self {
        self.format = format;

        self
    }
}
