// src/api/transport.rs

//! The blocking HTTP seam every API call goes through.

use crate::errors::ApiError;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, CONTENT_LENGTH, USER_AGENT};
use std::fmt;
use std::io::{self, Read};

/// A received response whose body has not been read yet.
///
/// Keeping the body as a reader lets callers inspect `Content-Length` before
/// materializing anything.
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    body: Box<dyn Read + Send>,
}

impl HttpResponse {
    pub fn new(status: u16, headers: HeaderMap, body: impl Read + Send + 'static) -> Self {
        Self {
            status,
            headers,
            body: Box::new(body),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns a header value when it is present and valid ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The declared body length, if the server sent one.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    }

    /// Reads the whole body as (lossy) UTF-8 text.
    pub fn read_text(self) -> io::Result<String> {
        let mut bytes = Vec::new();
        let mut body = self.body;
        body.read_to_end(&mut bytes)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Reads at most `limit` bytes. Returns `None` when the body is longer.
    pub fn read_limited(self, limit: u64) -> io::Result<Option<Vec<u8>>> {
        let mut bytes = Vec::new();
        self.body
            .take(limit.saturating_add(1))
            .read_to_end(&mut bytes)?;
        if bytes.len() as u64 > limit {
            Ok(None)
        } else {
            Ok(Some(bytes))
        }
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Performs one GET. Implementations must not retry on their own.
pub trait HttpTransport: Send + Sync {
    fn get(&self, url: &str, headers: &HeaderMap) -> Result<HttpResponse, ApiError>;
}

/// The production transport, backed by a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            user_agent.parse().map_err(|_| ApiError::Transport {
                url: String::new(),
                message: format!("invalid user agent '{}'", user_agent),
            })?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Transport {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &str, headers: &HeaderMap) -> Result<HttpResponse, ApiError> {
        let response = self
            .client
            .get(url)
            .headers(headers.clone())
            .send()
            .map_err(|e| ApiError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        Ok(HttpResponse::new(status, headers, response))
    }
}
