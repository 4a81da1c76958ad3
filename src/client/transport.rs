//! HTTP seam
//!
//! [`Transport`] performs one GET and hands back the status plus an
//! unread body stream. Classification of the result is left to the caller.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, BoxStream};
use futures_util::{StreamExt, TryStreamExt};
use reqwest::Client;
use std::io;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

pub type BodyStream = BoxStream<'static, io::Result<Bytes>>;

/// Status line and streaming body of one response
pub struct WireResponse {
    pub status: u16,
    pub content_length: Option<u64>,
    pub body: BodyStream,
}

impl std::fmt::Debug for WireResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WireResponse")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

impl WireResponse {
    /// Fully buffered response
    pub fn from_bytes(status: u16, body: impl Into<Bytes>) -> Self {
        let body: Bytes = body.into();
        Self {
            status,
            content_length: Some(body.len() as u64),
            body: stream::iter(vec![Ok(body)]).boxed(),
        }
    }

    /// Response delivered as the given chunks, any of which may fail
    pub fn from_chunks(
        status: u16,
        content_length: Option<u64>,
        chunks: Vec<io::Result<Bytes>>,
    ) -> Self {
        Self {
            status,
            content_length,
            body: stream::iter(chunks).boxed(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Drain the body into memory.
    pub async fn bytes(self) -> io::Result<Vec<u8>> {
        self.body
            .try_fold(Vec::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue `GET {path}?{query}`; fails only when no response arrived.
    async fn get(&self, path: &str, query: &[(&'static str, String)]) -> Result<WireResponse>;
}

/// [`Transport`] backed by a shared `reqwest` client
pub struct HttpTransport {
    base_url: String,
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| ClientError::Unreachable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url().to_string(),
            client,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str, query: &[(&'static str, String)]) -> Result<WireResponse> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| ClientError::Unreachable(format!("Cannot connect to {}: {}", url, e)))?;

        let status = response.status().as_u16();
        let content_length = response.content_length();
        let body = response
            .bytes_stream()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
            .boxed();

        Ok(WireResponse {
            status,
            content_length,
            body,
        })
    }
}
