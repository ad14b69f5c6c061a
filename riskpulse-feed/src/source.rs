//! Event sources the feed can subscribe to
//!
//! The production source opens a server-sent event stream over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::{header, Client};
use riskpulse_core::WireEvent;
use tracing::debug;

use crate::FeedError;

/// Decoded wire events of one open connection; ends when the connection does
pub type WireStream = BoxStream<'static, Result<WireEvent, FeedError>>;

/// Connection timeout for opening the stream (the stream itself is unbounded)
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Something the feed can open a live event stream from
#[async_trait]
pub trait EventSource: Send + Sync + 'static {
    /// Open a fresh connection
    async fn connect(&self) -> Result<WireStream, FeedError>;
}

/// Server-sent events over HTTP
#[derive(Clone)]
pub struct HttpEventSource {
    client: Client,
    url: String,
}

impl HttpEventSource {
    pub fn new(url: impl Into<String>) -> Result<Self, FeedError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| FeedError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl EventSource for HttpEventSource {
    async fn connect(&self) -> Result<WireStream, FeedError> {
        debug!("Opening event stream: {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .header(header::ACCEPT, "text/event-stream")
            .header(header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| FeedError::Connect(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FeedError::Status(response.status().as_u16()));
        }

        let stream = response
            .bytes_stream()
            .eventsource()
            .map(|item| match item {
                Ok(event) => Ok(WireEvent {
                    kind: event.event,
                    id: Some(event.id).filter(|id| !id.is_empty()),
                    data: event.data,
                }),
                Err(e) => Err(FeedError::Stream(e.to_string())),
            })
            .boxed();

        Ok(stream)
    }
}

impl std::fmt::Debug for HttpEventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEventSource")
            .field("url", &self.url)
            .finish()
    }
}
