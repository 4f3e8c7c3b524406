//! HTTP transport abstraction.
//!
//! The streaming session only needs "send a request, then pull the next
//! available bytes until end or error". Both delivery shapes are expressed
//! through [`Transport`]: a live byte stream, or a body that is only handed
//! over once it has been fully received (delivered as one chunk, then end).

use crate::errors::ClientError;
use crate::http::HeaderMap;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use reqwest::header::HeaderMap as ReqwestHeaderMap;
use reqwest::{Client, Url};
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Response body as a sequence of byte chunks. The stream ending is end-of-data.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ClientError>> + Send>>;

/// A fully built POST request, ready for a transport.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub url: Url,
    pub headers: ReqwestHeaderMap,
    pub body: Bytes,
    pub timeout: Option<Duration>,
}

/// Response head plus a body that is pulled incrementally.
pub struct TransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: ByteStream,
}

impl TransportResponse {
    pub fn new(status: u16, headers: HeaderMap, body: ByteStream) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Drains the whole body into memory.
    pub async fn collect_body(mut self) -> Result<Bytes, ClientError> {
        let mut buffer = BytesMut::new();
        while let Some(chunk) = self.body.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer.freeze())
    }
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// The HTTP capability the client is built on.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request and resolves once the response head is available.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, ClientError>;
}

/// How [`HttpTransport`] hands the response body to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// Bytes are forwarded as they arrive from the connection.
    #[default]
    Live,
    /// The body is read to completion first, then delivered as a single chunk.
    Buffered,
}

/// reqwest-backed transport.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    delivery: DeliveryMode,
}

impl HttpTransport {
    pub fn new(delivery: DeliveryMode) -> Result<Self, ClientError> {
        Ok(Self::with_client(Self::get_http_client()?, delivery))
    }

    /// Wraps an existing reqwest client, e.g. one shared with the rest of an application.
    pub fn with_client(client: Client, delivery: DeliveryMode) -> Self {
        Self { client, delivery }
    }

    pub fn delivery(&self) -> DeliveryMode {
        self.delivery
    }

    pub fn get_http_client() -> Result<Client, ClientError> {
        Client::builder()
            .tcp_nodelay(true)
            .user_agent(concat!("groq-client-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Network(format!("Failed to create HTTP client: {}", e)))
    }
}

fn headers_to_map(headers: &ReqwestHeaderMap) -> HeaderMap {
    let mut headers_map = HeaderMap::new();
    for (name, value) in headers.iter() {
        headers_map.insert(
            name.as_str().to_string(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        );
    }
    headers_map
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, ClientError> {
        let mut request_builder = self
            .client
            .post(request.url)
            .headers(request.headers)
            .body(request.body);
        if let Some(timeout) = request.timeout {
            request_builder = request_builder.timeout(timeout);
        }

        let response = request_builder.send().await?;
        let status = response.status().as_u16();
        let headers = headers_to_map(response.headers());

        let body: ByteStream = match self.delivery {
            DeliveryMode::Live => Box::pin(
                response
                    .bytes_stream()
                    .map(|chunk| chunk.map_err(ClientError::from)),
            ),
            DeliveryMode::Buffered => {
                let bytes = response.bytes().await?;
                tracing::trace!("buffered response body of {} bytes", bytes.len());
                let chunks = (!bytes.is_empty()).then_some(Ok::<Bytes, ClientError>(bytes));
                Box::pin(futures::stream::iter(chunks))
            }
        };

        Ok(TransportResponse::new(status, headers, body))
    }
}

/// Producer half of a channel-backed body.
///
/// Lets a push-style transport (one that is handed bytes by the platform)
/// feed the session without callbacks. Dropping the sender signals end-of-data.
#[derive(Clone)]
pub struct BodySender {
    tx: mpsc::Sender<Result<Bytes, ClientError>>,
}

impl BodySender {
    /// Pushes the next chunk. Returns `false` once the session has gone away.
    pub async fn send_bytes(&self, bytes: impl Into<Bytes>) -> bool {
        self.tx.send(Ok(bytes.into())).await.is_ok()
    }

    /// Ends the body with a transport failure.
    pub async fn fail(self, error: ClientError) {
        let _ = self.tx.send(Err(error)).await;
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Creates a bounded channel whose receiving side is a [`ByteStream`].
pub fn body_channel(capacity: usize) -> (BodySender, ByteStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (BodySender { tx }, Box::pin(ReceiverStream::new(rx)))
}
