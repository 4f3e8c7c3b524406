//! Client extension for streaming functionality
//!
//! Adds the streaming entry points to [`GroqClient`] without cluttering the
//! one-shot implementation.

use crate::cancellation::CancellationToken;
use crate::client::GroqClient;
use crate::errors::ClientError;
use crate::http::ChatCompletionRequest;
use crate::streaming::response::ChatCompletionStream;
use crate::streaming::session::spawn_session;
use async_trait::async_trait;

/// Extension trait to add streaming chat completions to [`GroqClient`]
#[async_trait]
pub trait StreamingClientExt {
    /// Starts a streamed chat completion.
    ///
    /// `stream` is forced on. Validation, URL and serialization failures are
    /// returned here; everything after the request is sent arrives through the
    /// returned stream.
    async fn stream_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionStream, ClientError> {
        self.stream_chat_completion_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Same as [`StreamingClientExt::stream_chat_completion`], observing a
    /// caller-owned cancellation token.
    async fn stream_chat_completion_with_cancel(
        &self,
        request: &ChatCompletionRequest,
        cancel_token: CancellationToken,
    ) -> Result<ChatCompletionStream, ClientError>;
}

#[async_trait]
impl StreamingClientExt for GroqClient {
    async fn stream_chat_completion_with_cancel(
        &self,
        request: &ChatCompletionRequest,
        cancel_token: CancellationToken,
    ) -> Result<ChatCompletionStream, ClientError> {
        let mut request = request.clone();
        request.stream = Some(true);
        let transport_request = self.build_transport_request(&request)?;

        Ok(spawn_session(
            self.transport(),
            transport_request,
            self.config().decode_mode(),
            self.config().stream_buffer,
            cancel_token,
        ))
    }
}
