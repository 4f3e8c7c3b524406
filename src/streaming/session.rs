//! Streaming session driver
//!
//! One session per streaming call. It sends the request through a
//! [`Transport`], feeds every received byte chunk into a [`FrameExtractor`],
//! decodes each frame and forwards chunks over a bounded channel, so the
//! consumer controls the pace.

use crate::cancellation::{CancellationToken, TaskGuard};
use crate::constants::STREAM_REQUEST_FAILED;
use crate::errors::ClientError;
use crate::http::ErrorResponse;
use crate::http_client::{Transport, TransportRequest};
use crate::streaming::decoder::{ChunkDecoder, DecodeMode};
use crate::streaming::frame_extractor::FrameExtractor;
use crate::streaming::response::ChatCompletionStream;
use crate::streaming::types::{SessionState, SseFrame, StreamEvent};

use futures::StreamExt;
use reqwest::StatusCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// How `drive` stopped when no error was raised.
enum Outcome {
    Completed,
    Cancelled,
}

pub struct StreamingSession {
    transport: Arc<dyn Transport>,
    request: Option<TransportRequest>,
    extractor: FrameExtractor,
    decoder: ChunkDecoder,
    cancel_token: CancellationToken,
    state: SessionState,
}

impl StreamingSession {
    pub fn new(
        transport: Arc<dyn Transport>,
        request: TransportRequest,
        decode_mode: DecodeMode,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            transport,
            request: Some(request),
            extractor: FrameExtractor::new(),
            decoder: ChunkDecoder::new(decode_mode),
            cancel_token,
            state: SessionState::Idle,
        }
    }

    fn transition(&mut self, next: SessionState) {
        if !self.state.can_transition_to(next) {
            debug!(
                "ignoring stream session transition {:?} -> {:?}",
                self.state, next
            );
            return;
        }
        debug!("stream session {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Forwards an event unless the session is cancelled first. `false` means
    /// nobody will read it.
    async fn emit(&self, tx: &mpsc::Sender<StreamEvent>, event: StreamEvent) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => false,
            sent = tx.send(event) => sent.is_ok(),
        }
    }

    /// Runs the session to a terminal state and reports it.
    pub async fn run(mut self, tx: mpsc::Sender<StreamEvent>) -> SessionState {
        match self.drive(&tx).await {
            Ok(Outcome::Completed) => {
                self.transition(SessionState::Completed);
                self.emit(&tx, StreamEvent::End).await;
            }
            Ok(Outcome::Cancelled) => {
                debug!("stream session cancelled");
                self.transition(SessionState::Cancelled);
            }
            Err(err) if self.cancel_token.is_cancelled() => {
                debug!("suppressing error after cancellation: {}", err);
                self.transition(SessionState::Cancelled);
            }
            Err(err) => {
                self.transition(SessionState::Failed);
                self.emit(&tx, StreamEvent::Error(err)).await;
            }
        }
        self.state
    }

    async fn drive(&mut self, tx: &mpsc::Sender<StreamEvent>) -> Result<Outcome, ClientError> {
        let request = self
            .request
            .take()
            .ok_or_else(|| ClientError::Unexpected("stream session already ran".to_string()))?;
        let transport = Arc::clone(&self.transport);
        let token = self.cancel_token.clone();

        self.transition(SessionState::Sending);
        let sent = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = transport.send(request) => Some(result),
        };
        let response = match sent {
            None => return Ok(Outcome::Cancelled),
            Some(result) => result?,
        };

        self.transition(SessionState::HeadersReceived);
        let status = response.status;
        if StatusCode::from_u16(status).is_err() {
            return Err(ClientError::InvalidResponse(STREAM_REQUEST_FAILED.to_string()));
        }
        if status != 200 {
            let body = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                body = response.collect_body() => Some(body),
            };
            let Some(body) = body else {
                return Ok(Outcome::Cancelled);
            };
            let message = body
                .ok()
                .and_then(|bytes| ErrorResponse::message_from_body(&bytes))
                .unwrap_or_else(|| STREAM_REQUEST_FAILED.to_string());
            warn!("stream request failed with status {}: {}", status, message);
            return Err(ClientError::from_status(i64::from(status), message));
        }

        self.transition(SessionState::Streaming);
        let mut body = response.body;
        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                next = body.next() => Some(next),
            };
            let bytes = match next {
                None => return Ok(Outcome::Cancelled),
                Some(None) => {
                    debug!("stream body ended without sentinel");
                    return Ok(Outcome::Completed);
                }
                Some(Some(result)) => result?,
            };

            self.extractor.push(&bytes);
            while let Some(frame) = self.extractor.extract_next() {
                if token.is_cancelled() {
                    return Ok(Outcome::Cancelled);
                }
                let payload = match frame {
                    SseFrame::Done => return Ok(Outcome::Completed),
                    SseFrame::Data(payload) => payload,
                };
                if let Some(chunk) = self.decoder.decode(&payload)? {
                    if !self.emit(tx, StreamEvent::Chunk(chunk)).await {
                        return Ok(Outcome::Cancelled);
                    }
                }
            }
        }
    }
}

/// Starts a session on the current tokio runtime and hands back the consumer side.
///
/// The session runs on its own token. Cancelling `caller_token` cancels the
/// session, while dropping or cancelling the returned stream never touches
/// `caller_token`, so one token can be shared by many streams.
pub fn spawn_session(
    transport: Arc<dyn Transport>,
    request: TransportRequest,
    decode_mode: DecodeMode,
    buffer: usize,
    caller_token: CancellationToken,
) -> ChatCompletionStream {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    let session_token = CancellationToken::new();
    let session = StreamingSession::new(transport, request, decode_mode, session_token.clone());

    let handle = {
        let caller_token = caller_token.clone();
        let session_token = session_token.clone();
        tokio::spawn(async move {
            let run = session.run(tx);
            tokio::pin!(run);
            let state = tokio::select! {
                state = &mut run => state,
                _ = caller_token.cancelled() => {
                    session_token.cancel();
                    run.await
                }
            };
            debug!("stream session finished: {:?}", state);
        })
    };

    ChatCompletionStream::new(rx, TaskGuard::new(handle, session_token), caller_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HeaderMap;
    use crate::http_client::{body_channel, ByteStream, TransportResponse};
    use async_trait::async_trait;
    use bytes::Bytes;
    use reqwest::header::HeaderMap as ReqwestHeaderMap;
    use reqwest::Url;
    use std::sync::Mutex;

    /// Serves one canned response, split into the given body pieces.
    struct CannedTransport {
        status: u16,
        pieces: Mutex<Option<Vec<Result<Bytes, ClientError>>>>,
    }

    impl CannedTransport {
        fn new(status: u16, pieces: Vec<Result<Bytes, ClientError>>) -> Arc<Self> {
            Arc::new(Self {
                status,
                pieces: Mutex::new(Some(pieces)),
            })
        }

        fn ok(status: u16, body: &str) -> Arc<Self> {
            Self::new(status, vec![Ok(Bytes::copy_from_slice(body.as_bytes()))])
        }
    }

    #[async_trait]
    impl Transport for CannedTransport {
        async fn send(&self, _request: TransportRequest) -> Result<TransportResponse, ClientError> {
            let pieces = self.pieces.lock().unwrap().take().unwrap_or_default();
            let body: ByteStream = Box::pin(futures::stream::iter(pieces));
            Ok(TransportResponse::new(self.status, HeaderMap::new(), body))
        }
    }

    /// Never answers; lets tests cancel while the request is in flight.
    struct HangingTransport;

    #[async_trait]
    impl Transport for HangingTransport {
        async fn send(&self, _request: TransportRequest) -> Result<TransportResponse, ClientError> {
            futures::future::pending().await
        }
    }

    fn request() -> TransportRequest {
        TransportRequest {
            url: Url::parse("http://localhost/chat/completions").unwrap(),
            headers: ReqwestHeaderMap::new(),
            body: Bytes::from_static(b"{}"),
            timeout: None,
        }
    }

    fn chunk_line(content: &str) -> String {
        format!(
            "data: {{\"id\":\"c\",\"object\":\"chat.completion.chunk\",\"created\":1,\"model\":\"m\",\"choices\":[{{\"index\":0,\"delta\":{{\"content\":\"{}\"}},\"finish_reason\":null}}]}}\n\n",
            content
        )
    }

    async fn run_collect(
        transport: Arc<dyn Transport>,
        mode: DecodeMode,
    ) -> (SessionState, Vec<StreamEvent>) {
        let (tx, mut rx) = mpsc::channel(16);
        let session = StreamingSession::new(transport, request(), mode, CancellationToken::new());
        let state = session.run(tx).await;
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (state, events)
    }

    fn contents(events: &[StreamEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|event| match event {
                StreamEvent::Chunk(chunk) => chunk.content().map(str::to_string),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_sentinel_completes_session() {
        let body = format!("{}{}data: [DONE]\n\n", chunk_line("a"), chunk_line("b"));
        let (state, events) = run_collect(CannedTransport::ok(200, &body), DecodeMode::Lenient).await;

        assert_eq!(state, SessionState::Completed);
        assert_eq!(contents(&events), vec!["a", "b"]);
        assert!(matches!(events.last(), Some(StreamEvent::End)));
    }

    #[tokio::test]
    async fn test_frames_after_sentinel_are_ignored() {
        let body = format!("{}data: [DONE]\n\n{}", chunk_line("a"), chunk_line("late"));
        let (_, events) = run_collect(CannedTransport::ok(200, &body), DecodeMode::Lenient).await;
        assert_eq!(contents(&events), vec!["a"]);
    }

    #[tokio::test]
    async fn test_body_end_without_sentinel_is_success() {
        let (state, events) =
            run_collect(CannedTransport::ok(200, &chunk_line("only")), DecodeMode::Lenient).await;
        assert_eq!(state, SessionState::Completed);
        assert_eq!(contents(&events), vec!["only"]);
        assert!(matches!(events.last(), Some(StreamEvent::End)));
    }

    #[tokio::test]
    async fn test_malformed_frame_dropped_in_lenient_mode() {
        let body = format!("{}data: {{broken\n\n{}", chunk_line("a"), chunk_line("b"));
        let (state, events) = run_collect(CannedTransport::ok(200, &body), DecodeMode::Lenient).await;
        assert_eq!(state, SessionState::Completed);
        assert_eq!(contents(&events), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_malformed_frame_fails_in_strict_mode() {
        let body = format!("{}data: {{broken\n\n{}", chunk_line("a"), chunk_line("b"));
        let (state, events) = run_collect(CannedTransport::ok(200, &body), DecodeMode::Strict).await;
        assert_eq!(state, SessionState::Failed);
        assert_eq!(contents(&events), vec!["a"]);
        assert!(matches!(
            events.last(),
            Some(StreamEvent::Error(ClientError::StreamInvalidData(_)))
        ));
    }

    #[tokio::test]
    async fn test_error_status_uses_envelope_message() {
        let transport = CannedTransport::ok(
            401,
            r#"{"error":{"message":"Invalid API Key","type":"invalid_request_error"}}"#,
        );
        let (state, events) = run_collect(transport, DecodeMode::Lenient).await;
        assert_eq!(state, SessionState::Failed);
        match &events[..] {
            [StreamEvent::Error(err)] => {
                assert_eq!(err, &ClientError::AuthenticationFailed("Invalid API Key".to_string()))
            }
            other => panic!("unexpected events {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_status_without_envelope_uses_default_message() {
        let (_, events) =
            run_collect(CannedTransport::ok(503, "upstream down"), DecodeMode::Lenient).await;
        match &events[..] {
            [StreamEvent::Error(err)] => assert_eq!(
                err,
                &ClientError::Server {
                    status: 503,
                    message: STREAM_REQUEST_FAILED.to_string()
                }
            ),
            other => panic!("unexpected events {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_status_is_invalid_response() {
        let (state, events) = run_collect(CannedTransport::ok(1000, ""), DecodeMode::Lenient).await;
        assert_eq!(state, SessionState::Failed);
        assert!(matches!(
            &events[..],
            [StreamEvent::Error(ClientError::InvalidResponse(message))] if message == STREAM_REQUEST_FAILED
        ));
    }

    #[tokio::test]
    async fn test_transport_failure_mid_stream() {
        let transport = CannedTransport::new(
            200,
            vec![
                Ok(Bytes::from(chunk_line("a"))),
                Err(ClientError::Network("connection reset".to_string())),
            ],
        );
        let (state, events) = run_collect(transport, DecodeMode::Lenient).await;
        assert_eq!(state, SessionState::Failed);
        assert_eq!(contents(&events), vec!["a"]);
        assert!(matches!(
            events.last(),
            Some(StreamEvent::Error(ClientError::Network(_)))
        ));
    }

    #[tokio::test]
    async fn test_cancel_while_sending() {
        let token = CancellationToken::new();
        let (tx, mut rx) = mpsc::channel(4);
        let session = StreamingSession::new(
            Arc::new(HangingTransport),
            request(),
            DecodeMode::Lenient,
            token.clone(),
        );
        let run = tokio::spawn(session.run(tx));

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        token.cancel();

        assert_eq!(run.await.unwrap(), SessionState::Cancelled);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_cancel_mid_stream_surfaces_no_error() {
        struct ChannelTransport(Mutex<Option<ByteStream>>);

        #[async_trait]
        impl Transport for ChannelTransport {
            async fn send(&self, _: TransportRequest) -> Result<TransportResponse, ClientError> {
                let body = self.0.lock().unwrap().take().expect("one request");
                Ok(TransportResponse::new(200, HeaderMap::new(), body))
            }
        }

        let (sender, body) = body_channel(4);
        let token = CancellationToken::new();
        let (tx, mut rx) = mpsc::channel(4);
        let session = StreamingSession::new(
            Arc::new(ChannelTransport(Mutex::new(Some(body)))),
            request(),
            DecodeMode::Lenient,
            token.clone(),
        );
        let run = tokio::spawn(session.run(tx));

        assert!(sender.send_bytes(chunk_line("first")).await);
        match rx.recv().await {
            Some(StreamEvent::Chunk(chunk)) => assert_eq!(chunk.content(), Some("first")),
            other => panic!("unexpected {:?}", other),
        }

        token.cancel();
        assert_eq!(run.await.unwrap(), SessionState::Cancelled);
        assert!(sender.is_closed(), "body must be dropped on cancel");
        assert!(rx.recv().await.is_none());
    }

    fn spawn_canned(token: &CancellationToken, body: &str) -> ChatCompletionStream {
        spawn_session(
            CannedTransport::ok(200, body),
            request(),
            DecodeMode::Lenient,
            4,
            token.clone(),
        )
    }

    #[tokio::test]
    async fn test_shared_token_survives_finished_stream() {
        let token = CancellationToken::new();
        let body = format!("{}data: [DONE]\n\n", chunk_line("a"));

        let first: Vec<_> = spawn_canned(&token, &body).collect().await;
        assert_eq!(first.len(), 1);
        assert!(!token.is_cancelled());

        let second: Vec<_> = spawn_canned(&token, &body).collect().await;
        assert_eq!(second.len(), 1);
        assert!(second[0].is_ok());
    }

    #[tokio::test]
    async fn test_stream_cancel_leaves_sibling_running() {
        let token = CancellationToken::new();
        let body = format!("{}{}data: [DONE]\n\n", chunk_line("a"), chunk_line("b"));

        let cancelled = spawn_canned(&token, &body);
        let sibling = spawn_canned(&token, &body);
        cancelled.cancel();
        drop(cancelled);

        assert!(!token.is_cancelled());
        assert_eq!(sibling.collect_content().await.unwrap(), "ab");
    }

    #[tokio::test]
    async fn test_caller_cancel_reaches_every_stream() {
        let token = CancellationToken::new();
        let hanging = |token: &CancellationToken| {
            spawn_session(
                Arc::new(HangingTransport),
                request(),
                DecodeMode::Lenient,
                4,
                token.clone(),
            )
        };
        let mut first = hanging(&token);
        let mut second = hanging(&token);

        token.cancel();
        let ended = tokio::time::timeout(std::time::Duration::from_secs(1), async {
            (first.next().await.is_none(), second.next().await.is_none())
        })
        .await
        .expect("cancelled streams end promptly");
        assert_eq!(ended, (true, true));
        assert!(first.is_cancelled() && second.is_cancelled());
    }
}
