use crate::errors::ClientError;
use crate::http::ChatCompletionChunk;
use bytes::Bytes;

/// Messages sent from the background streaming task to the consumer.
#[derive(Debug)]
pub enum StreamEvent {
    /// A decoded chunk, in arrival order
    Chunk(ChatCompletionChunk),
    /// Terminal failure; nothing follows it
    Error(ClientError),
    /// Stream finished successfully (sentinel seen or body ended)
    End,
}

/// One complete `data:` record pulled out of the byte buffer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SseFrame {
    /// Payload with the `data: ` prefix and surrounding whitespace removed
    Data(Bytes),
    /// The `[DONE]` sentinel
    Done,
}

/// Lifecycle of one streaming call.
///
/// `Idle -> Sending -> HeadersReceived -> Streaming -> {Completed | Failed | Cancelled}`,
/// with `Cancelled` reachable from any in-flight state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionState {
    Idle,
    Sending,
    HeadersReceived,
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Failed | SessionState::Cancelled
        )
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Idle, Sending) => true,
            (Sending, HeadersReceived) => true,
            (HeadersReceived, Streaming) => true,
            (Streaming, Completed) => true,
            (Sending | HeadersReceived | Streaming, Failed) => true,
            (Sending | HeadersReceived | Streaming, Cancelled) => true,
            _ => false,
        }
    }
}
