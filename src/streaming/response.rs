use crate::cancellation::{CancellationToken, TaskGuard};
use crate::errors::ClientError;
use crate::http::ChatCompletionChunk;
use crate::streaming::types::StreamEvent;

use futures::{ready, Stream, StreamExt};
use pin_project::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Consumer side of a streaming chat completion.
///
/// Yields chunks in arrival order, then ends. A failure is yielded once as the
/// final item. Cancelling (or dropping the stream) stops the background task
/// and ends the stream without an error.
#[pin_project]
pub struct ChatCompletionStream {
    #[pin]
    events: ReceiverStream<StreamEvent>,
    guard: TaskGuard,
    caller_token: CancellationToken,
    finished: bool,
}

impl ChatCompletionStream {
    /// `guard` owns the session's own token; `caller_token` is only observed.
    pub(crate) fn new(
        rx: mpsc::Receiver<StreamEvent>,
        guard: TaskGuard,
        caller_token: CancellationToken,
    ) -> Self {
        Self {
            events: ReceiverStream::new(rx),
            guard,
            caller_token,
            finished: false,
        }
    }

    /// Requests cancellation of this stream only. Chunks still buffered in the
    /// channel are discarded.
    pub fn cancel(&self) {
        self.guard.token().cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.guard.token().is_cancelled() || self.caller_token.is_cancelled()
    }

    /// A handle that cancels this stream alone from elsewhere, e.g. another task.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.guard.token().clone()
    }

    /// Concatenates the delta content of every remaining chunk.
    pub async fn collect_content(mut self) -> Result<String, ClientError> {
        let mut content = String::new();
        while let Some(chunk) = self.next().await {
            if let Some(piece) = chunk?.content() {
                content.push_str(piece);
            }
        }
        Ok(content)
    }
}

impl Stream for ChatCompletionStream {
    type Item = Result<ChatCompletionChunk, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if *this.finished {
            return Poll::Ready(None);
        }
        let cancelled = |guard: &TaskGuard, caller: &CancellationToken| {
            guard.token().is_cancelled() || caller.is_cancelled()
        };
        if cancelled(&*this.guard, &*this.caller_token) {
            *this.finished = true;
            return Poll::Ready(None);
        }

        let item = match ready!(this.events.poll_next(cx)) {
            Some(StreamEvent::Chunk(chunk)) => return Poll::Ready(Some(Ok(chunk))),
            Some(StreamEvent::Error(err)) => Some(Err(err)),
            Some(StreamEvent::End) => None,
            None if cancelled(&*this.guard, &*this.caller_token) => None,
            None => Some(Err(ClientError::StreamUnexpectedEnd(
                "stream task ended before signalling completion".to_string(),
            ))),
        };
        *this.finished = true;
        Poll::Ready(item)
    }
}

impl std::fmt::Debug for ChatCompletionStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionStream")
            .field("cancelled", &self.is_cancelled())
            .field("task_finished", &self.guard.is_finished())
            .field("finished", &self.finished)
            .finish()
    }
}
