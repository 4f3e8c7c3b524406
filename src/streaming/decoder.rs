use crate::errors::ClientError;
use crate::http::ChatCompletionChunk;
use std::str::from_utf8;
use tracing::debug;

/// What to do with a `data:` frame that is not a valid chunk.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DecodeMode {
    /// Drop the frame and keep streaming.
    #[default]
    Lenient,
    /// End the stream with [`ClientError::StreamInvalidData`].
    Strict,
}

/// Turns extracted frames into typed chunks.
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    mode: DecodeMode,
    dropped: usize,
}

impl ChunkDecoder {
    pub fn new(mode: DecodeMode) -> Self {
        Self { mode, dropped: 0 }
    }

    pub fn mode(&self) -> DecodeMode {
        self.mode
    }

    /// Number of malformed frames skipped so far in lenient mode.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// `Ok(None)` means the frame was malformed and dropped.
    pub fn decode(&mut self, frame: &[u8]) -> Result<Option<ChatCompletionChunk>, ClientError> {
        match serde_json::from_slice::<ChatCompletionChunk>(frame) {
            Ok(chunk) => Ok(Some(chunk)),
            Err(err) => match self.mode {
                DecodeMode::Lenient => {
                    self.dropped += 1;
                    debug!(
                        "dropping malformed stream frame ({} dropped so far): {}",
                        self.dropped, err
                    );
                    Ok(None)
                }
                DecodeMode::Strict => Err(ClientError::StreamInvalidData(format!(
                    "{}: {}",
                    err,
                    from_utf8(frame).unwrap_or("<bad utf8>")
                ))),
            },
        }
    }
}
