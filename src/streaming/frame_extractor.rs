use bytes::{Bytes, BytesMut};
use std::str::from_utf8;
use tracing::trace;

use super::types::SseFrame;
use crate::constants::{SSE_DATA_PREFIX, SSE_DONE_SENTINEL};

const LOGIFY_MAX_CHARS: usize = 100;
fn logify(bytes: &[u8]) -> String {
    let stringified = from_utf8(bytes).unwrap_or("<bad utf8>");
    stringified.chars().take(LOGIFY_MAX_CHARS).collect()
}

fn trim_whitespace(bytes: &[u8]) -> (usize, usize) {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |pos| pos + 1);
    (start, end)
}

/// Incremental SSE `data:` line extractor.
///
/// Bytes are appended with [`FrameExtractor::push`]; [`FrameExtractor::extract_next`]
/// then drains complete lines one frame at a time. A line is only looked at once
/// its `\n` terminator has arrived, so a record split across reads is never
/// parsed early.
#[derive(Debug, Default)]
pub struct FrameExtractor {
    /// unprocessed bytes; after a full drain this is empty or one unterminated line
    buffer: BytesMut,
    /// prefix of `buffer` already known to contain no newline
    scanned: usize,
}

impl FrameExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        trace!("buffering {} bytes: {:?}", bytes.len(), logify(bytes));
        self.buffer.extend_from_slice(bytes);
    }

    /// Bytes waiting for their line terminator.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns the next complete frame, or `None` when only a partial line (or
    /// nothing) is left.
    pub fn extract_next(&mut self) -> Option<SseFrame> {
        loop {
            let newline = match self.buffer[self.scanned..].iter().position(|&b| b == b'\n') {
                Some(offset) => self.scanned + offset,
                None => {
                    self.scanned = self.buffer.len();
                    return None;
                }
            };

            let line = self.buffer.split_to(newline + 1).freeze();
            self.scanned = 0;

            if let Some(frame) = Self::parse_line(line.slice(..newline)) {
                return Some(frame);
            }
        }
    }

    fn parse_line(mut line: Bytes) -> Option<SseFrame> {
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }

        if !line.starts_with(SSE_DATA_PREFIX) {
            if !line.is_empty() {
                trace!("skipping non-data line: {:?}", logify(&line));
            }
            return None;
        }

        let payload = line.slice(SSE_DATA_PREFIX.len()..);
        let (start, end) = trim_whitespace(&payload);
        let payload = payload.slice(start..end);

        if payload.is_empty() {
            return None;
        }
        if payload.as_ref() == SSE_DONE_SENTINEL {
            trace!("received stream sentinel");
            return Some(SseFrame::Done);
        }

        trace!("extracted frame: {:?}", logify(&payload));
        Some(SseFrame::Data(payload))
    }

    /// Drains every frame currently available.
    pub fn drain(&mut self) -> Vec<SseFrame> {
        std::iter::from_fn(|| self.extract_next()).collect()
    }
}
