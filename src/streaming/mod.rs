pub mod client_ext;
pub mod decoder;
pub mod frame_extractor;
pub mod response;
pub mod session;
pub mod types;

pub use client_ext::StreamingClientExt;
pub use decoder::{ChunkDecoder, DecodeMode};
pub use frame_extractor::FrameExtractor;
pub use response::ChatCompletionStream;
pub use session::{spawn_session, StreamingSession};
pub use types::*;
