pub mod cancellation;
pub mod client;
pub mod config;
pub mod constants;
pub mod errors;
pub mod http;
pub mod http_client;
pub mod json_value;
pub mod models;
pub mod streaming;

pub use cancellation::CancellationToken;
pub use client::GroqClient;
pub use config::ClientConfig;
pub use constants::*;
pub use errors::{ClientError, ValidationKind};
pub use http::*;
pub use http_client::{
    body_channel, BodySender, ByteStream, DeliveryMode, HttpTransport, Transport,
    TransportRequest, TransportResponse,
};
pub use json_value::JsonValue;
pub use streaming::{ChatCompletionStream, DecodeMode, StreamingClientExt};
