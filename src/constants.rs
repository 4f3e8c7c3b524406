use once_cell::sync::Lazy;
use reqwest::Url;

// Endpoint constants
pub const DEFAULT_HOST_STR: &str = "https://api.groq.com/openai/v1";
pub const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

/// Parsed form of [`DEFAULT_HOST_STR`]. The only process-wide value the client keeps.
pub static DEFAULT_HOST: Lazy<Url> =
    Lazy::new(|| Url::parse(DEFAULT_HOST_STR).expect("default host is a valid URL"));

// Environment variables consulted when no API key is configured
pub const API_KEY_ENV_VARS: [&str; 2] = ["GROQ_API_KEY", "OPENAI_API_KEY"];

// SSE framing
pub const SSE_DATA_PREFIX: &[u8] = b"data: ";
pub const SSE_DONE_SENTINEL: &[u8] = b"[DONE]";

// Streaming constants
pub const DEFAULT_STREAM_BUFFER: usize = 32;
pub const MIN_STREAM_BUFFER: usize = 1;
pub const MAX_STREAM_BUFFER: usize = 4096;

// Request timeout bounds, only applied when a caller opts into a timeout
pub const MIN_REQUEST_TIMEOUT_S: f64 = 0.1;
pub const MAX_REQUEST_TIMEOUT_S: f64 = 3600.0;

// Parameter ranges
pub const TEMPERATURE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=2.0;
pub const TOP_P_RANGE: std::ops::RangeInclusive<f64> = 0.0..=1.0;
pub const PENALTY_RANGE: std::ops::RangeInclusive<f64> = -2.0..=2.0;
pub const MAX_STOP_SEQUENCES: usize = 4;

// Error messages
pub const STREAM_REQUEST_FAILED: &str = "Stream request failed";
