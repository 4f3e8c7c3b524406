use crate::constants::*;
use crate::errors::ClientError;
use crate::http_client::DeliveryMode;
use crate::streaming::DecodeMode;

use reqwest::Url;
use std::time::Duration;

/// Construction-time settings for [`crate::GroqClient`].
///
/// ```rust
/// use groq_client_core::{ClientConfig, DeliveryMode};
///
/// let config = ClientConfig::new()
///     .with_api_key("gsk_example")
///     .with_timeout_s(30.0)
///     .with_delivery(DeliveryMode::Buffered);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// Bearer token. When unset, the `GROQ_API_KEY` and `OPENAI_API_KEY`
    /// environment variables are consulted in that order.
    pub api_key: Option<String>,
    pub host: Url,
    /// Per-request timeout handed to the transport. No timeout when `None`.
    pub timeout_s: Option<f64>,
    pub strict_decoding: bool,
    /// Capacity of the channel between the stream task and the consumer.
    pub stream_buffer: usize,
    pub delivery: DeliveryMode,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            host: DEFAULT_HOST.clone(),
            timeout_s: None,
            strict_decoding: false,
            stream_buffer: DEFAULT_STREAM_BUFFER,
            delivery: DeliveryMode::default(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_host(mut self, host: Url) -> Self {
        self.host = host;
        self
    }

    /// Parses and sets the host, e.g. `http://127.0.0.1:8080/openai/v1`.
    pub fn with_host_str(mut self, host: &str) -> Result<Self, ClientError> {
        self.host = Url::parse(host)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", host, e)))?;
        Ok(self)
    }

    pub fn with_timeout_s(mut self, timeout_s: f64) -> Self {
        self.timeout_s = Some(timeout_s);
        self
    }

    pub fn with_strict_decoding(mut self, strict: bool) -> Self {
        self.strict_decoding = strict;
        self
    }

    pub fn with_stream_buffer(mut self, capacity: usize) -> Self {
        self.stream_buffer = capacity;
        self
    }

    pub fn with_delivery(mut self, delivery: DeliveryMode) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn decode_mode(&self) -> DecodeMode {
        if self.strict_decoding {
            DecodeMode::Strict
        } else {
            DecodeMode::Lenient
        }
    }

    pub fn validate_and_get_timeout_duration(timeout_s: f64) -> Result<Duration, ClientError> {
        if !(MIN_REQUEST_TIMEOUT_S..=MAX_REQUEST_TIMEOUT_S).contains(&timeout_s) {
            return Err(ClientError::InvalidRequest(format!(
                "Timeout {:.3}s is outside the allowed range [{:.3}s, {:.3}s].",
                timeout_s, MIN_REQUEST_TIMEOUT_S, MAX_REQUEST_TIMEOUT_S
            )));
        }
        Ok(Duration::from_secs_f64(timeout_s))
    }

    pub fn timeout(&self) -> Result<Option<Duration>, ClientError> {
        self.timeout_s
            .map(Self::validate_and_get_timeout_duration)
            .transpose()
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        self.timeout()?;
        if !(MIN_STREAM_BUFFER..=MAX_STREAM_BUFFER).contains(&self.stream_buffer) {
            return Err(ClientError::InvalidRequest(format!(
                "stream_buffer must be between {} and {}, got {}",
                MIN_STREAM_BUFFER, MAX_STREAM_BUFFER, self.stream_buffer
            )));
        }
        match self.host.scheme() {
            "http" | "https" if !self.host.cannot_be_a_base() => Ok(()),
            _ => Err(ClientError::InvalidUrl(format!(
                "host must be an http(s) base URL, got {}",
                self.host
            ))),
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host.as_str())
            .field("timeout_s", &self.timeout_s)
            .field("strict_decoding", &self.strict_decoding)
            .field("stream_buffer", &self.stream_buffer)
            .field("delivery", &self.delivery)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.host.as_str(), "https://api.groq.com/openai/v1");
        assert_eq!(config.stream_buffer, DEFAULT_STREAM_BUFFER);
        assert_eq!(config.decode_mode(), DecodeMode::Lenient);
        assert_eq!(config.timeout().unwrap(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_timeout_bounds() {
        let config = ClientConfig::new().with_timeout_s(0.01);
        assert!(matches!(config.validate(), Err(ClientError::InvalidRequest(_))));

        let config = ClientConfig::new().with_timeout_s(2.5);
        assert_eq!(config.timeout().unwrap(), Some(Duration::from_millis(2500)));
    }

    #[test]
    fn test_stream_buffer_bounds() {
        assert!(ClientConfig::new().with_stream_buffer(0).validate().is_err());
        assert!(ClientConfig::new().with_stream_buffer(1).validate().is_ok());
        assert!(ClientConfig::new()
            .with_stream_buffer(MAX_STREAM_BUFFER + 1)
            .validate()
            .is_err());
    }

    #[test]
    fn test_host_must_be_http() {
        let config = ClientConfig::new().with_host_str("ftp://example.com").unwrap();
        assert!(matches!(config.validate(), Err(ClientError::InvalidUrl(_))));
        assert!(matches!(
            ClientConfig::new().with_host_str("not a url"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ClientConfig::new().with_api_key("gsk_secret");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("gsk_secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
