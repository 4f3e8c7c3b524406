use crate::config::ClientConfig;
use crate::constants::*;
use crate::errors::ClientError;
use crate::http::*;
use crate::http_client::*;

use reqwest::header::{HeaderMap as ReqwestHeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Url;
use std::sync::Arc;
use tracing::{debug, warn};

/// Client for an OpenAI-compatible chat-completion API.
///
/// Holds its configuration and a [`Transport`]. Streaming calls live on
/// [`crate::StreamingClientExt`].
///
/// # Example
///
/// ```rust,no_run
/// use groq_client_core::{ClientConfig, ChatCompletionRequest, GroqClient, Message};
/// use groq_client_core::models::LLAMA_3_3_70B_VERSATILE;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = GroqClient::new(ClientConfig::new().with_api_key("gsk_..."))?;
///
/// let request = ChatCompletionRequest::new(
///     LLAMA_3_3_70B_VERSATILE,
///     vec![Message::user("Explain the importance of fast language models")],
/// );
/// let response = client.create_chat_completion(&request).await?;
/// println!("{}", response.content().unwrap_or_default());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct GroqClient {
    api_key: String,
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl GroqClient {
    /// Builds a client on a reqwest transport using the configured delivery mode.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let transport = Arc::new(HttpTransport::new(config.delivery)?);
        Self::with_transport(config, transport)
    }

    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ClientError> {
        config.validate()?;
        let api_key = Self::get_api_key(config.api_key.clone())?;
        debug!("created client for host {}", config.host);
        Ok(Self {
            api_key,
            config,
            transport,
        })
    }

    pub fn get_api_key(api_key: Option<String>) -> Result<String, ClientError> {
        if let Some(key) = api_key {
            return Ok(key);
        }
        for var in API_KEY_ENV_VARS {
            if let Ok(key) = std::env::var(var) {
                if !key.is_empty() {
                    return Ok(key);
                }
            }
        }
        Err(ClientError::AuthenticationFailed(format!(
            "API key not provided and none of the environment variables {} is set",
            API_KEY_ENV_VARS.join(", ")
        )))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    /// `{host}/chat/completions`, keeping any path the host already has.
    pub fn endpoint_url(&self) -> Result<Url, ClientError> {
        let mut url = self.config.host.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ClientError::InvalidUrl(format!("{} cannot be used as a base URL", self.config.host))
            })?
            .pop_if_empty()
            .extend(CHAT_COMPLETIONS_PATH.trim_start_matches('/').split('/'));
        Ok(url)
    }

    /// Validates and serializes `request` into a POST for the chat endpoint.
    pub fn build_transport_request(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<TransportRequest, ClientError> {
        request.validate()?;

        let body = serde_json::to_vec(request)
            .map_err(|e| ClientError::InvalidRequest(format!("Failed to serialize request: {}", e)))?;

        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| {
                ClientError::AuthenticationFailed(
                    "API key contains characters not allowed in a header".to_string(),
                )
            })?;
        authorization.set_sensitive(true);

        let mut headers = ReqwestHeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, authorization);

        Ok(TransportRequest {
            url: self.endpoint_url()?,
            headers,
            body: body.into(),
            timeout: self.config.timeout()?,
        })
    }

    /// Sends `request` and waits for the complete response.
    pub async fn create_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ClientError> {
        let transport_request = self.build_transport_request(request)?;
        let response = self.transport.send(transport_request).await?;
        let status = response.status;
        let headers = response.headers.clone();
        let body = response.collect_body().await?;

        if !(200..300).contains(&status) {
            let message = ErrorResponse::message_from_body(&body)
                .unwrap_or_else(|| String::from_utf8_lossy(&body).into_owned());
            warn!("chat completion failed with status {}: {}", status, message);
            return Err(ClientError::from_status(i64::from(status), message));
        }

        let mut completion: ChatCompletionResponse = serde_json::from_slice(&body).map_err(|e| {
            ClientError::InvalidResponse(format!("Failed to decode chat completion: {}", e))
        })?;
        completion.response_headers = headers;
        Ok(completion)
    }
}

impl std::fmt::Debug for GroqClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
