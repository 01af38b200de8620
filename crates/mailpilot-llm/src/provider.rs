//! OpenAI-compatible chat provider.
//!
//! Works against any endpoint that speaks the OpenAI chat-completion
//! format by pointing `base_url` elsewhere. The API key is resolved from
//! the environment variable named in the config, so it never sits in the
//! config file itself.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::StatusCode;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use mailpilot_types::config::LlmConfig;

use crate::error::{ProviderError, Result};
use crate::sse::parse_sse_line;
use crate::types::{ChatRequest, ChatResponse, StreamChunk};

/// Buffered capacity for streamed chunks before backpressure.
const STREAM_CHANNEL_CAPACITY: usize = 64;

/// The seam the server's chat route programs against.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Run a whole completion and return the reply.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse>;

    /// Run a streaming completion; chunks arrive on the returned
    /// receiver, ending with [`StreamChunk::Done`].
    async fn stream(&self, request: &ChatRequest) -> Result<mpsc::Receiver<StreamChunk>>;
}

/// Chat provider over the OpenAI-compatible completion API.
pub struct OpenAiCompatProvider {
    config: LlmConfig,
    http: reqwest::Client,
    api_key: Option<String>,
}

impl OpenAiCompatProvider {
    /// Create a provider; the API key is read from the configured env
    /// var at request time.
    pub fn new(config: LlmConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            api_key: None,
        }
    }

    /// Create a provider with an explicit API key (used by tests).
    pub fn with_api_key(config: LlmConfig, api_key: impl Into<String>) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            api_key: Some(api_key.into()),
        }
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = &self.api_key {
            return Ok(key.clone());
        }
        std::env::var(&self.config.api_key_env).map_err(|_| {
            ProviderError::NotConfigured(format!("set {} env var", self.config.api_key_env))
        })
    }

    async fn post(&self, request: &ChatRequest) -> Result<reqwest::Response> {
        let api_key = self.resolve_api_key()?;
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            stream = request.stream,
            "sending chat completion request"
        );

        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::AuthFailed(body));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::RequestFailed(format!(
                "status {status}: {body}"
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatProvider {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let mut request = request.clone();
        request.stream = false;
        let response = self.post(&request).await?;
        Ok(response.json().await?)
    }

    async fn stream(&self, request: &ChatRequest) -> Result<mpsc::Receiver<StreamChunk>> {
        let mut request = request.clone();
        request.stream = true;
        let response = self.post(&request).await?;

        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            let mut body = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(piece) = body.next().await {
                let piece = match piece {
                    Ok(piece) => piece,
                    Err(e) => {
                        warn!(error = %e, "chat stream transport error");
                        break;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&piece));

                // Emit every complete line, keep the partial tail.
                while let Some(newline) = buffer.find('\n') {
                    let line = buffer[..newline].to_owned();
                    buffer.drain(..=newline);
                    match parse_sse_line(&line) {
                        Ok(Some(chunk)) => {
                            let done = chunk == StreamChunk::Done;
                            if tx.send(chunk).await.is_err() || done {
                                return;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            warn!(error = %e, "dropping unparseable stream line");
                        }
                    }
                }
            }
            // Transport ended without a sentinel; close the stream cleanly.
            let _ = tx.send(StreamChunk::Done).await;
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> LlmConfig {
        LlmConfig {
            base_url: server.uri(),
            api_key_env: "MAILPILOT_TEST_UNSET_KEY".into(),
            model: "gpt-4o-mini".into(),
        }
    }

    fn request() -> ChatRequest {
        ChatRequest::new("gpt-4o-mini", vec![ChatMessage::user("Any new mail?")])
    }

    #[tokio::test]
    async fn complete_returns_reply_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "Two new messages."}}],
            })))
            .mount(&server)
            .await;

        let provider = OpenAiCompatProvider::with_api_key(config(&server), "test-key");
        let response = provider.complete(&request()).await.unwrap();
        assert_eq!(response.text(), Some("Two new messages."));
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let provider = OpenAiCompatProvider::with_api_key(config(&server), "test-key");
        let result = provider.complete(&request()).await;
        assert!(matches!(result, Err(ProviderError::AuthFailed(_))));
    }

    #[tokio::test]
    async fn missing_api_key_is_not_configured() {
        let server = MockServer::start().await;
        let provider = OpenAiCompatProvider::new(config(&server));
        let result = provider.complete(&request()).await;
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }

    #[tokio::test]
    async fn stream_yields_deltas_then_done() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Two \"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"new.\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(body, "text/event-stream"),
            )
            .mount(&server)
            .await;

        let provider = OpenAiCompatProvider::with_api_key(config(&server), "test-key");
        let mut rx = provider.stream(&request()).await.unwrap();

        let mut chunks = Vec::new();
        while let Some(chunk) = rx.recv().await {
            chunks.push(chunk);
        }
        assert_eq!(
            chunks,
            vec![
                StreamChunk::TextDelta("Two ".into()),
                StreamChunk::TextDelta("new.".into()),
                StreamChunk::Done,
            ]
        );
    }

    #[tokio::test]
    async fn stream_without_sentinel_still_closes() {
        let server = MockServer::start().await;
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n\n";
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(body, "text/event-stream"),
            )
            .mount(&server)
            .await;

        let provider = OpenAiCompatProvider::with_api_key(config(&server), "test-key");
        let mut rx = provider.stream(&request()).await.unwrap();

        assert_eq!(
            rx.recv().await,
            Some(StreamChunk::TextDelta("partial".into()))
        );
        assert_eq!(rx.recv().await, Some(StreamChunk::Done));
        assert_eq!(rx.recv().await, None);
    }
}
