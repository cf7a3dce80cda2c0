//! OpenAI-compatible chat completions adapter (DeepSeek by default).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::error::{ErrorContext, ProviderError};
use super::pricing::chat_cost;
use super::types::*;

// =============================================================================
// TRAIT
// =============================================================================

/// Trait for chat completion providers.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError>;

    /// Stream the completion, handing each content delta to `on_delta` as it
    /// arrives. Returns the accumulated response.
    async fn chat_stream(
        &self,
        req: &ChatRequest,
        on_delta: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<ChatResponse, ProviderError>;
}

// =============================================================================
// ADAPTER
// =============================================================================

const PROVIDER: &str = "deepseek";

pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Maximum allowed response body length (1MB).
const MAX_RESPONSE_LEN: usize = 1_024 * 1_024;

/// Maximum allowed input characters.
const MAX_INPUT_CHARS: usize = 200_000;

#[derive(Debug, Clone)]
pub struct CompletionAdapter {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl CompletionAdapter {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_config(api_key, DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    /// Reads `TSAP_API_KEY` (falling back to `DEEPSEEK_API_KEY`),
    /// `TSAP_BASE_URL` and `TSAP_TIMEOUT_SECONDS`.
    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = std::env::var("TSAP_API_KEY")
            .or_else(|_| std::env::var("DEEPSEEK_API_KEY"))
            .map_err(|_| ProviderError::config("TSAP_API_KEY (or DEEPSEEK_API_KEY) not set"))?;

        let base_url = std::env::var("TSAP_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());

        let timeout = std::env::var("TSAP_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        Self::with_config(api_key, base_url, timeout)
    }

    pub fn with_config(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let auth_value = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| ProviderError::config("Invalid API key format"))?;
        headers.insert(AUTHORIZATION, auth_value);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .gzip(true)
            .build()
            .map_err(|e| ProviderError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// Client-side timeouts become `Timeout`; other transport errors stay `Http`.
    fn transport_error(&self, err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout(self.timeout, None)
        } else {
            ProviderError::Http(err)
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn extract_request_id(headers: &HeaderMap) -> Option<String> {
        headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    }

    /// Check if message indicates a refusal.
    fn is_refusal(msg: &str) -> bool {
        let l = msg.trim_start().to_lowercase();
        let first_line = l.lines().next().unwrap_or("");

        const PREFIXES: &[&str] = &[
            "refus",
            "i cannot",
            "i can't",
            "i won't",
            "i will not",
            "i am unable to",
            "i'm unable to",
            "unable to comply",
            "unable to assist",
            "unable to help",
            "unable to provide",
        ];

        PREFIXES.iter().any(|p| first_line.starts_with(p)) || l.contains("request was refused")
    }

    fn validate_input(req: &ChatRequest) -> Result<(), ProviderError> {
        let total_chars: usize = req.messages.iter().map(|m| m.content.len()).sum();
        if total_chars > MAX_INPUT_CHARS {
            return Err(ProviderError::invalid_request(format!(
                "Input too large: {total_chars} chars (max {MAX_INPUT_CHARS})"
            )));
        }
        Ok(())
    }

    async fn send(
        &self,
        req: &ChatRequest,
        stream: bool,
    ) -> Result<reqwest::Response, ProviderError> {
        Self::validate_input(req)?;

        let messages: Vec<ApiMessage> = req.messages.iter().map(ApiMessage::from).collect();
        let api_req = ChatApiRequest {
            model: req.model.model_id(),
            messages: &messages,
            temperature: req.temperature,
            max_tokens: req.max_tokens,
            stream,
            stream_options: stream.then_some(StreamOptions {
                include_usage: true,
            }),
        };

        let mut response = self
            .client
            .post(self.chat_url())
            .json(&api_req)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let mut ctx = ErrorContext::new().with_status(status.as_u16());
        if let Some(id) = Self::extract_request_id(response.headers()) {
            ctx = ctx.with_request_id(id);
        }

        if !status.is_success() {
            let body = self.read_body(&mut response).await?;
            return Err(error_from_status(status, &body, ctx));
        }

        Ok(response)
    }

    /// Read a body while enforcing the size limit.
    async fn read_body(
        &self,
        response: &mut reqwest::Response,
    ) -> Result<String, ProviderError> {
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.transport_error(e))? {
            let new_len = bytes.len() + chunk.len();
            if new_len > MAX_RESPONSE_LEN {
                return Err(ProviderError::provider(
                    PROVIDER,
                    format!("Response too large: {new_len} bytes"),
                    false,
                ));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&bytes).to_string())
    }

    fn finish(
        req: &ChatRequest,
        content: String,
        usage: Option<Usage>,
        finish_reason: Option<String>,
        start: Instant,
    ) -> Result<ChatResponse, ProviderError> {
        if Self::is_refusal(&content) {
            return Err(ProviderError::refused(content));
        }

        let (input_tokens, output_tokens) = usage
            .map(|u| (u.prompt_tokens.unwrap_or(0), u.completion_tokens.unwrap_or(0)))
            .unwrap_or((0, 0));

        Ok(ChatResponse {
            content,
            input_tokens,
            output_tokens,
            cost_nanodollars: chat_cost(req.model.model_id(), input_tokens, output_tokens),
            latency: start.elapsed(),
            finish_reason: FinishReason::from(finish_reason),
        })
    }
}

fn error_from_status(status: StatusCode, body: &str, ctx: ErrorContext) -> ProviderError {
    let retryable = status.is_server_error();
    let api_error = serde_json::from_str::<ChatApiResponse>(body)
        .ok()
        .and_then(|parsed| parsed.error);

    let (message, ctx) = match api_error {
        Some(error) => {
            let ctx = match error.code {
                Some(code) => ctx.with_code(code),
                None => ctx,
            };
            (error.message.unwrap_or_default(), ctx)
        }
        None => (format!("HTTP {}", status.as_u16()), ctx),
    };

    match status.as_u16() {
        429 => ProviderError::rate_limited(Duration::from_secs(30), ctx),
        400 | 422 => ProviderError::InvalidRequest {
            message,
            context: Some(ctx),
        },
        _ => ProviderError::provider_with_context(PROVIDER, message, retryable, ctx),
    }
}

// =============================================================================
// API TYPES
// =============================================================================

#[derive(Serialize)]
struct ChatApiRequest<'a> {
    model: &'a str,
    messages: &'a [ApiMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
}

#[derive(Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Serialize)]
struct ApiMessage {
    role: Role,
    content: String,
}

impl From<&Message> for ApiMessage {
    fn from(m: &Message) -> Self {
        Self {
            role: m.role.clone(),
            content: m.content.clone(),
        }
    }
}

#[derive(Deserialize)]
struct ChatApiResponse {
    choices: Option<Vec<Choice>>,
    usage: Option<Usage>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Usage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ApiError {
    message: Option<String>,
    code: Option<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    usage: Option<Usage>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: Option<StreamDelta>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

// =============================================================================
// SSE
// =============================================================================

/// One parsed server-sent event from a streaming completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Chunk {
        delta: String,
        finish_reason: Option<String>,
        usage: Option<Usage>,
    },
    Done,
}

/// Parse a single SSE line. Blank lines, comments and non-data fields yield
/// `None`.
pub fn parse_sse_line(line: &str) -> Result<Option<SseEvent>, ProviderError> {
    let line = line.trim_end_matches('\r');
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim();
    if data.is_empty() {
        return Ok(None);
    }
    if data == "[DONE]" {
        return Ok(Some(SseEvent::Done));
    }

    let chunk: StreamChunk = serde_json::from_str(data).map_err(|e| {
        ProviderError::provider(PROVIDER, format!("Invalid stream chunk: {e}"), false)
    })?;

    if let Some(error) = chunk.error {
        return Err(ProviderError::provider(
            PROVIDER,
            error.message.unwrap_or_default(),
            false,
        ));
    }

    let choice = chunk.choices.into_iter().next();
    let finish_reason = choice.as_ref().and_then(|c| c.finish_reason.clone());
    let delta = choice
        .and_then(|c| c.delta)
        .and_then(|d| d.content)
        .unwrap_or_default();

    Ok(Some(SseEvent::Chunk {
        delta,
        finish_reason,
        usage: chunk.usage,
    }))
}

// =============================================================================
// CHAT PROVIDER IMPL
// =============================================================================

#[async_trait]
impl ChatProvider for CompletionAdapter {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let start = Instant::now();
        let mut response = self.send(req, false).await?;
        let body = self.read_body(&mut response).await?;

        let parsed: ChatApiResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::provider(PROVIDER, format!("Invalid JSON: {e}"), false))?;

        if let Some(error) = parsed.error {
            let message = error.message.unwrap_or_default();
            if Self::is_refusal(&message) {
                return Err(ProviderError::refused(message));
            }
            return Err(ProviderError::provider(PROVIDER, message, false));
        }

        let choice = parsed
            .choices
            .and_then(|c| c.into_iter().next())
            .ok_or_else(|| ProviderError::provider(PROVIDER, "No choices in response", false))?;

        let content = choice
            .message
            .and_then(|m| m.content)
            .unwrap_or_default();

        Self::finish(req, content, parsed.usage, choice.finish_reason, start)
    }

    async fn chat_stream(
        &self,
        req: &ChatRequest,
        on_delta: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<ChatResponse, ProviderError> {
        let start = Instant::now();
        let mut response = self.send(req, true).await?;

        let mut pending: Vec<u8> = Vec::new();
        let mut received = 0usize;
        let mut content = String::new();
        let mut usage = None;
        let mut finish_reason = None;
        let mut done = false;

        'read: while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| self.transport_error(e))?
        {
            received += chunk.len();
            if received > MAX_RESPONSE_LEN {
                return Err(ProviderError::provider(
                    PROVIDER,
                    format!("Stream too large: {received} bytes"),
                    false,
                ));
            }
            pending.extend_from_slice(&chunk);

            while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = pending.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&line[..line.len() - 1]);
                match parse_sse_line(&line)? {
                    Some(SseEvent::Done) => {
                        done = true;
                        break 'read;
                    }
                    Some(SseEvent::Chunk {
                        delta,
                        finish_reason: reason,
                        usage: chunk_usage,
                    }) => {
                        if !delta.is_empty() {
                            on_delta(&delta);
                            content.push_str(&delta);
                        }
                        if reason.is_some() {
                            finish_reason = reason;
                        }
                        if chunk_usage.is_some() {
                            usage = chunk_usage;
                        }
                    }
                    None => {}
                }
            }
        }

        // Trailing line without a newline before EOF.
        if !done && !pending.is_empty() {
            let line = String::from_utf8_lossy(&pending).to_string();
            if let Some(SseEvent::Chunk { delta, .. }) = parse_sse_line(&line)? {
                if !delta.is_empty() {
                    on_delta(&delta);
                    content.push_str(&delta);
                }
            }
        }

        Self::finish(req, content, usage, finish_reason, start)
    }
}
