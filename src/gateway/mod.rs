//! Provider gateway for chat completions used by narration.

pub mod completion;
pub mod error;
pub mod pricing;
pub mod types;
pub mod usage;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use completion::ChatProvider;
use usage::{CallStatus, ProviderCallRecord, UsageSink as UsageSinkTrait};

pub use completion::{parse_sse_line, CompletionAdapter, SseEvent, DEFAULT_BASE_URL};
pub use error::{ErrorContext, ProviderError};
pub use pricing::*;
pub use types::*;
pub use usage::{NoopUsageSink, TracingUsageSink, UsageSink};

const ENDPOINT: &str = "chat/completions";
const STREAM_ENDPOINT: &str = "chat/completions:stream";

#[async_trait::async_trait]
pub trait ChatGateway: Send + Sync {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError>;

    /// Streaming variant. The default delivers the whole completion as a
    /// single delta.
    async fn chat_stream(
        &self,
        req: ChatRequest,
        on_delta: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<ChatResponse, ProviderError> {
        let resp = self.chat(req).await?;
        on_delta(&resp.content);
        Ok(resp)
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_base_delay: Duration::from_secs(1),
        }
    }
}

pub struct ProviderGateway<U: UsageSinkTrait> {
    adapter: CompletionAdapter,
    usage_sink: Arc<U>,
    config: GatewayConfig,
}

#[async_trait::async_trait]
impl<U: UsageSinkTrait> ChatGateway for ProviderGateway<U> {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        ProviderGateway::chat(self, req).await
    }

    async fn chat_stream(
        &self,
        req: ChatRequest,
        on_delta: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<ChatResponse, ProviderError> {
        ProviderGateway::chat_stream(self, req, on_delta).await
    }
}

impl<U: UsageSinkTrait> ProviderGateway<U> {
    pub fn from_env(usage_sink: Arc<U>) -> Result<Self, ProviderError> {
        let adapter = CompletionAdapter::from_env()?;
        Ok(Self {
            adapter,
            usage_sink,
            config: GatewayConfig::default(),
        })
    }

    pub fn with_config(
        adapter: CompletionAdapter,
        usage_sink: Arc<U>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            adapter,
            usage_sink,
            config,
        }
    }

    pub async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let mut last_error: Option<ProviderError> = None;

        for attempt in 0..=self.config.max_retries {
            match self.adapter.chat(&req).await {
                Ok(resp) => {
                    self.record_usage(&req, ENDPOINT, &resp, CallStatus::Success, None)
                        .await;
                    return Ok(resp);
                }
                Err(err) => {
                    let code = err.code().to_string();
                    self.record_usage(
                        &req,
                        ENDPOINT,
                        &ChatResponse::empty(),
                        CallStatus::Error,
                        Some(code),
                    )
                    .await;

                    if !err.is_retryable() || attempt == self.config.max_retries {
                        return Err(err);
                    }

                    let delay = backoff_delay(self.config.retry_base_delay, attempt);
                    warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying completion"
                    );
                    last_error = Some(err);
                    sleep(delay).await;
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| ProviderError::provider("deepseek", "unknown error", false)))
    }

    /// Streams are not retried: deltas may already have reached the caller.
    pub async fn chat_stream(
        &self,
        req: ChatRequest,
        on_delta: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<ChatResponse, ProviderError> {
        match self.adapter.chat_stream(&req, on_delta).await {
            Ok(resp) => {
                self.record_usage(&req, STREAM_ENDPOINT, &resp, CallStatus::Success, None)
                    .await;
                Ok(resp)
            }
            Err(err) => {
                let code = err.code().to_string();
                self.record_usage(
                    &req,
                    STREAM_ENDPOINT,
                    &ChatResponse::empty(),
                    CallStatus::Error,
                    Some(code),
                )
                .await;
                Err(err)
            }
        }
    }

    async fn record_usage(
        &self,
        req: &ChatRequest,
        endpoint: &'static str,
        resp: &ChatResponse,
        status: CallStatus,
        error_code: Option<String>,
    ) {
        let record = ProviderCallRecord::new(
            req.model.provider(),
            endpoint,
            req.model.model_id(),
            req.attribution.caller,
        )
        .tokens(resp.input_tokens as i32, resp.output_tokens as i32)
        .cost(resp.cost_nanodollars)
        .run(req.attribution.run_id)
        .report(req.attribution.report_id.clone())
        .latency(resp.latency.as_millis() as i32);

        let record = if status == CallStatus::Error {
            record.error(error_code.unwrap_or_else(|| "provider_error".to_string()))
        } else {
            record
        };

        self.usage_sink.record(record).await;
    }
}

fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let multiplier = 2u64.pow(attempt.min(5));
    base * multiplier as u32
}
