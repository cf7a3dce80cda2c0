//! Usage tracking via the UsageSink trait.
//!
//! The gateway reports every call through a UsageSink, decoupling it from
//! where usage ends up. The CLI logs records through `tracing`; tests use
//! `NoopUsageSink` or a collecting sink.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Success,
    Error,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Success => "success",
            CallStatus::Error => "error",
        }
    }
}

/// Record of a provider API call for logging.
#[derive(Debug, Clone)]
pub struct ProviderCallRecord {
    /// Provider label: "deepseek", "openai_compatible".
    pub provider: &'static str,
    /// Endpoint: "chat/completions" or "chat/completions:stream".
    pub endpoint: &'static str,
    pub model: String,
    pub input_tokens: i32,
    pub output_tokens: i32,
    /// Cost in nanodollars (1e-9 USD).
    pub cost_nanodollars: i64,
    pub run_id: Option<Uuid>,
    /// Short ID of the narrated report.
    pub report_id: Option<String>,
    pub latency_ms: i32,
    pub status: CallStatus,
    /// Error code if status is Error.
    pub error_code: Option<String>,
    /// Which code path made this call.
    pub caller: &'static str,
    pub timestamp: DateTime<Utc>,
}

impl ProviderCallRecord {
    pub fn new(
        provider: &'static str,
        endpoint: &'static str,
        model: impl Into<String>,
        caller: &'static str,
    ) -> Self {
        Self {
            provider,
            endpoint,
            model: model.into(),
            input_tokens: 0,
            output_tokens: 0,
            cost_nanodollars: 0,
            run_id: None,
            report_id: None,
            latency_ms: 0,
            status: CallStatus::Success,
            error_code: None,
            caller,
            timestamp: Utc::now(),
        }
    }

    pub fn tokens(mut self, input: i32, output: i32) -> Self {
        self.input_tokens = input;
        self.output_tokens = output;
        self
    }

    pub fn cost(mut self, nanodollars: i64) -> Self {
        self.cost_nanodollars = nanodollars;
        self
    }

    pub fn run(mut self, run_id: Option<Uuid>) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn report(mut self, report_id: Option<String>) -> Self {
        self.report_id = report_id;
        self
    }

    pub fn latency(mut self, ms: i32) -> Self {
        self.latency_ms = ms;
        self
    }

    pub fn error(mut self, code: impl Into<String>) -> Self {
        self.status = CallStatus::Error;
        self.error_code = Some(code.into());
        self
    }
}

/// Sink for provider call records.
#[async_trait]
pub trait UsageSink: Send + Sync {
    /// Fire-and-forget: failures are logged, never propagated.
    async fn record(&self, record: ProviderCallRecord);
}

/// Discards all records.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopUsageSink;

#[async_trait]
impl UsageSink for NoopUsageSink {
    async fn record(&self, _record: ProviderCallRecord) {}
}

/// Emits each record as a structured `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingUsageSink;

#[async_trait]
impl UsageSink for TracingUsageSink {
    async fn record(&self, record: ProviderCallRecord) {
        tracing::info!(
            provider = record.provider,
            endpoint = record.endpoint,
            model = %record.model,
            tokens = record.input_tokens + record.output_tokens,
            cost_nanos = record.cost_nanodollars,
            latency_ms = record.latency_ms,
            status = record.status.as_str(),
            error_code = record.error_code.as_deref().unwrap_or(""),
            caller = record.caller,
            report_id = record.report_id.as_deref().unwrap_or(""),
            "provider call"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_error_status() {
        let record = ProviderCallRecord::new("deepseek", "chat/completions", "deepseek-chat", "t")
            .tokens(10, 5)
            .report(Some("TK-0001-A".into()))
            .error("timeout");
        assert_eq!(record.status, CallStatus::Error);
        assert_eq!(record.error_code.as_deref(), Some("timeout"));
        assert_eq!(record.input_tokens + record.output_tokens, 15);
        assert_eq!(record.report_id.as_deref(), Some("TK-0001-A"));
    }
}
