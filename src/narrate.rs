//! Report narration through an external completion service.
//!
//! The engine result is final; narration only adds prose on top of it.
//! A failed or empty narration never invalidates the report.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::engine::{Mode, Report};
use crate::gateway::{
    Attribution, ChatGateway, ChatModel, ChatRequest, ChatResponse, ProviderError,
};
use crate::prompts::{PromptTemplate, NARRATION_PROMPT};

pub const DEFAULT_MODEL: &str = "deepseek-chat";
pub const DEFAULT_TEMPERATURE: f32 = 1.3;
pub const DEFAULT_MAX_TOKENS: u32 = 400;

#[derive(Debug, Error)]
pub enum NarrationError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("completion service returned no prose")]
    EmptyResponse,
}

#[derive(Debug, Clone)]
pub struct NarratorConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Prose produced for one report.
#[derive(Debug, Clone)]
pub struct Narration {
    pub report_id: String,
    pub text: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cost_nanodollars: i64,
}

pub struct Narrator {
    gateway: Arc<dyn ChatGateway>,
    config: NarratorConfig,
    template: PromptTemplate,
}

impl Narrator {
    pub fn new(gateway: Arc<dyn ChatGateway>) -> Self {
        Self::with_config(gateway, NarratorConfig::default())
    }

    pub fn with_config(gateway: Arc<dyn ChatGateway>, config: NarratorConfig) -> Self {
        Self {
            gateway,
            config,
            template: NARRATION_PROMPT,
        }
    }

    pub fn config(&self) -> &NarratorConfig {
        &self.config
    }

    pub async fn narrate(&self, report: &Report) -> Result<Narration, NarrationError> {
        let req = self.request(report);
        let resp = self.gateway.chat(req).await?;
        self.finish(report, resp)
    }

    /// Like [`Narrator::narrate`], forwarding each delta to `on_delta` as it
    /// arrives.
    pub async fn narrate_streaming<F>(
        &self,
        report: &Report,
        mut on_delta: F,
    ) -> Result<Narration, NarrationError>
    where
        F: FnMut(&str) + Send,
    {
        let req = self.request(report);
        let resp = self.gateway.chat_stream(req, &mut on_delta).await?;
        self.finish(report, resp)
    }

    fn request(&self, report: &Report) -> ChatRequest {
        let prompt = self.template.render(report);
        let attribution = Attribution::new(caller_for(report.mode()))
            .with_run(Uuid::new_v4())
            .with_report(report.id());
        debug!(
            report_id = report.id(),
            template = %prompt.template_slug,
            model = %self.config.model,
            "narration requested"
        );
        ChatRequest::new(
            ChatModel::new(&self.config.model),
            prompt.to_messages(),
            attribution,
        )
        .temperature(self.config.temperature)
        .max_tokens(self.config.max_tokens)
    }

    fn finish(&self, report: &Report, resp: ChatResponse) -> Result<Narration, NarrationError> {
        let text = resp.content.trim();
        if text.is_empty() {
            warn!(report_id = report.id(), "narration came back empty");
            return Err(NarrationError::EmptyResponse);
        }
        Ok(Narration {
            report_id: report.id().to_string(),
            text: text.to_string(),
            model: self.config.model.clone(),
            input_tokens: resp.input_tokens,
            output_tokens: resp.output_tokens,
            cost_nanodollars: resp.cost_nanodollars,
        })
    }
}

fn caller_for(mode: Mode) -> &'static str {
    match mode {
        Mode::Single => "narrate::single",
        Mode::Attack => "narrate::attack",
        Mode::Resonance => "narrate::resonance",
        Mode::Versus => "narrate::versus",
    }
}
