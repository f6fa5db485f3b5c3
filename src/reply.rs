//! # Reply generation
//!
//! [`ReplyGenerator::generate_reply`] turns the newest customer utterance, the
//! conversation so far and the current [`BotConfig`] into exactly one
//! displayable reply. It never fails from the caller's point of view:
//!
//! | upstream outcome                 | returned string        |
//! |----------------------------------|------------------------|
//! | non-empty text                   | that text, verbatim    |
//! | no text / empty text             | [`FALLBACK_EMPTY`]     |
//! | any error, including the timeout | [`FALLBACK_FAILURE`]   |
//!
//! Only the error branch logs (one `error!` event). The generator keeps no
//! state between calls, never mutates its inputs and never retries.
//!
//! ## Request layout
//!
//! 1. System instruction rendered from the persona ([`crate::template`]).
//! 2. History, windowed by the configured [`HistoryWindow`], in order, with
//!    customer turns as `user` and assistant turns as `model`.
//! 3. The utterance as the final `user` entry, untrimmed.
//!
//! ```no_run
//! use applemar_bot::{api::create_backend, config::AppConfig, persona::BotConfig};
//! use applemar_bot::reply::ReplyGenerator;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! let generator = ReplyGenerator::from_config(&config)?;
//! let reply = generator
//!     .generate_reply("Têm o novo iPhone?", &[], &BotConfig::default())
//!     .await;
//! println!("{reply}");
//! # Ok(()) }
//! ```

use std::{sync::Arc, time::Duration};

use tracing::error;

use crate::{
    api::{Content, GenerationBackend, GenerationError, GenerationRequest, create_backend},
    config::{AppConfig, DEFAULT_MODEL},
    conversation::{ConversationTurn, HistoryWindow, Origin},
    persona::BotConfig,
    template::system_instruction,
};

/// Returned when the service answers without usable text.
pub const FALLBACK_EMPTY: &str =
    "Desculpe, tive um problema técnico. Um consultor humano entrará em contacto em breve.";

/// Returned when the upstream call fails for any reason.
pub const FALLBACK_FAILURE: &str = "Lamentamos, mas não conseguimos processar a sua mensagem no momento. Por favor, tente novamente mais tarde.";

/// Stateless reply generator over a shared [`GenerationBackend`].
#[derive(Clone)]
pub struct ReplyGenerator {
    backend: Arc<dyn GenerationBackend>,
    model: String,
    timeout: Duration,
    window: HistoryWindow,
}

impl std::fmt::Debug for ReplyGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyGenerator")
            .field("backend", &self.backend.name())
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("window", &self.window)
            .finish()
    }
}

impl ReplyGenerator {
    /// Wrap `backend` with the default model, a 30 second timeout and the
    /// default history window.
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            backend,
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(30),
            window: HistoryWindow::default(),
        }
    }

    /// Build the configured backend and apply the config's model, timeout and
    /// history window.
    pub fn from_config(config: &AppConfig) -> Result<Self, GenerationError> {
        Ok(Self::new(create_backend(config)?)
            .with_model(config.model.clone())
            .with_timeout(config.request_timeout())
            .with_history_window(config.history))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_history_window(mut self, window: HistoryWindow) -> Self {
        self.window = window;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Assemble the upstream request without sending it.
    pub fn build_request(
        &self,
        utterance: &str,
        history: &[ConversationTurn],
        bot: &BotConfig,
    ) -> GenerationRequest {
        let windowed = self.window.apply(history);

        let mut contents: Vec<Content> = windowed
            .iter()
            .map(|turn| match turn.origin {
                Origin::Customer => Content::user(turn.text.clone()),
                Origin::Assistant => Content::model(turn.text.clone()),
            })
            .collect();
        contents.push(Content::user(utterance));

        GenerationRequest::new(self.model.clone(), system_instruction(bot), contents)
    }

    /// Produce the next assistant reply. Always returns a non-empty string.
    pub async fn generate_reply(
        &self,
        utterance: &str,
        history: &[ConversationTurn],
        bot: &BotConfig,
    ) -> String {
        let request = self.build_request(utterance, history, bot);

        match self.call(&request).await {
            Ok(Some(text)) if !text.is_empty() => text,
            Ok(_) => FALLBACK_EMPTY.to_string(),
            Err(err) => {
                error!("Generation error from {}: {}", self.backend.name(), err);
                FALLBACK_FAILURE.to_string()
            }
        }
    }

    async fn call(&self, request: &GenerationRequest) -> Result<Option<String>, GenerationError> {
        match tokio::time::timeout(self.timeout, self.backend.generate(request)).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout(self.timeout)),
        }
    }
}
