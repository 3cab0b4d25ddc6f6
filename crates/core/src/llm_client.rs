//! Text-completion boundary.
//!
//! Agents never talk to a model directly; they call [`TextCompletion`]. The
//! deterministic [`MockCompletion`] keeps orchestration reproducible, while
//! [`OpenAiCompatibleCompletion`] targets any OpenAI-style chat endpoint.

use anyhow::{Context, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use tracing::debug;

/// Per-call generation knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            max_tokens: 220,
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub provider: String,
}

/// An opaque text generator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: CompletionOptions,
    ) -> Result<Completion>;
}

/// An implementation of `TextCompletion` for any OpenAI-compatible API.
pub struct OpenAiCompatibleCompletion {
    client: Client<OpenAIConfig>,
    model: String,
    provider: String,
}

impl OpenAiCompatibleCompletion {
    /// * `config` - API key and base URL.
    /// * `model` - Chat model identifier (e.g., "gpt-4o").
    /// * `provider` - Label reported back on every completion.
    pub fn new(config: OpenAIConfig, model: String, provider: impl Into<String>) -> Self {
        Self {
            client: Client::with_config(config),
            model,
            provider: provider.into(),
        }
    }
}

#[async_trait]
impl TextCompletion for OpenAiCompatibleCompletion {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: CompletionOptions,
    ) -> Result<Completion> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .max_completion_tokens(options.max_tokens)
            .temperature(options.temperature)
            .messages(vec![
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system_prompt)
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user_prompt)
                    .build()?
                    .into(),
            ])
            .build()?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .with_context(|| format!("{} chat completion failed", self.provider))?;

        let text = response
            .choices
            .first()
            .context("No response choice from LLM")?
            .message
            .content
            .clone()
            .context("No content in LLM response")?;

        debug!(model = %response.model, chars = text.len(), "Completion received");
        Ok(Completion {
            text,
            model: response.model,
            provider: self.provider.clone(),
        })
    }
}

const OPENERS: &[&str] = &[
    "Let's think about this together.",
    "Here is one way to look at it.",
    "Good question to start with.",
    "Let me put that another way.",
    "Picture it like this.",
    "We can break this into pieces.",
];

const CLOSERS: &[&str] = &[
    "What do you notice first?",
    "Try explaining it back in your own words.",
    "For example, imagine sharing a pizza between friends.",
    "Keep that idea in mind for the next step.",
    "Does that match what you expected?",
    "We will check this with a short quiz later.",
];

/// Deterministic stand-in for a model: same prompts, same answer.
#[derive(Debug, Clone, Default)]
pub struct MockCompletion;

impl MockCompletion {
    pub const MODEL: &'static str = "mock-deterministic-v1";
    pub const PROVIDER: &'static str = "mock";
}

#[async_trait]
impl TextCompletion for MockCompletion {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        _options: CompletionOptions,
    ) -> Result<Completion> {
        let hash = fnv1a(system_prompt.as_bytes()) ^ fnv1a(user_prompt.as_bytes()).rotate_left(17);
        let opener = OPENERS[(hash % OPENERS.len() as u64) as usize];
        let closer = CLOSERS[((hash >> 16) % CLOSERS.len() as u64) as usize];

        let focus = user_prompt
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .unwrap_or_default();
        let focus: Vec<&str> = focus.split_whitespace().take(12).collect();
        let middle = if focus.is_empty() {
            "Let's begin.".to_string()
        } else {
            format!("About \"{}\": the key idea builds on what we just said.", focus.join(" "))
        };

        Ok(Completion {
            text: format!("{opener} {middle} {closer}"),
            model: Self::MODEL.to_string(),
            provider: Self::PROVIDER.to_string(),
        })
    }
}

/// 64-bit FNV-1a; stable across platforms and releases.
pub(crate) fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, byte| (hash ^ u64::from(*byte)).wrapping_mul(PRIME))
}
