//! Lesson Plan Service
//!
//! Breaks a topic into the fixed, ordered list of teaching steps a classroom
//! session walks through. The plan is resolved once at session creation and
//! drives the lecture/practice/review phase machine.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use crate::llm_client::{CompletionOptions, TextCompletion};

/// Number of steps in every generated lesson plan.
pub const LESSON_PLAN_LENGTH: usize = 9;

/// Defines the contract for any service that can produce a lesson plan.
#[async_trait]
pub trait CurriculumService: Send + Sync {
    /// Returns exactly [`LESSON_PLAN_LENGTH`] ordered teaching steps for `topic`.
    async fn lesson_plan(&self, topic: &str) -> Result<Vec<String>>;
}

/// Deterministic plan: three lecture steps, three practice steps, three review steps.
#[derive(Debug, Clone, Default)]
pub struct StaticCurriculumService;

impl StaticCurriculumService {
    pub fn plan_for(topic: &str) -> Vec<String> {
        vec![
            format!("Introduce {topic} and why it matters"),
            format!("Define the core vocabulary of {topic}"),
            format!("Walk through a worked example of {topic}"),
            format!("Guided practice: first exercise on {topic}"),
            format!("Practice in pairs: apply {topic} to a new case"),
            format!("Group challenge: a harder {topic} problem"),
            format!("Review common mistakes with {topic}"),
            format!("Quick check: short quiz on {topic}"),
            format!("Wrap up: summarize {topic} in your own words"),
        ]
    }
}

#[async_trait]
impl CurriculumService for StaticCurriculumService {
    async fn lesson_plan(&self, topic: &str) -> Result<Vec<String>> {
        Ok(Self::plan_for(topic))
    }
}

/// Asks the text-completion backend for a numbered list of steps.
///
/// Falls back to [`StaticCurriculumService`] when the answer contains fewer
/// than three usable steps; pads or truncates to [`LESSON_PLAN_LENGTH`].
pub struct LlmCurriculumService {
    completion: Arc<dyn TextCompletion>,
}

impl LlmCurriculumService {
    pub fn new(completion: Arc<dyn TextCompletion>) -> Self {
        Self { completion }
    }
}

#[async_trait]
impl CurriculumService for LlmCurriculumService {
    async fn lesson_plan(&self, topic: &str) -> Result<Vec<String>> {
        let prompt = format!(
            "List {LESSON_PLAN_LENGTH} short, ordered teaching steps for a lesson on \"{topic}\". \
             The first third should lecture, the middle third practice, the last third review. \
             Answer as a numbered list, one step per line."
        );
        let completion = self
            .completion
            .complete(
                "You are a helpful assistant that plans classroom lessons.",
                &prompt,
                CompletionOptions {
                    max_tokens: 400,
                    temperature: 0.3,
                },
            )
            .await?;

        let mut steps = parse_numbered_list(&completion.text);
        if steps.len() < 3 {
            warn!(topic, parsed = steps.len(), "Lesson plan response unusable, using static plan");
            return Ok(StaticCurriculumService::plan_for(topic));
        }
        let fallback = StaticCurriculumService::plan_for(topic);
        while steps.len() < LESSON_PLAN_LENGTH {
            steps.push(fallback[steps.len()].clone());
        }
        steps.truncate(LESSON_PLAN_LENGTH);
        Ok(steps)
    }
}

/// Extracts list items of the form `1. step` or `2) step`.
fn parse_numbered_list(answer: &str) -> Vec<String> {
    answer
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let idx = line.find(['.', ')'])?;
            if idx == 0 || !line[..idx].chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            let name = line[idx + 1..].trim();
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}
