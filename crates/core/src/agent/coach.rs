//! Debate coach model: answers the debater's argument with a rebuttal.

use anyhow::{Result, bail};
use async_trait::async_trait;
use std::sync::Arc;

use super::{Agent, AgentContext, AgentInput, AgentOutput, completion_metadata, trim_to_sentences};
use crate::llm_client::{CompletionOptions, TextCompletion};

const MAX_SENTENCES: usize = 4;
const MAX_CHARS: usize = 700;

pub struct CoachAgent {
    completion: Arc<dyn TextCompletion>,
}

impl CoachAgent {
    pub fn new(completion: Arc<dyn TextCompletion>) -> Self {
        Self { completion }
    }
}

#[async_trait]
impl Agent for CoachAgent {
    async fn run(&self, input: AgentInput) -> Result<AgentOutput> {
        let AgentContext::Debate(ctx) = &input.context else {
            bail!("coach '{}' received a non-debate context", input.agent.id);
        };

        let audience = if ctx.judge_present {
            " A judge is listening, so keep the exchange fair and precise."
        } else {
            ""
        };
        let system_prompt = format!(
            "You are {name}, a debate coach sparring with a student on \"{topic}\". \
             Challenge the weakest point of their argument, then suggest one way to strengthen it.{audience} \
             Use at most {MAX_SENTENCES} sentences.",
            name = input.agent.name,
            topic = ctx.topic,
        );

        let mut user_prompt = String::new();
        if !ctx.transcript.is_empty() {
            user_prompt.push_str("Transcript so far:\n");
            user_prompt.push_str(&ctx.transcript.join("\n"));
            user_prompt.push_str("\n\n");
        }
        user_prompt.push_str("Argument: ");
        user_prompt.push_str(&ctx.argument);

        let completion = self
            .completion
            .complete(&system_prompt, &user_prompt, CompletionOptions::default())
            .await?;

        Ok(AgentOutput {
            message: trim_to_sentences(&completion.text, MAX_SENTENCES, MAX_CHARS),
            metadata: Some(completion_metadata(&completion, input.agent.kind)),
            state_patch: None,
        })
    }
}
