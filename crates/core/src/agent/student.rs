//! Student model.
//!
//! A student answers from a bounded window of what it actually heard. The
//! window grows with attentiveness and comprehension; when nothing is in it the
//! student says so instead of inventing an answer.

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use super::heuristics::{analyze, classroom_delta, knowledge_window};
use super::{Agent, AgentContext, AgentInput, AgentOutput, completion_metadata, trim_to_sentences};
use crate::llm_client::{CompletionOptions, TextCompletion};
use crate::model::{AgentKind, Persona};

const MAX_SENTENCES: usize = 2;
const MAX_CHARS: usize = 280;

pub const NO_MEMORY_REPLY: &str = "I don't remember enough from class to answer that yet.";

pub struct StudentAgent {
    completion: Arc<dyn TextCompletion>,
}

impl StudentAgent {
    pub fn new(completion: Arc<dyn TextCompletion>) -> Self {
        Self { completion }
    }
}

fn voice(persona: Persona) -> &'static str {
    match persona {
        Persona::Curious => "You are curious and often ask a follow-up question.",
        Persona::Diligent => "You are diligent and answer carefully and completely.",
        Persona::Distracted => "You are easily distracted and sometimes drift off topic.",
        Persona::Disruptive => "You like to joke around and push back on instructions.",
        Persona::Shy => "You are shy and answer briefly and hesitantly.",
    }
}

#[async_trait]
impl Agent for StudentAgent {
    async fn run(&self, input: AgentInput) -> Result<AgentOutput> {
        let AgentKind::Student(persona) = input.agent.kind else {
            bail!("student agent cannot drive '{}' ({})", input.agent.id, input.agent.kind.label());
        };
        let AgentContext::Student(ctx) = &input.context else {
            bail!("student agent '{}' received a non-student context", input.agent.id);
        };

        let window = knowledge_window(&input.agent.state);
        let start = ctx.knowledge.len().saturating_sub(window);
        let remembered = &ctx.knowledge[start..];
        if remembered.is_empty() {
            return Ok(AgentOutput {
                message: NO_MEMORY_REPLY.to_string(),
                metadata: Some(json!({
                    "agentKind": persona.label(),
                    "knowledgeLines": 0,
                    "refused": true,
                })),
                state_patch: None,
            });
        }

        let system_prompt = format!(
            "You are {name}, a student in a lesson on \"{topic}\". {voice} \
             Only use what you remember below; never make up facts. Reply in at most {MAX_SENTENCES} sentences.",
            name = input.agent.name,
            topic = ctx.topic,
            voice = voice(persona),
        );
        let user_prompt = format!("What you remember:\n{}", remembered.join("\n"));
        let completion = self
            .completion
            .complete(
                &system_prompt,
                &user_prompt,
                CompletionOptions {
                    max_tokens: 120,
                    temperature: 0.8,
                },
            )
            .await?;

        let mut metadata = completion_metadata(&completion, input.agent.kind);
        metadata["knowledgeLines"] = remembered.len().into();

        let heard = ctx.latest_addressed.as_deref().unwrap_or_default();
        let patch = classroom_delta(persona, &analyze(heard));

        Ok(AgentOutput {
            message: trim_to_sentences(&completion.text, MAX_SENTENCES, MAX_CHARS),
            metadata: Some(metadata),
            state_patch: (!patch.is_empty()).then_some(patch),
        })
    }
}
