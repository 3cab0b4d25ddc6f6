//! Teacher model: one short instructional message per turn.

use anyhow::{Result, bail};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::{Agent, AgentContext, AgentInput, AgentOutput, TeacherContext, completion_metadata, trim_to_sentences};
use crate::llm_client::{CompletionOptions, TextCompletion};

const MAX_SENTENCES: usize = 3;
const MAX_CHARS: usize = 600;

pub struct TeacherAgent {
    completion: Arc<dyn TextCompletion>,
}

impl TeacherAgent {
    pub fn new(completion: Arc<dyn TextCompletion>) -> Self {
        Self { completion }
    }
}

fn system_prompt(name: &str, ctx: &TeacherContext) -> String {
    let phase = ctx.phase.map(|phase| phase.as_str()).unwrap_or("lecture");
    format!(
        "You are {name}, a patient classroom teacher leading a lesson on \"{topic}\". \
         The lesson is in its {phase} phase. Answer in at most {MAX_SENTENCES} short sentences, \
         address the class directly and end with something the students can do.",
        topic = ctx.topic,
    )
}

fn user_prompt(ctx: &TeacherContext) -> String {
    let mut sections = Vec::new();
    if let Some(step) = &ctx.lesson_step {
        sections.push(format!("Lesson step {}: {step}", ctx.lesson_turn + 1));
    }
    if let Some(summary) = &ctx.assignment_summary {
        sections.push(format!("Active task: {summary}"));
    }
    if !ctx.strongest_edges.is_empty() {
        sections.push(format!("Strongest relationships:\n{}", ctx.strongest_edges.join("\n")));
    }
    if !ctx.recent_activations.is_empty() {
        sections.push(format!("Recent exchanges:\n{}", ctx.recent_activations.join("\n")));
    }
    if !ctx.recent_student_turns.is_empty() {
        sections.push(format!("Students recently said:\n{}", ctx.recent_student_turns.join("\n")));
    }
    if let Some(hint) = &ctx.supervisor_hint {
        sections.push(format!("Supervisor hint (follow it this turn): {hint}"));
    }
    // Instruction stays the last line.
    sections.push(format!("Instruction: {}", ctx.message));
    sections.join("\n\n")
}

#[async_trait]
impl Agent for TeacherAgent {
    async fn run(&self, input: AgentInput) -> Result<AgentOutput> {
        let AgentContext::Teacher(ctx) = &input.context else {
            bail!("teacher agent '{}' received a non-teacher context", input.agent.id);
        };

        let completion = self
            .completion
            .complete(
                &system_prompt(&input.agent.name, ctx),
                &user_prompt(ctx),
                CompletionOptions::default(),
            )
            .await?;
        let message = trim_to_sentences(&completion.text, MAX_SENTENCES, MAX_CHARS);
        debug!(turn_id = %input.turn_id, chars = message.len(), "Teacher message ready");

        let mut metadata = completion_metadata(&completion, input.agent.kind);
        metadata["lessonTurn"] = ctx.lesson_turn.into();
        if let Some(phase) = ctx.phase {
            metadata["phase"] = phase.as_str().into();
        }
        if let Some(hint) = &ctx.supervisor_hint {
            metadata["supervisorHint"] = hint.clone().into();
        }

        Ok(AgentOutput {
            message,
            metadata: Some(metadata),
            state_patch: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::{Completion, MockTextCompletion};
    use crate::model::{AgentKind, AgentProfile, AgentState, Phase};

    fn input(ctx: TeacherContext) -> AgentInput {
        AgentInput {
            session_id: "s".into(),
            turn_id: "t".into(),
            agent: AgentProfile {
                id: "teacher".into(),
                kind: AgentKind::Teacher,
                name: "Ms. Rivera".into(),
                state: AgentState::neutral("teacher"),
            },
            context: AgentContext::Teacher(ctx),
        }
    }

    #[tokio::test]
    async fn test_teacher_prompt_carries_hint_and_trims_output() {
        let mut mock = MockTextCompletion::new();
        mock.expect_complete()
            .withf(|_, user, _| user.contains("Supervisor hint") && user.ends_with("Instruction: Explain halves"))
            .times(1)
            .returning(|_, _, _| {
                Ok(Completion {
                    text: "One. Two. Three. Four.".into(),
                    model: "m".into(),
                    provider: "p".into(),
                })
            });
        let agent = TeacherAgent::new(Arc::new(mock));
        let output = agent
            .run(input(TeacherContext {
                topic: "Fractions".into(),
                message: "Explain halves".into(),
                phase: Some(Phase::Lecture),
                supervisor_hint: Some("Use pizza".into()),
                ..Default::default()
            }))
            .await
            .unwrap();

        assert_eq!(output.message, "One. Two. Three.");
        let metadata = output.metadata.unwrap();
        assert_eq!(metadata["agentKind"], "teacher");
        assert_eq!(metadata["supervisorHint"], "Use pizza");
        assert!(output.state_patch.is_none());
    }

    #[tokio::test]
    async fn test_teacher_rejects_foreign_context() {
        let agent = TeacherAgent::new(Arc::new(MockTextCompletion::new()));
        let mut bad = input(TeacherContext::default());
        bad.context = AgentContext::Student(Default::default());
        assert!(agent.run(bad).await.is_err());
    }
}
