//! Agent Behavior Models
//!
//! Every participant of a turn implements [`Agent`]. The orchestrator only
//! knows the capability, never the concrete kind, so adding a persona or a new
//! role is a matter of adding an implementation and wiring it into
//! [`AgentRegistry`].

pub mod coach;
pub mod heuristics;
pub mod student;
pub mod teacher;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use crate::llm_client::{Completion, TextCompletion};
use crate::model::{AgentKind, AgentProfile, AgentStatePatch, Phase, SessionMode};

pub use coach::CoachAgent;
pub use student::StudentAgent;
pub use teacher::TeacherAgent;

/// Everything the teacher is allowed to see when it plans its message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeacherContext {
    pub topic: String,
    pub message: String,
    pub lesson_step: Option<String>,
    pub lesson_turn: usize,
    pub phase: Option<Phase>,
    pub assignment_summary: Option<String>,
    /// `from -> to (relationship, weight)` lines for the strongest edges.
    pub strongest_edges: Vec<String>,
    /// Recent activations touching the teacher, oldest first.
    pub recent_activations: Vec<String>,
    /// `name: content` lines of the latest student turns.
    pub recent_student_turns: Vec<String>,
    pub supervisor_hint: Option<String>,
}

/// A student only knows what reached it through the graph, plus what it said itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentContext {
    pub topic: String,
    /// Chronological `speaker: text` lines.
    pub knowledge: Vec<String>,
    /// The newest message addressed to this student, if any.
    pub latest_addressed: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebateContext {
    pub topic: String,
    pub argument: String,
    /// `role: content` lines of the recent exchange, oldest first.
    pub transcript: Vec<String>,
    pub judge_present: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgentContext {
    Teacher(TeacherContext),
    Student(StudentContext),
    Debate(DebateContext),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentInput {
    pub session_id: String,
    pub turn_id: String,
    pub agent: AgentProfile,
    pub context: AgentContext,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentOutput {
    pub message: String,
    pub metadata: Option<serde_json::Value>,
    pub state_patch: Option<AgentStatePatch>,
}

/// A participant that can take part in a turn.
#[async_trait]
pub trait Agent: Send + Sync {
    async fn run(&self, input: AgentInput) -> Result<AgentOutput>;
}

/// Resolves which behavior model drives a given profile.
#[derive(Clone)]
pub struct AgentRegistry {
    teacher: Arc<dyn Agent>,
    student: Arc<dyn Agent>,
    coach: Arc<dyn Agent>,
}

impl AgentRegistry {
    pub fn new(completion: Arc<dyn TextCompletion>) -> Self {
        Self {
            teacher: Arc::new(TeacherAgent::new(completion.clone())),
            student: Arc::new(StudentAgent::new(completion.clone())),
            coach: Arc::new(CoachAgent::new(completion)),
        }
    }

    pub fn with_agents(teacher: Arc<dyn Agent>, student: Arc<dyn Agent>, coach: Arc<dyn Agent>) -> Self {
        Self {
            teacher,
            student,
            coach,
        }
    }

    /// Debaters are humans and judges only listen, so neither has a model.
    pub fn for_kind(&self, kind: AgentKind, mode: SessionMode) -> Option<Arc<dyn Agent>> {
        match (kind, mode) {
            (AgentKind::Teacher, SessionMode::Classroom) => Some(self.teacher.clone()),
            (AgentKind::Teacher, SessionMode::Debate) => Some(self.coach.clone()),
            (AgentKind::Student(_), _) => Some(self.student.clone()),
            (AgentKind::Debater | AgentKind::Judge, _) => None,
        }
    }
}

/// Keeps at most `max_sentences` sentences and `max_chars` characters.
pub fn trim_to_sentences(text: &str, max_sentences: usize, max_chars: usize) -> String {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut end = text.len();
    let mut sentences = 0;
    for (idx, ch) in text.char_indices() {
        if matches!(ch, '.' | '!' | '?') {
            let next = text[idx + ch.len_utf8()..].chars().next();
            if next.is_none_or(char::is_whitespace) {
                sentences += 1;
                if sentences == max_sentences {
                    end = idx + ch.len_utf8();
                    break;
                }
            }
        }
    }

    let trimmed = &text[..end];
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", cut.trim_end())
}

/// The metadata every model-authored turn carries.
pub(crate) fn completion_metadata(completion: &Completion, kind: AgentKind) -> serde_json::Value {
    json!({
        "model": completion.model,
        "provider": completion.provider,
        "agentKind": kind.label(),
    })
}
