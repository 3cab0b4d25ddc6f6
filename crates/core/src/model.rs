//! Session data model.
//!
//! Everything a running simulation knows lives in [`Session`]. The store owns
//! sessions exclusively; other components only see snapshots or get a
//! short-lived `&mut` inside a store update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use crate::graph::{CommunicationGraph, Relationship};

/// Upper bound of every classroom state attribute.
pub const STATE_MAX: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    Classroom,
    Debate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Supervised,
    #[default]
    Unsupervised,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Supervised => "supervised",
            Channel::Unsupervised => "unsupervised",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of student personalities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    Curious,
    Diligent,
    Distracted,
    Disruptive,
    Shy,
}

impl Persona {
    pub fn label(&self) -> &'static str {
        match self {
            Persona::Curious => "curious",
            Persona::Diligent => "diligent",
            Persona::Distracted => "distracted",
            Persona::Disruptive => "disruptive",
            Persona::Shy => "shy",
        }
    }

    /// Starting classroom state for a freshly seated student.
    pub fn initial_state(&self) -> AgentState {
        let (attentiveness, behavior, comprehension) = match self {
            Persona::Curious => (8, 7, 6),
            Persona::Diligent => (7, 9, 7),
            Persona::Distracted => (3, 6, 5),
            Persona::Disruptive => (4, 2, 5),
            Persona::Shy => (6, 8, 5),
        };
        AgentState {
            attentiveness,
            behavior,
            comprehension,
            profile: self.label().to_string(),
            engagement: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "role", content = "persona")]
pub enum AgentKind {
    Teacher,
    Student(Persona),
    Debater,
    Judge,
}

impl AgentKind {
    pub fn is_student(&self) -> bool {
        matches!(self, AgentKind::Student(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgentKind::Teacher => "teacher",
            AgentKind::Student(persona) => persona.label(),
            AgentKind::Debater => "debater",
            AgentKind::Judge => "judge",
        }
    }
}

/// Attention-style state used by the debate persona variant. All values are in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementState {
    pub attention: f64,
    pub boredom: f64,
    pub fatigue: f64,
    pub knowledge_retention: f64,
}

impl Default for EngagementState {
    fn default() -> Self {
        Self {
            attention: 0.7,
            boredom: 0.2,
            fatigue: 0.1,
            knowledge_retention: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentState {
    pub attentiveness: u8,
    pub behavior: u8,
    pub comprehension: u8,
    pub profile: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engagement: Option<EngagementState>,
}

impl AgentState {
    pub fn neutral(profile: impl Into<String>) -> Self {
        Self {
            attentiveness: 5,
            behavior: 5,
            comprehension: 5,
            profile: profile.into(),
            engagement: None,
        }
    }

    /// Applies a delta patch, clamping every attribute to its declared range.
    pub fn apply(&mut self, patch: &AgentStatePatch) {
        self.attentiveness = clamp_step(self.attentiveness, patch.attentiveness);
        self.behavior = clamp_step(self.behavior, patch.behavior);
        self.comprehension = clamp_step(self.comprehension, patch.comprehension);
        if let Some(label) = &patch.profile {
            self.profile.clone_from(label);
        }
        if let Some(delta) = &patch.engagement {
            let current = self.engagement.get_or_insert_with(EngagementState::default);
            current.attention = clamp_unit(current.attention + delta.attention);
            current.boredom = clamp_unit(current.boredom + delta.boredom);
            current.fatigue = clamp_unit(current.fatigue + delta.fatigue);
            current.knowledge_retention =
                clamp_unit(current.knowledge_retention + delta.knowledge_retention);
        }
    }
}

fn clamp_step(value: u8, delta: i8) -> u8 {
    (i16::from(value) + i16::from(delta)).clamp(0, i16::from(STATE_MAX)) as u8
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Additive change to an agent's state. Zero fields leave the attribute unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatePatch {
    #[serde(default)]
    pub attentiveness: i8,
    #[serde(default)]
    pub behavior: i8,
    #[serde(default)]
    pub comprehension: i8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engagement: Option<EngagementDelta>,
}

impl AgentStatePatch {
    pub fn is_empty(&self) -> bool {
        self.attentiveness == 0
            && self.behavior == 0
            && self.comprehension == 0
            && self.profile.is_none()
            && self.engagement.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementDelta {
    pub attention: f64,
    pub boredom: f64,
    pub fatigue: f64,
    pub knowledge_retention: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentProfile {
    pub id: String,
    pub kind: AgentKind,
    pub name: String,
    pub state: AgentState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    Teacher,
    Agent,
    User,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub id: String,
    pub role: TurnRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Turn {
    pub fn new(role: TurnRole, agent_id: Option<String>, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            agent_id,
            content: content.into(),
            created_at: Utc::now(),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// The closed realtime/audit event taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEventType {
    SessionCreated,
    AgentTurnEmitted,
    TaskAssignmentRequired,
    TaskAssignmentSubmitted,
    TurnProcessed,
    GraphUpdated,
    StudentStatesUpdated,
    SupervisorHint,
}

impl SessionEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionEventType::SessionCreated => "session_created",
            SessionEventType::AgentTurnEmitted => "agent_turn_emitted",
            SessionEventType::TaskAssignmentRequired => "task_assignment_required",
            SessionEventType::TaskAssignmentSubmitted => "task_assignment_submitted",
            SessionEventType::TurnProcessed => "turn_processed",
            SessionEventType::GraphUpdated => "graph_updated",
            SessionEventType::StudentStatesUpdated => "student_states_updated",
            SessionEventType::SupervisorHint => "supervisor_hint",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: SessionEventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl SessionEvent {
    pub fn new(event_type: SessionEventType, payload: serde_json::Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type,
            turn_id: None,
            agent_id: None,
            payload,
            created_at: Utc::now(),
        }
    }

    pub fn for_turn(mut self, turn_id: impl Into<String>) -> Self {
        self.turn_id = Some(turn_id.into());
        self
    }

    pub fn for_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebateScores {
    pub argument_strength: f64,
    pub evidence: f64,
    pub clarity: f64,
    pub rebuttal: f64,
    pub overall: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetrics {
    pub turn_count: usize,
    pub engagement: f64,
    pub clarity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debate: Option<DebateScores>,
}

/// Partial metrics update. `turn_count` is owned by the store and never patched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsPatch {
    pub engagement: Option<f64>,
    pub clarity: Option<f64>,
    pub debate: Option<DebateScores>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Lecture,
    Practice,
    Review,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Lecture => "lecture",
            Phase::Practice => "practice",
            Phase::Review => "review",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentMode {
    Individual,
    Pair,
    Group,
}

impl AssignmentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentMode::Individual => "individual",
            AssignmentMode::Pair => "pair",
            AssignmentMode::Group => "group",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignedBy {
    SupervisorUser,
    TeacherAgent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskGroup {
    pub id: String,
    pub student_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAssignment {
    pub mode: AssignmentMode,
    pub groups: Vec<TaskGroup>,
    pub assigned_by: AssignedBy,
    pub assigned_at: DateTime<Utc>,
    pub lesson_turn: usize,
}

impl TaskAssignment {
    pub fn student_ids(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .flat_map(|group| group.student_ids.iter().map(String::as_str))
    }

    /// Single-line description handed to the teacher agent.
    pub fn summary(&self) -> String {
        let groups = self
            .groups
            .iter()
            .map(|group| format!("{}: {}", group.id, group.student_ids.join(", ")))
            .collect::<Vec<_>>()
            .join("; ");
        format!("{} work ({})", self.mode.as_str(), groups)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassroomRuntime {
    pub lesson_turn: usize,
    pub phase: Phase,
    pub paused: bool,
    pub pending_task_assignment: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_task_assignment: Option<TaskAssignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_review_turn: Option<usize>,
}

impl Default for ClassroomRuntime {
    fn default() -> Self {
        Self {
            lesson_turn: 0,
            phase: Phase::Lecture,
            paused: false,
            pending_task_assignment: false,
            active_task_assignment: None,
            last_review_turn: None,
        }
    }
}

/// A supervisor-declared relationship between two students.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipOverride {
    pub a: String,
    pub b: String,
    pub quality: Relationship,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    pub min_responders: Option<usize>,
    pub max_responders: Option<usize>,
    pub relationships: Vec<RelationshipOverride>,
    pub include_judge: bool,
    pub lesson_plan: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub mode: SessionMode,
    pub channel: Channel,
    pub topic: String,
    pub classroom_id: String,
    pub config: SessionConfig,
    pub lesson_plan: Vec<String>,
    pub agents: Vec<AgentProfile>,
    pub communication_graph: CommunicationGraph,
    pub turns: Vec<Turn>,
    pub events: Vec<SessionEvent>,
    pub metrics: SessionMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classroom_runtime: Option<ClassroomRuntime>,
    #[serde(default)]
    pub supervisor_hints: VecDeque<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn teacher(&self) -> Option<&AgentProfile> {
        self.agents
            .iter()
            .find(|agent| agent.kind == AgentKind::Teacher)
    }

    pub fn agent(&self, agent_id: &str) -> Option<&AgentProfile> {
        self.agents.iter().find(|agent| agent.id == agent_id)
    }

    pub fn students(&self) -> impl Iterator<Item = &AgentProfile> {
        self.agents.iter().filter(|agent| agent.kind.is_student())
    }

    pub fn student_count(&self) -> usize {
        self.students().count()
    }

    pub fn teacher_turn_count(&self) -> usize {
        self.turns
            .iter()
            .filter(|turn| turn.role == TurnRole::Teacher)
            .count()
    }

    pub fn last_turns(&self, count: usize) -> Vec<Turn> {
        let start = self.turns.len().saturating_sub(count);
        self.turns[start..].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_clamps_to_upper_bound() {
        let mut state = Persona::Diligent.initial_state();
        for _ in 0..20 {
            state.apply(&AgentStatePatch {
                attentiveness: 2,
                behavior: 2,
                comprehension: 2,
                ..Default::default()
            });
        }
        assert_eq!(state.attentiveness, STATE_MAX);
        assert_eq!(state.behavior, STATE_MAX);
        assert_eq!(state.comprehension, STATE_MAX);
    }

    #[test]
    fn test_patch_clamps_to_lower_bound() {
        let mut state = Persona::Disruptive.initial_state();
        for _ in 0..20 {
            state.apply(&AgentStatePatch {
                attentiveness: -3,
                behavior: -3,
                comprehension: -3,
                ..Default::default()
            });
        }
        assert_eq!(state.attentiveness, 0);
        assert_eq!(state.behavior, 0);
        assert_eq!(state.comprehension, 0);
    }

    #[test]
    fn test_engagement_patch_stays_in_unit_range() {
        let mut state = AgentState::neutral("debater");
        let up = EngagementDelta {
            attention: 0.4,
            boredom: 0.4,
            fatigue: 0.4,
            knowledge_retention: 0.4,
        };
        let down = EngagementDelta {
            attention: -0.9,
            boredom: -0.9,
            fatigue: -0.9,
            knowledge_retention: -0.9,
        };
        for delta in [up, up, up, down, down, down, up] {
            state.apply(&AgentStatePatch {
                engagement: Some(delta),
                ..Default::default()
            });
            let engagement = state.engagement.unwrap();
            for value in [
                engagement.attention,
                engagement.boredom,
                engagement.fatigue,
                engagement.knowledge_retention,
            ] {
                assert!((0.0..=1.0).contains(&value));
            }
        }
    }

    #[test]
    fn test_event_type_serializes_snake_case() {
        let event = SessionEvent::new(
            SessionEventType::TaskAssignmentRequired,
            serde_json::json!({}),
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "task_assignment_required");
        assert_eq!(
            SessionEventType::TaskAssignmentRequired.as_str(),
            "task_assignment_required"
        );
    }

    #[test]
    fn test_agent_kind_serialization() {
        let kind = AgentKind::Student(Persona::Shy);
        let json = serde_json::to_string(&kind).unwrap();
        assert_eq!(json, r#"{"role":"student","persona":"shy"}"#);
        let teacher = serde_json::to_string(&AgentKind::Teacher).unwrap();
        assert_eq!(teacher, r#"{"role":"teacher"}"#);
    }

    #[test]
    fn test_assignment_summary() {
        let assignment = TaskAssignment {
            mode: AssignmentMode::Pair,
            groups: vec![TaskGroup {
                id: "p1".into(),
                student_ids: vec!["s1".into(), "s2".into()],
            }],
            assigned_by: AssignedBy::SupervisorUser,
            assigned_at: Utc::now(),
            lesson_turn: 3,
        };
        assert_eq!(assignment.summary(), "pair work (p1: s1, s2)");
    }
}
